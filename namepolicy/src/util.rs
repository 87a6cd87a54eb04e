//! Basic utility functionality supporting name policy configuration and evaluation

pub mod error;
pub mod file_utils;
pub mod logging;

pub use crate::{util::error::*, util::file_utils::*, util::logging::*};

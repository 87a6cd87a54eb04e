//! Name constraint policy: constraint normalization, matching, engine configuration and evaluation

pub mod constraint;
pub mod engine;
pub mod evaluator;
mod mailbox;
pub mod matcher;
pub mod normalize;
pub mod settings;

pub use crate::{
    policy::constraint::*, policy::engine::*, policy::evaluator::*, policy::matcher::*,
    policy::normalize::*, policy::settings::*,
};

#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

mod args;
mod options;

use clap::Parser;
use log::{debug, LevelFilter};
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

use crate::args::*;
use crate::options::*;

/// `configure_logging` initializes log4rs from the given YAML file or, failing that, with a console
/// appender that writes to stderr so the verdict on stdout is not interleaved with log output.
fn configure_logging(logging_config: &Option<String>) {
    if let Some(logging_config) = logging_config {
        match log4rs::init_file(logging_config, Default::default()) {
            Ok(_) => return,
            Err(e) => eprintln!(
                "ERROR: failed to configure logging using {} with {:?}. Continuing with default logging.",
                logging_config, e
            ),
        }
    }

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{m}{n}")))
        .build();
    match Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(LevelFilter::Info))
    {
        Ok(config) => {
            if let Err(e) = log4rs::init_config(config) {
                eprintln!(
                    "ERROR: failed to configure logging for stderr with {:?}. Continuing without logging.",
                    e
                );
            }
        }
        Err(e) => {
            eprintln!(
                "ERROR: failed to prepare default logging configuration with {:?}. Continuing without logging",
                e
            );
        }
    }
}

/// Point of entry for npcheck application.
fn main() {
    let args = NpcheckArgs::parse();
    configure_logging(&args.logging_config);

    debug!("npcheck start");
    let code = options(&args);
    debug!("npcheck end");
    std::process::exit(code);
}

#![allow(non_snake_case)]
use RustedCornea::Examples::cornea_examples::{cornea_examples, run_and_report};
use RustedCornea::Utils::logger::init_logging;
use RustedCornea::numerical::Comparison_api::ComparisonConfig;
use log::{LevelFilter, error, info};
use std::path::Path;
use std::process::ExitCode;

/// `RustedCornea`               runs example 0 (all four methods, default parameters)
/// `RustedCornea <n>`           runs example n
/// `RustedCornea <task file>`   runs the comparison described by the task document
fn main() -> ExitCode {
    if let Err(e) = init_logging(LevelFilter::Info) {
        eprintln!("{}", e);
    }
    let arg = std::env::args().nth(1);
    let res = match arg.as_deref().map(|a| (a, a.parse::<usize>())) {
        None => cornea_examples(0),
        Some((_, Ok(example))) => cornea_examples(example),
        Some((path, Err(_))) => ComparisonConfig::from_file(path)
            .and_then(|config| run_and_report(&config, Path::new(".")))
            .map(|_| ()),
    };
    match res {
        Ok(()) => {
            info!(" \n \n Program ended");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

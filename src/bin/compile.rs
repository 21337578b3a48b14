use std::env;
use std::process;

use log::*;

use oud::*;

const USAGE: &str = "Usage: compile <input_dir> <output_dir> <cache_dir>";

fn config_from_args() -> Option<BuildConfig> {
    let mut args = env::args().skip(1);
    let (input_dir, output_dir, cache_dir) = (args.next()?, args.next()?, args.next()?);
    if args.next().is_some() {
        return None;
    }

    let mut config = BuildConfig::new(input_dir, output_dir, cache_dir);
    if let Ok(jobs) = env::var("OUD_JOBS") {
        match jobs.parse() {
            Ok(jobs) => config.jobs = jobs,
            Err(err) => warn!("Ignoring OUD_JOBS={}: {}", jobs, err),
        }
    }
    if let Ok(flag) = env::var("OUD_CACHE_FAILURES") {
        config.cache_failures = matches!(flag.as_str(), "1" | "true" | "yes");
    }
    Some(config)
}

fn main() {
    pretty_env_logger::init();

    let config = match config_from_args() {
        Some(config) => config,
        None => {
            eprintln!("{}", USAGE);
            process::exit(1);
        }
    };

    match build::run(&config) {
        Ok(outcome) if outcome.has_errors() => process::exit(1),
        Ok(_) => {}
        Err(err) => {
            eprintln!("{}", err);
            process::exit(1);
        }
    }
}

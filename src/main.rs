use std::{process, str::FromStr};

use clap::Parser;
use log::{LevelFilter, debug, info};

use finure_diagram::cli::{Args, run};

fn main() {
    let args = Args::parse();

    let log_level = LevelFilter::from_str(&args.log_level).unwrap_or_else(|_| {
        eprintln!(
            "Invalid log level: {}. Using 'warn' instead.",
            args.log_level
        );
        LevelFilter::Warn
    });
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(log_level)
        .init();
    debug!("parsed arguments: {args:?}");

    match run(&args) {
        Ok(rendered) => info!("rendered {}", rendered.path.display()),
        Err(err) => {
            eprintln!("error: {err:#}");
            process::exit(1);
        }
    }
}

use clap::Parser;
use env_logger::Env;
use log::{error, info};
use snafu::ErrorCompat;

mod args;
mod survey;

fn main() {
    let args = args::Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!("args: {:?}", args);

    if let Err(e) = survey::run(&args) {
        error!("Error occured {:?}", e);
        eprintln!("An error occured: {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}

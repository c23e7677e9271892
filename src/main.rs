use std::env;
use std::process::ExitCode;

use adaptive_path_tracer::{usage, Options, UsageError};

fn main() -> ExitCode {
    env_logger::init();

    let mut args = env::args();
    let program = args.next().unwrap_or_else(|| "adaptive-path-tracer".into());
    let options = match Options::parse(args) {
        Ok(options) => options,
        Err(UsageError::Help) => {
            eprintln!("{}", usage(&program));
            return ExitCode::FAILURE;
        }
        Err(UsageError::Invalid(message)) => {
            eprintln!("{message}");
            eprintln!("{}", usage(&program));
            return ExitCode::FAILURE;
        }
    };

    match adaptive_path_tracer::run(options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

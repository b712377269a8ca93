use std::env;
use std::process::ExitCode;
use tern::cli::{self, Config};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let config = match Config::from_args(&args) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::FAILURE;
        }
    };

    cli::run(&config)
}

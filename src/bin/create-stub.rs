//! Generate a minimal prepared stub for testing attribution

use clap::Parser;
use stubattr::exit_codes::{EXIT_INVALID_ARGS, EXIT_PANIC, EXIT_SUCCESS};
use stubattr::{Bitness, Config, exit_codes, write_stub_file};
use std::{env, panic, path::PathBuf, process};

const VERSION: &str = stubattr::version::VERSION;

#[derive(Parser, Debug)]
#[command(version = VERSION, about = "Create a fake stub installer with a reserved attribution area")]
struct Args {
    /// Output path for the stub
    path: PathBuf,

    /// Image width: 32 or 64
    bits: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

fn main() {
    panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC: {}", panic_info);
        process::exit(EXIT_PANIC);
    }));

    match panic::catch_unwind(run) {
        Ok(exit_code) => process::exit(exit_code),
        Err(_) => {
            eprintln!("Fatal: Unhandled panic in create-stub");
            process::exit(EXIT_PANIC);
        }
    }
}

fn run() -> i32 {
    if env::args().nth(1).as_deref() == Some("--version") {
        println!("create-stub {}", stubattr::version::full_version());
        return EXIT_SUCCESS;
    }

    let args = Args::parse();
    let config = Config::from_env().with_overrides(args.log_level, false);
    stubattr::logger::JsonLogger::init(&config);

    let bitness: Bitness = match args.bits.parse() {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_INVALID_ARGS;
        }
    };

    match write_stub_file(&args.path, bitness) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            exit_codes::for_error(&e)
        }
    }
}

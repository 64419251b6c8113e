//! Embed an attribution code into a prepared, signed stub installer

use clap::Parser;
use stubattr::exit_codes::{EXIT_INVALID_ARGS, EXIT_PANIC, EXIT_SUCCESS, EXIT_VERIFY_ERROR};
use stubattr::{Config, PatchOptions, exit_codes, inspect_file, patch_file};
use std::{env, panic, path::PathBuf, process};

const VERSION: &str = stubattr::version::VERSION;

#[derive(Parser, Debug)]
#[command(version = VERSION, about = "Write an attribution code into a signed stub installer")]
struct Args {
    /// Path to the stub installer
    stub: PathBuf,

    /// Percent-encoded attribution code (source, medium, campaign, content)
    code: Option<String>,

    /// Write the patched stub here instead of overwriting the input
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Re-read the written stub and check the stored code
    #[arg(long)]
    verify: bool,

    /// Print the attribution layout of the stub instead of patching it
    #[arg(long, conflicts_with_all = ["code", "output", "verify"])]
    inspect: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error), prefix with json: for JSON lines
    #[arg(long)]
    log_level: Option<String>,
}

fn main() {
    // Set up panic handler to return specific exit code
    panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC: {}", panic_info);
        process::exit(EXIT_PANIC);
    }));

    let result = panic::catch_unwind(run);

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(_) => {
            eprintln!("Fatal: Unhandled panic in stub-modify");
            process::exit(EXIT_PANIC);
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(s) => {
            println!("{s}");
            EXIT_SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            exit_codes::EXIT_ERROR
        }
    }
}

fn run() -> i32 {
    // Handle --version before clap
    if env::args().nth(1).as_deref() == Some("--version") {
        println!("stub-modify {}", stubattr::version::full_version());
        return EXIT_SUCCESS;
    }

    let args = Args::parse();
    let config = Config::from_env().with_overrides(args.log_level.clone(), args.verify);
    stubattr::logger::JsonLogger::init(&config);

    if args.inspect {
        return match inspect_file(&args.stub) {
            Ok(info) if args.json => print_json(&info),
            Ok(info) => {
                println!("Stub: {}", info.path.display());
                println!("  Size: {} bytes", info.file_size);
                println!(
                    "  Certificate table: 0x{:x} ({} bytes)",
                    info.cert_directory.file_offset, info.cert_directory.size
                );
                println!(
                    "  Payload: 0x{:x} ({} bytes)",
                    info.payload_offset, info.payload_capacity
                );
                if info.attribution.is_empty() {
                    println!("  Attribution: (none)");
                } else {
                    println!("  Attribution: {}", info.attribution);
                }
                EXIT_SUCCESS
            }
            Err(e) => {
                eprintln!("Inspect error: {}", e);
                exit_codes::for_error(&e)
            }
        };
    }

    let Some(code) = args.code else {
        eprintln!("Error: an attribution code is required unless --inspect is given");
        return EXIT_INVALID_ARGS;
    };

    let options = PatchOptions {
        output: args.output,
        verify: config.verify,
    };

    match patch_file(&args.stub, &code, options) {
        Ok(report) => {
            let exit_code = if report.verified == Some(false) {
                eprintln!(
                    "Verification failed: {} does not contain the written code",
                    report.output.display()
                );
                EXIT_VERIFY_ERROR
            } else {
                EXIT_SUCCESS
            };

            if args.json {
                let printed = print_json(&report);
                if printed != EXIT_SUCCESS {
                    return printed;
                }
            } else {
                println!("{}", report.code);
            }
            exit_code
        }
        Err(e) => {
            eprintln!("Attribution error: {}", e);
            exit_codes::for_error(&e)
        }
    }
}

use std::{env, fs, process::ExitCode};

use hotloop::{NoopObserver, Runner, StdDiag, format_stack};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        eprintln!("usage: hotloop <program> <t|f>");
        return ExitCode::FAILURE;
    }
    let file_path = &args[1];
    let tracing = match args[2].chars().next() {
        Some('t') => true,
        Some('f') => false,
        _ => {
            eprintln!("error: tracing selector must start with 't' or 'f', got {:?}", args[2]);
            return ExitCode::FAILURE;
        }
    };

    let source = match read_file(file_path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let runner = match Runner::new(&source) {
        Ok(runner) => runner,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runner.run(tracing, &mut StdDiag, NoopObserver) {
        Ok(halted) => {
            println!("{}", format_stack(&halted.stack));
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn read_file(file_path: &str) -> Result<String, String> {
    match fs::metadata(file_path) {
        Ok(metadata) => {
            if !metadata.is_file() {
                return Err(format!("{file_path} is not a file"));
            }
        }
        Err(err) => {
            return Err(format!("cannot read {file_path}: {err}"));
        }
    }
    fs::read_to_string(file_path).map_err(|err| format!("cannot read {file_path}: {err}"))
}

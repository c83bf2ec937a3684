use clap::Parser;
use color_print::cprintln;

use mcvm::{Machine, Stdio};

#[derive(Debug, clap::Parser)]
#[clap(author, version, about = "Run a mini-C program")]
struct Args {
    /// Input file
    input: String,
}

fn main() {
    let args = Args::parse();

    // 1. Read the source text
    let code = match std::fs::read_to_string(&args.input) {
        Ok(code) => code,
        Err(e) => {
            cprintln!("<red,bold>error</>: cannot read {}: {}", args.input, e);
            std::process::exit(1);
        }
    };

    // 2. Parse and check; semantic errors stop the run before any statement
    //    executes
    let program = match mcc::analyze(&code) {
        Ok(program) => program,
        Err(e) => {
            cprintln!("<red,bold>error</>: {}", e);
            std::process::exit(1);
        }
    };

    // 3. Run the entry function
    let mut machine = Machine::new(&program, Stdio);
    match machine.run() {
        Ok(_) => std::process::exit(0),
        Err(fault) => {
            cprintln!("<red,bold>runtime fault</>: {}", fault);
            std::process::exit(2);
        }
    }
}

use calcfn::{Compiler, Interpreter};
use clap::Parser;
use std::io::{self, BufRead, Write};

/// Read formulas of `x` from the standard input, and print their value.
#[derive(Parser, Debug)]
#[command(name = "calcfn", version, about)]
struct Cli {
    /// Value of `x` every formula is evaluated at
    #[arg(long, default_value_t = 42.0, allow_negative_numbers = true)]
    x: f64,

    /// Walk the expression tree instead of generating native code
    #[arg(long)]
    interpret: bool,
}

fn main() {
    env_logger::init();
    let args = Cli::parse();

    let compiler = if args.interpret {
        Compiler::new().with_backend(Interpreter)
    } else {
        calcfn::prepare_compiler()
    };

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            break;
        }
        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(error)) => {
                eprintln!("error: {}", error);
                break;
            }
            None => break,
        };
        let formula = line.trim();
        if formula.is_empty() {
            continue;
        }

        match compiler.compile(formula) {
            Ok(function) => println!("{}", function.invoke(args.x)),
            Err(error) => {
                println!("Errors:");
                for diagnostic in error.diagnostics() {
                    println!("  {}", diagnostic);
                }
            }
        }
    }
}

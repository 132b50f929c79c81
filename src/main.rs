use clap::Parser;
use console::style;

use deterministic_versions::cli::{self, Args};

fn main() {
    let args = Args::parse();

    if args.version {
        println!("deterministic-versions {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    cli::init_logging(&args);

    match cli::run(&args) {
        Ok(output) => {
            if !args.silent {
                println!("{}", output);
            }
        }
        Err(e) => {
            if !args.silent {
                eprintln!("{} {:#}", style("ERROR:").red().bold(), e);
            }
            std::process::exit(1);
        }
    }
}

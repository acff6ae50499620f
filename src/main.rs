use clap::Parser;
use crossback::cli::{Cli, run};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}

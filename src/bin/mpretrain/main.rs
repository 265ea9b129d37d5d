use std::io::IsTerminal;
use std::process::ExitCode;

mod cli;
mod commands;
mod display;
mod io;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::parse();
    let quiet = match &cli.command {
        cli::Command::Check(args) => args.common.quiet,
        cli::Command::Plan(args) => args.common.quiet,
        cli::Command::Encode(args) => args.common.quiet,
    };

    if !quiet && std::io::stderr().is_terminal() {
        display::print_banner();
    }

    match commands::dispatch(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            display::print_error(&e);
            ExitCode::FAILURE
        }
    }
}

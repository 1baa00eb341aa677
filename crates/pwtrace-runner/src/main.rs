use clap::Parser;
use pwtrace_runner::{execute_clean, execute_inspect, setup_logging, Cli, Commands};

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);
    let result = match cli.command {
        Commands::Clean(command) => execute_clean(&command),
        Commands::Inspect(command) => execute_inspect(&command),
    };

    match result {
        Ok(output) => {
            println!("{}", output.rendered);
            if !output.is_success() {
                eprintln!("{}", output.summary());
                std::process::exit(1);
            }
        }
        Err(error) => {
            eprintln!("{error}");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;

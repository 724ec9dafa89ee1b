pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "storefront",
    about = "Storefront operator CLI",
    long_about = "Operate the storefront catalog database and inspect product rankings.",
    after_help = "Examples:\n  storefront migrate\n  storefront seed\n  storefront popular --limit 4\n  storefront related slim-denim-jacket"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo catalog and verify it")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Print the popular items strip computed from checkout history")]
    Popular {
        #[arg(long, help = "Number of items to return (1-100); defaults to ranking.popular_limit")]
        limit: Option<usize>,
    },
    #[command(about = "Print items whose descriptions are most similar to the given item")]
    Related {
        #[arg(help = "Slug of the reference item")]
        slug: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Popular { limit } => commands::popular::run(limit),
        Command::Related { slug } => commands::related::run(&slug),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "plusplus",
    about = "PlusPlus karma bot operator CLI",
    long_about = "Inspect configuration, run readiness checks, apply migrations, and read karma totals.",
    after_help = "Examples:\n  plusplus doctor --json\n  plusplus config\n  plusplus points '<@U123ABC>'\n  plusplus points :sake:"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending SQLite migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, Slack token readiness, and point store connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Show the stored points for a user id, mention, or emoji")]
    Points {
        #[arg(help = "`U123ABC`, `<@U123ABC>`, or `:emoji:`")]
        key: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Points { key } => commands::points::run(&key),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

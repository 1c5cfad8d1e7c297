pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "shopdesk",
    about = "Shopdesk operator CLI",
    long_about = "Operate Shopdesk runtime readiness, migrations, demo data, config inspection, and one-shot support replies.",
    after_help = "Examples:\n  shopdesk doctor --json\n  shopdesk seed\n  shopdesk ask \"where is order 4521\""
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run startup preflight checks and return structured status output")]
    Start,
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo catalog (products, orders, inventory)")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, LLM readiness, DB connectivity, and schema state")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Answer one support message against the configured store and model")]
    Ask {
        #[arg(help = "Customer message to answer")]
        message: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Start => commands::start::run(),
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Ask { message } => commands::ask::run(&message),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

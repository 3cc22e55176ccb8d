pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use spendgate_core::config::{AppConfig, LoadOptions, LogFormat};

#[derive(Debug, Parser)]
#[command(
    name = "spendgate",
    about = "Spendgate approval policy CLI",
    long_about = "Validate, preview and submit spend approval policies, and read stored policies back.",
    after_help = "Examples:\n  spendgate validate policy.json\n  spendgate preview policy.json --directory directory.json\n  spendgate submit policy.json\n  spendgate list"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Normalize a draft policy document and report validation issues")]
    Validate {
        #[arg(help = "Path to the draft policy JSON document")]
        draft: PathBuf,
    },
    #[command(about = "Render the human-readable summary of a draft policy")]
    Preview {
        #[arg(help = "Path to the draft policy JSON document")]
        draft: PathBuf,
        #[arg(long, help = "Directory JSON with users, vendors, customers and inventory items")]
        directory: Option<PathBuf>,
    },
    #[command(about = "Print the wire payload a draft policy would be submitted as")]
    Payload {
        #[arg(help = "Path to the draft policy JSON document")]
        draft: PathBuf,
    },
    #[command(about = "Validate a draft policy and create it on the backend")]
    Submit {
        #[arg(help = "Path to the draft policy JSON document")]
        draft: PathBuf,
        #[arg(long, help = "Directory JSON with users, vendors, customers and inventory items")]
        directory: Option<PathBuf>,
    },
    #[command(about = "List stored approval policies")]
    List,
    #[command(about = "Show the summary of one stored approval policy")]
    Show {
        #[arg(help = "Policy id")]
        id: String,
        #[arg(long, help = "Directory JSON with users, vendors, customers and inventory items")]
        directory: Option<PathBuf>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    if let Ok(config) = AppConfig::load(LoadOptions::default()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Validate { draft } => commands::validate::run(&draft),
        Command::Preview { draft, directory } => {
            commands::preview::run(&draft, directory.as_deref())
        }
        Command::Payload { draft } => commands::payload::run(&draft),
        Command::Submit { draft, directory } => commands::submit::run(&draft, directory.as_deref()),
        Command::List => commands::policies::list(),
        Command::Show { id, directory } => commands::policies::show(&id, directory.as_deref()),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so stdout stays a single JSON outcome.
fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "reacji",
    about = "Reacji operator CLI",
    long_about = "Operate the reacji emoji catalog: migrations, catalog import/export, batch vectorization, and similarity search.",
    after_help = "Examples:\n  reacji migrate\n  reacji import emojis.json\n  reacji vectorize --dry-run\n  reacji search \"we shipped it\" --limit 5"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load a catalog JSON file and bulk insert its entries")]
    Import {
        #[arg(help = "Path to a catalog JSON file")]
        file: PathBuf,
    },
    #[command(about = "Dump the emoji catalog to a JSON file")]
    Export {
        #[arg(help = "Destination path for the catalog JSON")]
        file: PathBuf,
    },
    #[command(about = "Embed catalog entries and persist their vectors")]
    Vectorize {
        #[arg(
            long = "skip-existing",
            help = "Leave rows that already carry an embedding untouched"
        )]
        skip_existing: bool,
        #[arg(long, help = "Only vectorize entries in this category")]
        category: Option<String>,
        #[arg(long = "emotion-tone", help = "Only vectorize entries with this tone")]
        emotion_tone: Option<String>,
        #[arg(long = "dry-run", help = "Report what would be processed without embedding")]
        dry_run: bool,
        #[arg(long = "batch-size", help = "Embed in chunks of N, flushing per chunk")]
        batch_size: Option<usize>,
        #[arg(long = "continue-on-error", help = "Count failed chunks instead of aborting")]
        continue_on_error: bool,
    },
    #[command(about = "One-off similarity search against the catalog")]
    Search {
        #[arg(help = "Text to search for")]
        text: String,
        #[arg(long, help = "Maximum number of results")]
        limit: Option<usize>,
        #[arg(long, help = "Restrict results to this category")]
        category: Option<String>,
        #[arg(long = "emotion-tone", help = "Restrict results to this tone")]
        emotion_tone: Option<String>,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, token readiness, and DB connectivity checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Import { file } => commands::import::run(&file),
        Command::Export { file } => commands::export::run(&file),
        Command::Vectorize {
            skip_existing,
            category,
            emotion_tone,
            dry_run,
            batch_size,
            continue_on_error,
        } => commands::vectorize::run(commands::vectorize::VectorizeArgs {
            skip_existing,
            category,
            emotion_tone,
            dry_run,
            batch_size,
            continue_on_error,
        }),
        Command::Search { text, limit, category, emotion_tone } => {
            commands::search::run(&text, limit, category, emotion_tone)
        }
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

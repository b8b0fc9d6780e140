pub mod draft;
pub mod exercise;
pub mod history;
pub mod output;
pub mod shutdown;

use std::{io::Write, path::PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use draft::{
    process_activity_command, process_effectiveness_command, process_notes_command,
    process_reset_command, process_save_command, process_show_command, process_state_command,
    StateCommand,
};
use exercise::{process_test_command, TestCommand};
use history::{process_clear_command, process_history_command, HistoryCommand};
use output::print_notice;
use tracing::{info, level_filters::LevelFilter};

use crate::{
    tracker::{create_file_store, store::Rehydration},
    utils::{
        dir::{create_application_default_path, ensure_dir},
        logging::{enable_logging, CLI_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "Mindtrack", version, long_about = None)]
#[command(about = "Track your mental state, activities and time perception", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Rate where you are on the focus, energy, mood and curiosity spectrums")]
    State {
        #[command(flatten)]
        command: StateCommand,
    },
    #[command(about = "Set what you are doing right now")]
    Activity { activity: String },
    #[command(about = "Rate how effective you are at the current activity")]
    Effectiveness {
        #[arg(value_parser = clap::value_parser!(u8).range(1..=10), help = "From 1 (not effective) to 10 (very effective)")]
        value: u8,
    },
    #[command(about = "Add observations about your current state")]
    Notes { notes: String },
    #[command(about = "Run a time perception test")]
    Test {
        #[command(flatten)]
        command: TestCommand,
    },
    #[command(about = "Show the entry that is being filled in")]
    Show {},
    #[command(about = "Save the current entry into history")]
    Save {},
    #[command(about = "Discard the current entry")]
    Reset {},
    #[command(about = "Display saved entries, newest first")]
    History {
        #[command(flatten)]
        command: HistoryCommand,
    },
    #[command(about = "Remove every saved entry")]
    Clear {
        #[arg(long, short, help = "Don't ask for confirmation")]
        yes: bool,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = match args.dir {
        Some(dir) => ensure_dir(dir)?,
        None => create_application_default_path()?,
    };

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(CLI_PREFIX, &app_dir.join("logs"), logging_level, args.log)?;

    let mut out = std::io::stdout();
    let mut store = create_file_store(&app_dir)?;
    // Nothing may touch the store before it is loaded
    if let Rehydration::Recovered { reason } = store.rehydrate().await {
        print_notice(&mut out, format!("starting with empty history, {reason}"))?;
    }
    info!("Running {:?}", args.commands);

    match args.commands {
        Commands::State { command } => process_state_command(&mut store, command, &mut out).await?,
        Commands::Activity { activity } => {
            process_activity_command(&mut store, activity, &mut out).await?
        }
        Commands::Effectiveness { value } => {
            process_effectiveness_command(&mut store, value, &mut out).await?
        }
        Commands::Notes { notes } => process_notes_command(&mut store, notes, &mut out).await?,
        Commands::Test { command } => process_test_command(&mut store, command).await?,
        Commands::Show {} => process_show_command(&store, &mut out)?,
        Commands::Save {} => {
            process_save_command(&mut store, &mut out).await?;
        }
        Commands::Reset {} => process_reset_command(&mut store, &mut out).await?,
        Commands::History { command } => process_history_command(&store, command, &mut out)?,
        Commands::Clear { yes } => {
            process_clear_command(&mut store, yes, &mut std::io::stdin().lock(), &mut out).await?
        }
    }

    if let Some(e) = store.take_persistence_error() {
        print_notice(
            &mut out,
            format!("changes couldn't be written to disk and will be lost on exit: {e}"),
        )?;
    }
    out.flush()?;
    Ok(())
}

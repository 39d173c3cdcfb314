//! Command-line interface for `trk`.

pub mod commands;

use crate::config::{self, CliOverrides, SaveSettings};
use crate::error::Result;
use crate::model::ActingContext;
use crate::storage::SqliteStorage;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(
    name = "trk",
    about = "Issue store with audit trail and custom fields",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (defaults to .tracker/tracker.db)
    #[arg(long, global = true, env = "TRACKER_DB")]
    pub db: Option<PathBuf>,

    /// Username recorded on audit events and modifications
    #[arg(long, global = true, env = "TRACKER_ACTOR")]
    pub actor: Option<String>,

    /// Run as a batch job (no open events)
    #[arg(long, global = true)]
    pub batch: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Also write JSON logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import issues from a JSONL file, one attribute object per line
    Import(ImportArgs),

    /// Bind, validate and store one issue
    Save(SaveArgs),

    /// Print the activity rows of an issue as JSON
    Activity(IssueIdArg),

    /// Print the custom field rows of an issue as JSON
    Fields(IssueIdArg),
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// JSONL file to read
    pub file: PathBuf,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct SaveArgs {
    /// Attribute object, e.g. '{"title":"T","description":"D"}'
    #[arg(long = "json", value_name = "OBJECT")]
    pub object: String,

    /// Write absent attributes as NULL
    #[arg(long)]
    pub update_nulls: bool,

    /// Run the whole save in one transaction
    #[arg(long)]
    pub atomic: bool,
}

#[derive(Args, Debug)]
pub struct IssueIdArg {
    pub id: i64,
}

impl Cli {
    /// Config overrides carried by the command line.
    #[must_use]
    pub fn overrides(&self) -> CliOverrides {
        let mut overrides = CliOverrides {
            db: self.db.clone(),
            actor: self.actor.clone(),
            batch: self.batch.then_some(true),
            ..CliOverrides::default()
        };
        if let Commands::Save(args) = &self.command {
            overrides.update_nulls = args.update_nulls.then_some(true);
            overrides.transactional = args.atomic.then_some(true);
        }
        overrides
    }
}

/// Everything a command needs: open storage plus resolved save settings.
pub struct Runtime {
    pub storage: SqliteStorage,
    pub context: ActingContext,
    pub settings: SaveSettings,
}

impl Runtime {
    /// Resolve configuration and open the database.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid or the database cannot be opened.
    pub fn open(overrides: &CliOverrides) -> Result<Self> {
        let tracker_dir = config::discover_tracker_dir(None).ok();
        let layer = config::load_config(tracker_dir.as_deref(), overrides)?;
        let (storage, path) = config::open_storage(&layer, tracker_dir.as_deref())?;
        let context = config::acting_context_from_layer(&layer)?;
        let settings = config::save_settings_from_layer(&layer)?;
        debug!(db = %path.display(), actor = %context.username, mode = ?context.mode, "Opened tracker");

        Ok(Self {
            storage,
            context,
            settings,
        })
    }
}

/// Dispatch a parsed command line.
///
/// # Errors
///
/// Returns the command's error.
pub fn run(cli: &Cli) -> Result<()> {
    let runtime = Runtime::open(&cli.overrides())?;

    match &cli.command {
        Commands::Import(args) => commands::import::execute(args, &runtime),
        Commands::Save(args) => commands::save::execute(args, &runtime),
        Commands::Activity(args) => commands::activity::execute(args.id, &runtime),
        Commands::Fields(args) => commands::fields::execute(args.id, &runtime),
    }
}

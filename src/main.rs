// Entrypoint for the CLI application.
// - Loads the settings file and refuses to start while placeholders remain.
// - Authenticates once, then runs the requested operation(s).
// - Returns `anyhow::Result`; a failed step is printed in red.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use kaltura_ingest::config::{self, Setting, SettingsStore};
use kaltura_ingest::model::{EntryMetadata, MediaKind};
use kaltura_ingest::{init_tracing, ui, ApiClient, WorkflowOrchestrator};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "kaltura-ingest", about = "Upload a video as a new media entry and rewrite its owner")]
struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug details
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a file, then reassign the owner of the new entry
    Run {
        /// Video file to upload
        #[arg(long, default_value = "datafiles/bars_100.avi")]
        file: PathBuf,
        /// Wait for Enter between the two operations
        #[arg(long)]
        pause: bool,
    },
    /// Create an entry from a local video file
    Ingest {
        /// Video file to upload
        file: PathBuf,
        #[command(flatten)]
        meta: MetadataArgs,
    },
    /// Replace an entry's owner with its reversed owner id
    ReassignOwner {
        /// Entry id
        entry_id: String,
    },
    /// Settings file operations
    Config {
        #[command(subcommand)]
        sub: ConfigCommands,
    },
}

#[derive(clap::Args)]
struct MetadataArgs {
    /// Entry name
    #[arg(long, default_value = "Test entry")]
    name: String,
    /// Entry description
    #[arg(long, default_value = "Video uploaded by kaltura-ingest")]
    description: String,
    /// Owner user id
    #[arg(long, default_value = "TEST_USER")]
    owner: String,
}

impl MetadataArgs {
    fn into_metadata(self) -> EntryMetadata {
        EntryMetadata {
            name: self.name,
            description: self.description,
            owner_id: self.owner,
            media_kind: MediaKind::Video,
        }
    }
}

impl Default for MetadataArgs {
    fn default() -> Self {
        MetadataArgs {
            name: "Test entry".into(),
            description: "Video uploaded by kaltura-ingest".into(),
            owner: "TEST_USER".into(),
        }
    }
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the settings (secret masked)
    Show,
    /// Print the settings file path
    Path,
    /// Set a value: api_endpoint, partner_id or admin_secret
    Set { key: String, value: String },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    ui::console_setup();

    let result = run(cli);
    if let Err(e) = &result {
        ui::error(&format!("{:#}", e));
    }
    ui::console_restore();
    if result.is_err() {
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let path = cli.config.unwrap_or_else(config::default_path);
    let mut store = SettingsStore::open(&path)?;

    match cli.command {
        Commands::Config { sub } => config_command(&mut store, sub),
        Commands::Run { file, pause } => with_orchestrator(&store, |wf| {
            let entry_id = ingest(wf, &file, MetadataArgs::default())?;
            if pause {
                ui::pause()?;
            }
            reassign(wf, &entry_id)
        }),
        Commands::Ingest { file, meta } => {
            with_orchestrator(&store, |wf| ingest(wf, &file, meta).map(|_| ()))
        }
        Commands::ReassignOwner { entry_id } => {
            with_orchestrator(&store, |wf| reassign(wf, &entry_id))
        }
    }
}

/// Check settings, authenticate, then hand the orchestrator to `work`.
fn with_orchestrator(
    store: &SettingsStore,
    work: impl FnOnce(&WorkflowOrchestrator<'_, ApiClient>) -> Result<()>,
) -> Result<()> {
    let settings = store.check()?;
    let api = ApiClient::new(&settings.api_endpoint)?;
    let wf = ui::with_spinner("Starting session...", || {
        WorkflowOrchestrator::connect(&api, &settings.credentials)
    })
    .context("Could not start a session")?;
    tracing::debug!(partner_id = wf.session().partner_id, endpoint = api.base_url(), "connected");
    work(&wf)
}

fn ingest(
    wf: &WorkflowOrchestrator<'_, ApiClient>,
    file: &Path,
    meta: MetadataArgs,
) -> Result<String> {
    ui::notice(&format!("Uploading {} as a new entry", file.display()));
    let res = ui::with_spinner("Uploading...", || wf.ingest_file(file, meta.into_metadata()));
    match res {
        Ok(binding) => {
            println!("Created entry {} (upload token {})", binding.entry_id, binding.token_id);
            Ok(binding.entry_id)
        }
        Err(e) => {
            if let Some(id) = &e.entry_id {
                ui::error(&format!("Entry {} was created but has no content", id));
            }
            Err(e.into())
        }
    }
}

fn reassign(wf: &WorkflowOrchestrator<'_, ApiClient>, entry_id: &str) -> Result<()> {
    ui::notice(&format!("Reassigning the owner of {}", entry_id));
    let entry = ui::with_spinner("Updating...", || wf.reassign_owner(entry_id))?;
    println!("Entry {} is now owned by {}", entry.id, entry.owner_id);
    Ok(())
}

fn config_command(store: &mut SettingsStore, sub: ConfigCommands) -> Result<()> {
    match sub {
        ConfigCommands::Show => {
            for (key, value) in store.display_pairs() {
                println!("{} = {}", key, value);
            }
        }
        ConfigCommands::Path => println!("{}", store.path().display()),
        ConfigCommands::Set { key, value } => {
            let setting = Setting::from_key(&key)
                .ok_or_else(|| anyhow!("Unknown setting `{}`", key))?;
            store.set(setting, &value)?;
            println!("{} updated", key);
        }
    }
    Ok(())
}

// Library root
// -----------
// This crate exposes the ingest workflow as a library; the binary
// (`main.rs`) wires it to the settings file and the terminal.
//
// Module responsibilities:
// - `api`: HTTP interactions with the media service behind the `MediaApi`
//   trait.
// - `session`, `entry`, `upload`, `content`: one component per remote
//   resource (session, entry, upload token, content binding).
// - `workflow`: the two operations built on those components.
// - `config`: the persisted settings file and its placeholder check.
// - `ui`: terminal helpers used by the binary.
pub mod api;
pub mod config;
pub mod content;
pub mod entry;
pub mod error;
pub mod model;
pub mod session;
pub mod ui;
pub mod upload;
pub mod workflow;

pub use api::{ApiClient, MediaApi, UploadBody};
pub use error::{ApiError, IngestError, IngestStep, ReassignError, ReassignStep, WorkflowError};
pub use workflow::{reverse_owner, WorkflowOrchestrator};

/// Initialize tracing for the binary. `RUST_LOG` wins over `verbose`.
pub fn init_tracing(verbose: bool) {
    let default = if verbose {
        "kaltura_ingest=debug,warn"
    } else {
        "kaltura_ingest=info,warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_target(false)
        .init();
}

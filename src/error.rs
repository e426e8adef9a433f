// Error types shared by every workflow component.
//
// `ApiError` is what the transport reports; `WorkflowError` is what a
// component reports after deciding what the failure means for its step.
// The orchestrator wraps the latter with the step that failed.

use std::fmt;

use thiserror::Error;

/// Fault codes the service uses for an unknown entry id.
pub const ENTRY_NOT_FOUND_CODES: &[&str] = &["ENTRY_ID_NOT_FOUND", "INVALID_ENTRY_ID"];

/// Failure of a single remote call, before any interpretation.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a usable HTTP response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with an API exception object.
    #[error("service fault {code}: {message}")]
    Fault { code: String, message: String },

    /// The response body could not be decoded into the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Fault { code, .. } if ENTRY_NOT_FOUND_CODES.contains(&code.as_str()))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

/// Error kinds surfaced by the workflow components.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("service error: {0}")]
    Service(#[source] ApiError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("transfer failed: {0}")]
    Transfer(String),

    #[error("precondition violated: {0}")]
    Precondition(String),
}

impl WorkflowError {
    /// Short machine-friendly name of the error kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkflowError::Configuration(_) => "configuration",
            WorkflowError::Authentication(_) => "authentication",
            WorkflowError::Validation(_) => "validation",
            WorkflowError::Service(_) => "service",
            WorkflowError::NotFound(_) => "not_found",
            WorkflowError::Transfer(_) => "transfer",
            WorkflowError::Precondition(_) => "precondition",
        }
    }
}

impl From<ApiError> for WorkflowError {
    fn from(err: ApiError) -> Self {
        WorkflowError::Service(err)
    }
}

/// Steps of the ingest operation, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStep {
    CreateEntry,
    OpenSource,
    AllocateToken,
    TransferContent,
    BindContent,
}

impl fmt::Display for IngestStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IngestStep::CreateEntry => "creating the entry",
            IngestStep::OpenSource => "opening the source file",
            IngestStep::AllocateToken => "allocating an upload token",
            IngestStep::TransferContent => "uploading the file",
            IngestStep::BindContent => "attaching the upload to the entry",
        };
        f.write_str(name)
    }
}

/// Ingest failure tagged with the step that failed.
///
/// `entry_id` is set when the entry was already created; that entry is
/// left on the service without content and is not cleaned up.
#[derive(Debug, Error)]
#[error("{step} failed: {source}")]
pub struct IngestError {
    pub step: IngestStep,
    pub entry_id: Option<String>,
    #[source]
    pub source: WorkflowError,
}

/// Steps of the owner reassignment operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReassignStep {
    FetchEntry,
    UpdateEntry,
}

impl fmt::Display for ReassignStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReassignStep::FetchEntry => f.write_str("fetching the entry"),
            ReassignStep::UpdateEntry => f.write_str("updating the entry owner"),
        }
    }
}

#[derive(Debug, Error)]
#[error("{step} failed for entry {entry_id}: {source}")]
pub struct ReassignError {
    pub step: ReassignStep,
    pub entry_id: String,
    #[source]
    pub source: WorkflowError,
}

// Workflow orchestration: the two supported operations, each driven as a
// small state machine over the components. Failures stop the machine in
// place; nothing is retried and nothing already created is rolled back.

use crate::api::MediaApi;
use crate::content::ContentBinder;
use crate::entry::EntryService;
use crate::error::{IngestError, IngestStep, ReassignError, ReassignStep, WorkflowError};
use crate::model::{
    AdminRole, ContentBinding, Credentials, EntryMetadata, EntryUpdate, MediaEntry, Session,
    UploadToken,
};
use crate::session::SessionAuthenticator;
use crate::upload::UploadCoordinator;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// New owner identifier derived from the current one: the characters in
/// reverse order. Applying it twice gives back the input.
pub fn reverse_owner(owner_id: &str) -> String {
    owner_id.chars().rev().collect()
}

/// States of the ingest operation. `F` opens the byte source, `R` is the
/// opened source; the source lives only in the states between opening and
/// transfer. The transfer moves it into the upload request, which closes it
/// once the request is over.
pub enum IngestState<F, R> {
    Pending { metadata: EntryMetadata, open: F },
    EntryCreated { entry: MediaEntry, open: F },
    SourceOpened { entry: MediaEntry, source: R },
    TokenAllocated { entry: MediaEntry, token: UploadToken, source: R },
    ContentUploaded { entry: MediaEntry, token: UploadToken },
    ContentBound { entry: MediaEntry, binding: ContentBinding },
}

impl<F, R> IngestState<F, R> {
    pub fn name(&self) -> &'static str {
        match self {
            IngestState::Pending { .. } => "pending",
            IngestState::EntryCreated { .. } => "entry_created",
            IngestState::SourceOpened { .. } => "source_opened",
            IngestState::TokenAllocated { .. } => "token_allocated",
            IngestState::ContentUploaded { .. } => "content_uploaded",
            IngestState::ContentBound { .. } => "content_bound",
        }
    }
}

/// States of the owner reassignment operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReassignState {
    Start { entry_id: String },
    Fetched { entry: MediaEntry },
    OwnerComputed { entry_id: String, new_owner: String },
    Updated { entry: MediaEntry },
}

/// Runs the workflow operations with one session, authenticated up front.
pub struct WorkflowOrchestrator<'a, A: MediaApi> {
    api: &'a A,
    session: Session,
}

impl<'a, A: MediaApi> WorkflowOrchestrator<'a, A> {
    /// Authenticate and return an orchestrator bound to the new session.
    /// Nothing else is called if this fails.
    pub fn connect(api: &'a A, credentials: &Credentials) -> Result<Self, WorkflowError> {
        let session = SessionAuthenticator::new(api).authenticate(credentials, AdminRole::Admin)?;
        Ok(Self { api, session })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Ingest a local file as a new video entry.
    pub fn ingest_file(
        &self,
        path: &Path,
        metadata: EntryMetadata,
    ) -> Result<ContentBinding, IngestError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.bin")
            .to_string();
        self.ingest(metadata, &file_name, || File::open(path).map(BufReader::new))
    }

    /// Create an entry, upload the source produced by `open` and attach
    /// it. The returned binding names the new entry.
    ///
    /// Calling this twice with the same input creates two entries. If a
    /// step after entry creation fails, the error carries the id of the
    /// entry, which stays on the service without content.
    pub fn ingest<F, R>(
        &self,
        metadata: EntryMetadata,
        file_name: &str,
        open: F,
    ) -> Result<ContentBinding, IngestError>
    where
        F: FnOnce() -> io::Result<R>,
        R: Read + Send + 'static,
    {
        let mut state = IngestState::Pending { metadata, open };
        loop {
            let next = self.advance_ingest(state, file_name)?;
            tracing::debug!(state = next.name(), "ingest advanced");
            state = match next {
                IngestState::ContentBound { binding, .. } => return Ok(binding),
                next => next,
            };
        }
    }

    fn advance_ingest<F, R>(
        &self,
        state: IngestState<F, R>,
        file_name: &str,
    ) -> Result<IngestState<F, R>, IngestError>
    where
        F: FnOnce() -> io::Result<R>,
        R: Read + Send + 'static,
    {
        let ks = &self.session.token;
        let next = match state {
            IngestState::Pending { metadata, open } => {
                let entry = EntryService::new(self.api)
                    .create(ks, &metadata)
                    .map_err(|e| failed(IngestStep::CreateEntry, None, e))?;
                IngestState::EntryCreated { entry, open }
            }
            IngestState::EntryCreated { entry, open } => {
                let source = open().map_err(|e| {
                    failed(
                        IngestStep::OpenSource,
                        Some(&entry.id),
                        WorkflowError::Transfer(format!("cannot open {}: {}", file_name, e)),
                    )
                })?;
                IngestState::SourceOpened { entry, source }
            }
            IngestState::SourceOpened { entry, source } => {
                let token = UploadCoordinator::new(self.api)
                    .allocate(ks)
                    .map_err(|e| failed(IngestStep::AllocateToken, Some(&entry.id), e))?;
                IngestState::TokenAllocated {
                    entry,
                    token,
                    source,
                }
            }
            IngestState::TokenAllocated {
                entry,
                token: mut upload,
                source,
            } => {
                let upload = UploadCoordinator::new(self.api)
                    .transfer(ks, &mut upload, file_name, source)
                    .map_err(|e| failed(IngestStep::TransferContent, Some(&entry.id), e))?;
                IngestState::ContentUploaded {
                    entry,
                    token: upload,
                }
            }
            IngestState::ContentUploaded { entry, token: upload } => {
                let (entry, binding) = ContentBinder::new(self.api)
                    .attach(ks, &entry.id, upload)
                    .map_err(|e| failed(IngestStep::BindContent, Some(&entry.id), e))?;
                IngestState::ContentBound { entry, binding }
            }
            done @ IngestState::ContentBound { .. } => done,
        };
        Ok(next)
    }

    /// Replace the entry's owner with its reverse. The current owner is
    /// always fetched in this call; only the owner field is sent back.
    pub fn reassign_owner(&self, entry_id: &str) -> Result<MediaEntry, ReassignError> {
        let mut state = ReassignState::Start {
            entry_id: entry_id.to_string(),
        };
        loop {
            state = match self.advance_reassign(state)? {
                ReassignState::Updated { entry } => return Ok(entry),
                next => next,
            };
        }
    }

    fn advance_reassign(&self, state: ReassignState) -> Result<ReassignState, ReassignError> {
        let ks = &self.session.token;
        let entries = EntryService::new(self.api);
        let next = match state {
            ReassignState::Start { entry_id } => {
                let entry = entries.fetch(ks, &entry_id).map_err(|source| ReassignError {
                    step: ReassignStep::FetchEntry,
                    entry_id: entry_id.clone(),
                    source,
                })?;
                tracing::info!(entry_id = %entry.id, owner_id = %entry.owner_id, "current owner");
                ReassignState::Fetched { entry }
            }
            ReassignState::Fetched { entry } => ReassignState::OwnerComputed {
                new_owner: reverse_owner(&entry.owner_id),
                entry_id: entry.id,
            },
            ReassignState::OwnerComputed {
                entry_id,
                new_owner,
            } => {
                tracing::info!(entry_id = %entry_id, new_owner = %new_owner, "updating owner");
                let entry = entries
                    .update(ks, &entry_id, &EntryUpdate::owner(new_owner))
                    .map_err(|source| ReassignError {
                        step: ReassignStep::UpdateEntry,
                        entry_id: entry_id.clone(),
                        source,
                    })?;
                ReassignState::Updated { entry }
            }
            done @ ReassignState::Updated { .. } => done,
        };
        Ok(next)
    }
}

fn failed(step: IngestStep, entry_id: Option<&str>, source: WorkflowError) -> IngestError {
    tracing::warn!(%step, kind = source.kind(), entry_id, "ingest stopped");
    IngestError {
        step,
        entry_id: entry_id.map(str::to_string),
        source,
    }
}

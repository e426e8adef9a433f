// Entry service: create, fetch and partially update media entries.

use crate::api::MediaApi;
use crate::error::{ApiError, WorkflowError};
use crate::model::{EntryMetadata, EntryUpdate, MediaEntry, SessionToken};

pub struct EntryService<'a, A: MediaApi> {
    api: &'a A,
}

impl<'a, A: MediaApi> EntryService<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Create an entry without content. The returned entry always carries
    /// the id the service assigned.
    pub fn create(
        &self,
        session: &SessionToken,
        metadata: &EntryMetadata,
    ) -> Result<MediaEntry, WorkflowError> {
        validate_metadata(metadata)?;

        let entry = self.api.add_entry(session, metadata)?;
        if entry.id.is_empty() {
            return Err(WorkflowError::Service(ApiError::Decode(
                "created entry has no id".into(),
            )));
        }
        tracing::info!(entry_id = %entry.id, name = %entry.name, "entry created");
        Ok(entry)
    }

    /// Current server-side state of an entry.
    pub fn fetch(&self, session: &SessionToken, entry_id: &str) -> Result<MediaEntry, WorkflowError> {
        let entry = self
            .api
            .get_entry(session, entry_id)
            .map_err(|e| not_found_or_service(entry_id, e))?;
        tracing::debug!(entry_id, owner_id = %entry.owner_id, "entry fetched");
        Ok(entry)
    }

    /// Apply only the fields set in `update`.
    pub fn update(
        &self,
        session: &SessionToken,
        entry_id: &str,
        update: &EntryUpdate,
    ) -> Result<MediaEntry, WorkflowError> {
        if update.is_empty() {
            return Err(WorkflowError::Validation(
                "update carries no fields".into(),
            ));
        }
        let entry = self
            .api
            .update_entry(session, entry_id, update)
            .map_err(|e| not_found_or_service(entry_id, e))?;
        tracing::info!(entry_id, "entry updated");
        Ok(entry)
    }
}

fn validate_metadata(metadata: &EntryMetadata) -> Result<(), WorkflowError> {
    if metadata.name.trim().is_empty() {
        return Err(WorkflowError::Validation("entry name is empty".into()));
    }
    if metadata.owner_id.trim().is_empty() {
        return Err(WorkflowError::Validation("entry owner id is empty".into()));
    }
    Ok(())
}

fn not_found_or_service(entry_id: &str, err: ApiError) -> WorkflowError {
    if err.is_not_found() {
        WorkflowError::NotFound(format!("entry {}", entry_id))
    } else {
        WorkflowError::Service(err)
    }
}

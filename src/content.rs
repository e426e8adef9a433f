// Content binder: attach a completed upload to an entry.

use crate::api::MediaApi;
use crate::error::{ApiError, WorkflowError};
use crate::model::{ContentBinding, MediaEntry, SessionToken, TransferState, UploadToken};

pub struct ContentBinder<'a, A: MediaApi> {
    api: &'a A,
}

impl<'a, A: MediaApi> ContentBinder<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Bind `token` as the entry's content. The token is consumed: a slot
    /// is attached at most once.
    ///
    /// Passing a token whose transfer is not `Complete` is a caller bug and
    /// fails with `WorkflowError::Precondition` without contacting the
    /// service.
    pub fn attach(
        &self,
        session: &SessionToken,
        entry_id: &str,
        token: UploadToken,
    ) -> Result<(MediaEntry, ContentBinding), WorkflowError> {
        if token.state != TransferState::Complete {
            return Err(WorkflowError::Precondition(format!(
                "upload token {} is {:?}; only complete uploads can be attached",
                token.id, token.state
            )));
        }

        let entry = self.api.add_entry_content(session, entry_id, &token.id)?;
        if entry.id != entry_id {
            return Err(WorkflowError::Service(ApiError::Decode(format!(
                "content attached to {} but service answered for {}",
                entry_id, entry.id
            ))));
        }

        tracing::info!(entry_id, token_id = %token.id, "content attached");
        Ok((
            entry,
            ContentBinding {
                entry_id: entry_id.to_string(),
                token_id: token.id,
            },
        ))
    }
}

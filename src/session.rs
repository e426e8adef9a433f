// Session authentication: trade partner credentials for a session token.

use crate::api::MediaApi;
use crate::error::WorkflowError;
use crate::model::{AdminRole, Credentials, Session};

pub struct SessionAuthenticator<'a, A: MediaApi> {
    api: &'a A,
}

impl<'a, A: MediaApi> SessionAuthenticator<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    /// Start an administrative session. Credentials are checked locally
    /// first so malformed input never reaches the service. Any failure is
    /// reported as `WorkflowError::Authentication` and is not retried.
    pub fn authenticate(
        &self,
        credentials: &Credentials,
        role: AdminRole,
    ) -> Result<Session, WorkflowError> {
        let partner_id = parse_partner_id(&credentials.partner_id)?;
        if credentials.secret.trim().is_empty() {
            return Err(WorkflowError::Authentication(
                "admin secret is empty".into(),
            ));
        }

        let token = self
            .api
            .start_session(
                partner_id,
                &credentials.secret,
                &credentials.user_label,
                role,
            )
            .map_err(|e| WorkflowError::Authentication(e.to_string()))?;
        if token.as_str().is_empty() {
            return Err(WorkflowError::Authentication(
                "service returned an empty session token".into(),
            ));
        }

        tracing::info!(partner_id, "session started");
        Ok(Session {
            token,
            partner_id,
            role,
        })
    }
}

fn parse_partner_id(raw: &str) -> Result<u32, WorkflowError> {
    raw.trim().parse::<u32>().map_err(|_| {
        WorkflowError::Authentication(format!(
            "partner id `{}` is not a non-negative integer",
            raw
        ))
    })
}

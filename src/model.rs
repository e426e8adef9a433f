// Data shapes exchanged with the media service. Field names mirror the
// service's JSON so the same structs are used on the wire and in the
// workflow.

use serde::{Deserialize, Serialize};
use std::fmt;

/// User label attached to the administrative session.
pub const DEFAULT_USER_LABEL: &str = "BULK_ADMIN_USER";

/// Session role. Only the administrative role is used by this workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminRole {
    Admin,
}

impl AdminRole {
    /// Numeric session type expected by `session.start`.
    pub fn session_type(self) -> u8 {
        match self {
            AdminRole::Admin => 2,
        }
    }
}

/// Opaque session credential passed to every call after authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Keep the credential out of logs.
impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionToken(<{} chars>)", self.0.len())
    }
}

/// An authenticated context, created once and held for the whole run.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: SessionToken,
    pub partner_id: u32,
    pub role: AdminRole,
}

/// Long-lived credentials exchanged for a session.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Partner id as read from configuration; parsed by the authenticator.
    pub partner_id: String,
    pub secret: String,
    pub user_label: String,
}

/// Kind of media an entry holds. Types this client does not create (live
/// streams and the like) are kept as `Other` with their raw code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum MediaKind {
    Video,
    Image,
    Audio,
    Other(i32),
}

impl From<MediaKind> for i32 {
    fn from(kind: MediaKind) -> i32 {
        match kind {
            MediaKind::Video => 1,
            MediaKind::Image => 2,
            MediaKind::Audio => 5,
            MediaKind::Other(code) => code,
        }
    }
}

impl From<i32> for MediaKind {
    fn from(value: i32) -> Self {
        match value {
            1 => MediaKind::Video,
            2 => MediaKind::Image,
            5 => MediaKind::Audio,
            other => MediaKind::Other(other),
        }
    }
}

/// Metadata supplied when creating an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryMetadata {
    pub name: String,
    pub description: String,
    #[serde(rename = "userId")]
    pub owner_id: String,
    #[serde(rename = "mediaType")]
    pub media_kind: MediaKind,
}

/// Partial update: only the `Some` fields are sent, the rest stay as they
/// are on the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntryUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}

impl EntryUpdate {
    /// An update that only changes the owner identifier.
    pub fn owner(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: Some(owner_id.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.owner_id.is_none()
    }
}

/// A remote media record as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaEntry {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "userId", default)]
    pub owner_id: String,
    #[serde(rename = "mediaType", default)]
    pub media_kind: Option<MediaKind>,
}

/// Progress of bytes into an upload slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Allocated,
    Transferring,
    Complete,
    Failed,
}

impl TransferState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TransferState::Complete | TransferState::Failed)
    }
}

/// Handle to a server-side staging slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadToken {
    pub id: String,
    pub state: TransferState,
}

impl UploadToken {
    pub fn allocated(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: TransferState::Allocated,
        }
    }
}

/// Upload slot status codes reported by the service.
pub mod upload_status {
    pub const PENDING: i32 = 0;
    pub const PARTIAL_UPLOAD: i32 = 1;
    pub const FULL_UPLOAD: i32 = 2;
    pub const CLOSED: i32 = 3;
    pub const TIMED_OUT: i32 = 4;
    pub const DELETED: i32 = 5;

    pub fn describe(code: i32) -> &'static str {
        match code {
            PENDING => "pending",
            PARTIAL_UPLOAD => "partial upload",
            FULL_UPLOAD => "full upload",
            CLOSED => "closed",
            TIMED_OUT => "timed out",
            DELETED => "deleted",
            _ => "unknown",
        }
    }
}

/// Upload slot as the service describes it. The service reports the
/// received size as a float.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTokenRecord {
    pub id: String,
    #[serde(default)]
    pub status: Option<i32>,
    #[serde(default)]
    pub uploaded_file_size: Option<f64>,
}

/// Association of a completed upload with an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentBinding {
    pub entry_id: String,
    pub token_id: String,
}

// In-memory media service used by the integration tests. It records every
// call in order and enforces the same rules the real service does for
// sessions, unknown entries and consumed upload tokens.
#![allow(dead_code)]

use kaltura_ingest::error::ApiError;
use kaltura_ingest::model::{
    upload_status, AdminRole, Credentials, EntryMetadata, EntryUpdate, MediaEntry, SessionToken,
    UploadTokenRecord, DEFAULT_USER_LABEL,
};
use kaltura_ingest::{MediaApi, UploadBody};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const SECRET: &str = "s3cret-admin";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    StartSession { partner_id: u32, user_label: String },
    AddEntry(EntryMetadata),
    GetEntry(String),
    UpdateEntry(String, EntryUpdate),
    AddUploadToken,
    Upload { token_id: String, bytes: usize },
    AddContent { entry_id: String, token_id: String },
}

impl Call {
    pub fn name(&self) -> &'static str {
        match self {
            Call::StartSession { .. } => "start_session",
            Call::AddEntry(_) => "add_entry",
            Call::GetEntry(_) => "get_entry",
            Call::UpdateEntry(..) => "update_entry",
            Call::AddUploadToken => "add_upload_token",
            Call::Upload { .. } => "upload_to_token",
            Call::AddContent { .. } => "add_entry_content",
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    bytes: Option<usize>,
    consumed: bool,
}

#[derive(Default)]
pub struct FakeMediaApi {
    calls: RefCell<Vec<Call>>,
    entries: RefCell<BTreeMap<String, MediaEntry>>,
    content: RefCell<HashMap<String, String>>,
    slots: RefCell<BTreeMap<String, Slot>>,
    failures: RefCell<HashMap<&'static str, ApiError>>,
    issued: RefCell<Option<String>>,
    next_id: Cell<u32>,
}

pub fn fault(code: &str) -> ApiError {
    ApiError::Fault {
        code: code.to_string(),
        message: format!("{} raised by fake", code),
    }
}

impl FakeMediaApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call named `call` fail with `err`.
    pub fn fail_next(&self, call: &'static str, err: ApiError) {
        self.failures.borrow_mut().insert(call, err);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn call_names(&self) -> Vec<&'static str> {
        self.calls.borrow().iter().map(Call::name).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls.borrow().iter().filter(|c| c.name() == name).count()
    }

    pub fn entry(&self, id: &str) -> Option<MediaEntry> {
        self.entries.borrow().get(id).cloned()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Token bound to the entry, if any.
    pub fn content_of(&self, entry_id: &str) -> Option<String> {
        self.content.borrow().get(entry_id).cloned()
    }

    /// Seed an entry directly, bypassing the call log.
    pub fn seed_entry(&self, owner: &str) -> String {
        let id = self.fresh_id("0");
        self.entries.borrow_mut().insert(
            id.clone(),
            MediaEntry {
                id: id.clone(),
                name: "seeded".into(),
                description: String::new(),
                owner_id: owner.into(),
                media_kind: None,
            },
        );
        id
    }

    fn fresh_id(&self, prefix: &str) -> String {
        let n = self.next_id.get() + 1;
        self.next_id.set(n);
        format!("{}_{:08x}", prefix, n)
    }

    fn record(&self, call: Call) -> Result<(), ApiError> {
        let name = call.name();
        self.calls.borrow_mut().push(call);
        match self.failures.borrow_mut().remove(name) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn check_session(&self, session: &SessionToken) -> Result<(), ApiError> {
        match self.issued.borrow().as_deref() {
            Some(ks) if ks == session.as_str() => Ok(()),
            _ => Err(fault("INVALID_KS")),
        }
    }
}

impl MediaApi for FakeMediaApi {
    fn start_session(
        &self,
        partner_id: u32,
        secret: &str,
        user_label: &str,
        _role: AdminRole,
    ) -> Result<SessionToken, ApiError> {
        self.record(Call::StartSession {
            partner_id,
            user_label: user_label.to_string(),
        })?;
        if secret != SECRET {
            return Err(fault("START_SESSION_ERROR"));
        }
        let ks = format!("ks-{}-{}", partner_id, self.fresh_id("s"));
        *self.issued.borrow_mut() = Some(ks.clone());
        Ok(SessionToken::new(ks))
    }

    fn add_entry(
        &self,
        session: &SessionToken,
        metadata: &EntryMetadata,
    ) -> Result<MediaEntry, ApiError> {
        self.record(Call::AddEntry(metadata.clone()))?;
        self.check_session(session)?;
        let entry = MediaEntry {
            id: self.fresh_id("0"),
            name: metadata.name.clone(),
            description: metadata.description.clone(),
            owner_id: metadata.owner_id.clone(),
            media_kind: Some(metadata.media_kind),
        };
        self.entries
            .borrow_mut()
            .insert(entry.id.clone(), entry.clone());
        Ok(entry)
    }

    fn get_entry(&self, session: &SessionToken, entry_id: &str) -> Result<MediaEntry, ApiError> {
        self.record(Call::GetEntry(entry_id.to_string()))?;
        self.check_session(session)?;
        self.entry(entry_id).ok_or_else(|| fault("ENTRY_ID_NOT_FOUND"))
    }

    fn update_entry(
        &self,
        session: &SessionToken,
        entry_id: &str,
        update: &EntryUpdate,
    ) -> Result<MediaEntry, ApiError> {
        self.record(Call::UpdateEntry(entry_id.to_string(), update.clone()))?;
        self.check_session(session)?;
        let mut entries = self.entries.borrow_mut();
        let entry = entries
            .get_mut(entry_id)
            .ok_or_else(|| fault("ENTRY_ID_NOT_FOUND"))?;
        if let Some(name) = &update.name {
            entry.name = name.clone();
        }
        if let Some(description) = &update.description {
            entry.description = description.clone();
        }
        if let Some(owner) = &update.owner_id {
            entry.owner_id = owner.clone();
        }
        Ok(entry.clone())
    }

    fn add_upload_token(&self, session: &SessionToken) -> Result<UploadTokenRecord, ApiError> {
        self.record(Call::AddUploadToken)?;
        self.check_session(session)?;
        let id = self.fresh_id("1");
        self.slots.borrow_mut().insert(id.clone(), Slot::default());
        Ok(UploadTokenRecord {
            id,
            status: Some(upload_status::PENDING),
            uploaded_file_size: None,
        })
    }

    fn upload_to_token(
        &self,
        session: &SessionToken,
        token_id: &str,
        _file_name: &str,
        mut body: UploadBody,
    ) -> Result<UploadTokenRecord, ApiError> {
        // drain the body the way the transport does, then let it go
        let mut data = Vec::new();
        let read = body.read_to_end(&mut data);
        drop(body);
        self.record(Call::Upload {
            token_id: token_id.to_string(),
            bytes: data.len(),
        })?;
        if let Err(e) = read {
            return Err(ApiError::Transport(format!("request body failed: {}", e)));
        }
        self.check_session(session)?;
        let mut slots = self.slots.borrow_mut();
        let slot = slots
            .get_mut(token_id)
            .ok_or_else(|| fault("UPLOAD_TOKEN_NOT_FOUND"))?;
        if slot.bytes.is_some() {
            return Err(fault("UPLOAD_TOKEN_INVALID_STATUS_FOR_UPLOAD"));
        }
        slot.bytes = Some(data.len());
        Ok(UploadTokenRecord {
            id: token_id.to_string(),
            status: Some(upload_status::FULL_UPLOAD),
            uploaded_file_size: Some(data.len() as f64),
        })
    }

    fn add_entry_content(
        &self,
        session: &SessionToken,
        entry_id: &str,
        token_id: &str,
    ) -> Result<MediaEntry, ApiError> {
        self.record(Call::AddContent {
            entry_id: entry_id.to_string(),
            token_id: token_id.to_string(),
        })?;
        self.check_session(session)?;
        let entry = self
            .entry(entry_id)
            .ok_or_else(|| fault("ENTRY_ID_NOT_FOUND"))?;
        let mut slots = self.slots.borrow_mut();
        let slot = slots
            .get_mut(token_id)
            .ok_or_else(|| fault("UPLOAD_TOKEN_NOT_FOUND"))?;
        if slot.bytes.is_none() || slot.consumed {
            return Err(fault("UPLOAD_TOKEN_INVALID_STATUS"));
        }
        if self.content.borrow().contains_key(entry_id) {
            return Err(fault("ENTRY_ALREADY_HAS_CONTENT"));
        }
        slot.consumed = true;
        self.content
            .borrow_mut()
            .insert(entry_id.to_string(), token_id.to_string());
        Ok(entry)
    }
}

pub fn credentials() -> Credentials {
    Credentials {
        partner_id: "1234".into(),
        secret: SECRET.into(),
        user_label: DEFAULT_USER_LABEL.into(),
    }
}

pub fn video(name: &str, owner: &str) -> EntryMetadata {
    EntryMetadata {
        name: name.into(),
        description: "Video made for the test suite".into(),
        owner_id: owner.into(),
        media_kind: kaltura_ingest::model::MediaKind::Video,
    }
}

/// Reader that serves `good` bytes, then fails. Sets `released` when
/// dropped.
pub struct BrokenReader {
    remaining: usize,
    released: Arc<AtomicBool>,
}

impl BrokenReader {
    pub fn new(good: usize) -> (Self, Arc<AtomicBool>) {
        let released = Arc::new(AtomicBool::new(false));
        (
            BrokenReader {
                remaining: good,
                released: released.clone(),
            },
            released,
        )
    }
}

impl Read for BrokenReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Err(io::Error::new(io::ErrorKind::Other, "disk went away"));
        }
        let n = self.remaining.min(buf.len());
        buf[..n].fill(b'x');
        self.remaining -= n;
        Ok(n)
    }
}

impl Drop for BrokenReader {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// In-memory reader that reports when it is dropped.
pub struct TrackedReader {
    inner: io::Cursor<Vec<u8>>,
    released: Arc<AtomicBool>,
}

impl TrackedReader {
    pub fn new(data: &[u8]) -> (Self, Arc<AtomicBool>) {
        let released = Arc::new(AtomicBool::new(false));
        (
            TrackedReader {
                inner: io::Cursor::new(data.to_vec()),
                released: released.clone(),
            },
            released,
        )
    }
}

impl Read for TrackedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Drop for TrackedReader {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

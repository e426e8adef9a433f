// API client module: contains a small blocking HTTP client that talks to
// the media service's JSON API, plus the `MediaApi` trait the workflow
// components are written against. Tests swap the HTTP client for an
// in-memory fake through that trait.

use crate::error::ApiError;
use crate::model::{
    AdminRole, EntryMetadata, EntryUpdate, MediaEntry, SessionToken, UploadTokenRecord,
};
use anyhow::{Context, Result};
use reqwest::blocking::{multipart, Client};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::io::Read;
use std::time::Duration;

/// Byte source handed to an upload. It is moved into the request body and
/// read there, chunk by chunk, while the request is sent.
pub type UploadBody = Box<dyn Read + Send + 'static>;

/// Object type the service uses to report a failed call.
const API_EXCEPTION: &str = "KalturaAPIException";

/// Ask the service for JSON responses.
const FORMAT_JSON: u8 = 1;

/// The seven remote calls the workflow needs. Every call after
/// `start_session` receives the session token explicitly.
pub trait MediaApi {
    fn start_session(
        &self,
        partner_id: u32,
        secret: &str,
        user_label: &str,
        role: AdminRole,
    ) -> Result<SessionToken, ApiError>;

    fn add_entry(
        &self,
        session: &SessionToken,
        metadata: &EntryMetadata,
    ) -> Result<MediaEntry, ApiError>;

    fn get_entry(&self, session: &SessionToken, entry_id: &str) -> Result<MediaEntry, ApiError>;

    fn update_entry(
        &self,
        session: &SessionToken,
        entry_id: &str,
        update: &EntryUpdate,
    ) -> Result<MediaEntry, ApiError>;

    fn add_upload_token(&self, session: &SessionToken) -> Result<UploadTokenRecord, ApiError>;

    /// Stream `body` into the slot in one request, reading it until it is
    /// exhausted or fails.
    fn upload_to_token(
        &self,
        session: &SessionToken,
        token_id: &str,
        file_name: &str,
        body: UploadBody,
    ) -> Result<UploadTokenRecord, ApiError>;

    fn add_entry_content(
        &self,
        session: &SessionToken,
        entry_id: &str,
        token_id: &str,
    ) -> Result<MediaEntry, ApiError>;
}

/// Blocking HTTP implementation of `MediaApi`.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client for the service rooted at `endpoint`
    /// (for example `https://www.kaltura.com`).
    pub fn new(endpoint: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ApiClient {
            client,
            base_url: endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn action_url(&self, service: &str, action: &str) -> String {
        format!(
            "{}/api_v3/service/{}/action/{}",
            self.base_url, service, action
        )
    }

    /// POST a JSON call and decode the result, turning API exceptions into
    /// `ApiError::Fault`.
    fn call<T: DeserializeOwned>(
        &self,
        service: &str,
        action: &str,
        session: Option<&SessionToken>,
        params: Value,
    ) -> Result<T, ApiError> {
        let mut body = match params {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        body.insert("format".into(), json!(FORMAT_JSON));
        if let Some(ks) = session {
            body.insert("ks".into(), json!(ks.as_str()));
        }

        tracing::debug!(service, action, "calling media service");
        let res = self
            .client
            .post(self.action_url(service, action))
            .json(&body)
            .send()?;
        Self::decode(res)
    }

    fn decode<T: DeserializeOwned>(res: reqwest::blocking::Response) -> Result<T, ApiError> {
        let status = res.status();
        if !status.is_success() {
            let txt = res.text().unwrap_or_else(|_| "".into());
            return Err(ApiError::Transport(format!("HTTP {} - {}", status, txt)));
        }
        let value: Value = res.json()?;
        decode_value(value)
    }
}

/// Interpret a response body: either an API exception or the expected value.
pub(crate) fn decode_value<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    if value.get("objectType").and_then(Value::as_str) == Some(API_EXCEPTION) {
        let field = |name: &str| {
            value
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        return Err(ApiError::Fault {
            code: field("code"),
            message: field("message"),
        });
    }
    serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

fn with_object_type(value: Value, object_type: &str) -> Value {
    match value {
        Value::Object(mut map) => {
            map.insert("objectType".into(), json!(object_type));
            Value::Object(map)
        }
        other => other,
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

impl MediaApi for ApiClient {
    fn start_session(
        &self,
        partner_id: u32,
        secret: &str,
        user_label: &str,
        role: AdminRole,
    ) -> Result<SessionToken, ApiError> {
        let ks: String = self.call(
            "session",
            "start",
            None,
            json!({
                "secret": secret,
                "userId": user_label,
                "type": role.session_type(),
                "partnerId": partner_id,
            }),
        )?;
        Ok(SessionToken::new(ks))
    }

    fn add_entry(
        &self,
        session: &SessionToken,
        metadata: &EntryMetadata,
    ) -> Result<MediaEntry, ApiError> {
        let entry = with_object_type(to_json(metadata)?, "KalturaMediaEntry");
        self.call("media", "add", Some(session), json!({ "entry": entry }))
    }

    fn get_entry(&self, session: &SessionToken, entry_id: &str) -> Result<MediaEntry, ApiError> {
        self.call("media", "get", Some(session), json!({ "entryId": entry_id }))
    }

    fn update_entry(
        &self,
        session: &SessionToken,
        entry_id: &str,
        update: &EntryUpdate,
    ) -> Result<MediaEntry, ApiError> {
        let fields = with_object_type(to_json(update)?, "KalturaMediaEntry");
        self.call(
            "media",
            "update",
            Some(session),
            json!({ "entryId": entry_id, "mediaEntry": fields }),
        )
    }

    fn add_upload_token(&self, session: &SessionToken) -> Result<UploadTokenRecord, ApiError> {
        self.call(
            "uploadtoken",
            "add",
            Some(session),
            json!({ "uploadToken": { "objectType": "KalturaUploadToken" } }),
        )
    }

    fn upload_to_token(
        &self,
        session: &SessionToken,
        token_id: &str,
        file_name: &str,
        body: UploadBody,
    ) -> Result<UploadTokenRecord, ApiError> {
        let part = multipart::Part::reader(body)
            .file_name(file_name.to_string())
            .mime_str("application/octet-stream")?;
        let form = multipart::Form::new()
            .text("ks", session.as_str().to_string())
            .text("format", FORMAT_JSON.to_string())
            .text("uploadTokenId", token_id.to_string())
            .text("resume", "0")
            .text("finalChunk", "1")
            .part("fileData", part);

        tracing::debug!(token_id, "streaming to token");
        let res = self
            .client
            .post(self.action_url("uploadtoken", "upload"))
            .multipart(form)
            .send()?;
        Self::decode(res)
    }

    fn add_entry_content(
        &self,
        session: &SessionToken,
        entry_id: &str,
        token_id: &str,
    ) -> Result<MediaEntry, ApiError> {
        self.call(
            "media",
            "addContent",
            Some(session),
            json!({
                "entryId": entry_id,
                "resource": {
                    "objectType": "KalturaUploadedFileTokenResource",
                    "token": token_id,
                },
            }),
        )
    }
}

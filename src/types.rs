//! Wire types for the dashboard API
//!
//! Response envelopes are decoded in one explicit step: a body that does
//! not parse, or that lacks the `success` flag, is a protocol failure; a
//! flag that is present but false is an application failure.

use crate::assets::Asset;
use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Boolean as the backend emits it: `true`, `1`, `"true"`, `"1"` ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "FlagRepr")]
pub struct Flag(pub bool);

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagRepr {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl TryFrom<FlagRepr> for Flag {
    type Error = String;

    fn try_from(repr: FlagRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            FlagRepr::Bool(b) => Ok(Flag(b)),
            FlagRepr::Int(i) => Ok(Flag(i != 0)),
            FlagRepr::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(Flag(true)),
                "false" | "0" | "no" | "" => Ok(Flag(false)),
                other => Err(format!("not a boolean flag: {other:?}")),
            },
        }
    }
}

impl From<Flag> for bool {
    fn from(flag: Flag) -> bool {
        flag.0
    }
}

fn flag_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Common part of every response envelope
pub trait Envelope: Sized {
    fn success(&self) -> Option<bool>;

    fn message(&self) -> Option<&str> {
        None
    }

    /// Missing flag -> protocol failure, false -> application failure
    fn into_success(self) -> Result<Self> {
        match self.success() {
            None => Err(SyncError::protocol(None, "response is missing the success flag")),
            Some(false) => Err(SyncError::Application {
                message: self.message().map(str::to_string),
            }),
            Some(true) => Ok(self),
        }
    }
}

// ==================== Applicant form ====================

/// Application record as stored server side
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRecordDto {
    #[serde(default)]
    pub id: Option<i64>,
    /// JSON-encoded map of question id to answer
    #[serde(default)]
    pub question_responses: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub visa_required: Option<Flag>,
    #[serde(default)]
    pub visa_required_date: Option<String>,
    #[serde(default)]
    pub is_submitted: Option<Flag>,
    #[serde(default)]
    pub cv_url: Option<String>,
    #[serde(default)]
    pub cv_filename: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationLoadResponse {
    #[serde(default)]
    pub success: Option<Flag>,
    #[serde(default)]
    pub record: Option<ApplicationRecordDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationUpdateResponse {
    #[serde(default)]
    pub success: Option<Flag>,
    #[serde(default)]
    pub payload: Option<ApplicationRecordDto>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Outgoing application update; every value is a string so the same
/// shape works as a JSON body and as multipart text parts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationUpdate {
    pub question_responses: String,
    pub country: String,
    pub visa_required: String,
    pub visa_required_date: String,
    pub is_submitted: String,
}

impl ApplicationUpdate {
    pub fn new(
        question_responses: &BTreeMap<String, String>,
        country: &str,
        visa_required: bool,
        visa_required_date: Option<chrono::NaiveDate>,
        is_submitted: bool,
    ) -> Result<Self> {
        Ok(Self {
            question_responses: serde_json::to_string(question_responses)?,
            country: country.to_string(),
            visa_required: flag_str(visa_required).to_string(),
            visa_required_date: visa_required_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            is_submitted: flag_str(is_submitted).to_string(),
        })
    }

    /// (name, value) pairs in wire order
    pub fn fields(&self) -> [(&'static str, &str); 5] {
        [
            ("questionResponses", self.question_responses.as_str()),
            ("country", self.country.as_str()),
            ("visaRequired", self.visa_required.as_str()),
            ("visaRequiredDate", self.visa_required_date.as_str()),
            ("isSubmitted", self.is_submitted.as_str()),
        ]
    }
}

/// Binary file sent along with a save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

// ==================== Sponsor portal ====================

/// Decoded content of a sponsor detail `payload` string
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortalPayload {
    #[serde(default)]
    pub data: BTreeMap<String, String>,
    #[serde(default)]
    pub files: Vec<Asset>,
}

impl PortalPayload {
    /// Only a JSON object is a payload; serde would otherwise accept an
    /// array for this all-defaulted struct.
    pub fn decode(raw: &str) -> Result<Self> {
        let invalid = |e: String| SyncError::protocol(None, format!("undecodable detail payload: {e}"));
        let value: serde_json::Value = serde_json::from_str(raw).map_err(|e| invalid(e.to_string()))?;
        if !value.is_object() {
            return Err(invalid(format!("expected an object, got {raw}")));
        }
        serde_json::from_value(value).map_err(|e| invalid(e.to_string()))
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SponsorDetailDto {
    #[serde(default)]
    pub id: Option<i64>,
    /// JSON-encoded [`PortalPayload`]
    pub payload: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadResourcesRequest {
    pub sponsor_id: i64,
    pub sponsor_slug: String,
    pub detail_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoadResourcesResponse {
    #[serde(default)]
    pub success: Option<Flag>,
    #[serde(default)]
    pub details: Vec<SponsorDetailDto>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveResourceRequest {
    pub sponsor_id: i64,
    pub sponsor_slug: String,
    pub detail_type: String,
    /// `-1` before the first save
    pub detail_id: i64,
    pub complete: &'static str,
    pub payload: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveResourceResponse {
    #[serde(default)]
    pub success: Option<Flag>,
    #[serde(default)]
    pub detail: Option<SponsorDetailDto>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoveAssetRequest {
    pub sponsor_id: i64,
    pub sponsor_slug: String,
    pub asset_url: String,
}

/// Envelope of endpoints that only report an outcome
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub success: Option<Flag>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Envelope for ApplicationLoadResponse {
    fn success(&self) -> Option<bool> {
        self.success.map(bool::from)
    }
}

impl Envelope for ApplicationUpdateResponse {
    fn success(&self) -> Option<bool> {
        self.success.map(bool::from)
    }

    fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl Envelope for LoadResourcesResponse {
    fn success(&self) -> Option<bool> {
        self.success.map(bool::from)
    }
}

impl Envelope for SaveResourceResponse {
    fn success(&self) -> Option<bool> {
        self.success.map(bool::from)
    }

    fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl Envelope for StatusResponse {
    fn success(&self) -> Option<bool> {
        self.success.map(bool::from)
    }

    fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

//! Client configuration

use crate::error::{Result, SyncError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration, usually read from `portal-sync.toml`.
///
/// Every field has a default so an empty document is a valid config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the dashboard backend
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Optional API key, sent as a bearer token
    #[serde(default)]
    pub api_key: Option<String>,

    /// Optional form-protection token, sent as `X-CSRF-TOKEN`
    #[serde(default)]
    pub csrf_token: Option<String>,

    /// Request timeout in seconds; unset leaves the transport default
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    #[serde(default)]
    pub endpoints: Endpoints,

    #[serde(default)]
    pub application: ApplicationSettings,

    #[serde(default)]
    pub sponsor: SponsorSettings,
}

/// Endpoint paths, relative to `base_url`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoints {
    #[serde(default = "default_application_record")]
    pub application_record: String,
    #[serde(default = "default_update_application")]
    pub update_application: String,
    #[serde(default = "default_remove_cv")]
    pub remove_cv: String,
    #[serde(default = "default_load_resources")]
    pub load_resources: String,
    #[serde(default = "default_save_resource")]
    pub save_resource: String,
    #[serde(default = "default_remove_asset")]
    pub remove_asset: String,
}

/// One free-text question of the applicant form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDef {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub placeholder: String,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

impl QuestionDef {
    pub fn new(id: &str, title: &str, placeholder: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            placeholder: placeholder.to_string(),
            max_length: default_max_length(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationSettings {
    /// Country preselected for a fresh application
    #[serde(default = "default_country")]
    pub default_country: String,

    /// Last date selectable as a visa deadline (the event date)
    #[serde(default = "default_event_date")]
    pub event_date: NaiveDate,

    /// MIME filter hint for the CV picker
    #[serde(default = "default_cv_mime_type")]
    pub cv_mime_type: String,

    #[serde(default = "default_questions")]
    pub questions: Vec<QuestionDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SponsorSettings {
    /// Field keys every portal starts with
    #[serde(default = "default_portal_fields")]
    pub portal_fields: Vec<String>,

    /// Upload size hint shown next to the add-asset button
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: u32,
}

// Defaults
fn default_base_url() -> String { "http://localhost:8000".to_string() }
fn default_application_record() -> String { "/dashboard-api/application-record.json".to_string() }
fn default_update_application() -> String { "/dashboard-api/update-application.json".to_string() }
fn default_remove_cv() -> String { "/dashboard-api/remove-cv.json".to_string() }
fn default_load_resources() -> String { "/sponsors/dashboard-api/load-resources.json".to_string() }
fn default_save_resource() -> String { "/sponsors/dashboard-api/add-resource.json".to_string() }
fn default_remove_asset() -> String { "/sponsors/dashboard-api/remove-asset.json".to_string() }
fn default_country() -> String { "GB".to_string() }
fn default_event_date() -> NaiveDate { NaiveDate::from_ymd_opt(2020, 1, 17).unwrap_or_default() }
fn default_cv_mime_type() -> String { "application/pdf".to_string() }
fn default_max_length() -> usize { 200 }
fn default_max_upload_mb() -> u32 { 20 }
fn default_portal_fields() -> Vec<String> {
    vec!["description".to_string(), "url".to_string()]
}
fn default_questions() -> Vec<QuestionDef> {
    vec![
        QuestionDef::new("1", "What do you want to get out of this event?", ""),
        QuestionDef::new(
            "2",
            "What are you interested in?",
            "Mention anything you want -- it doesn't have to be technology-related!",
        ),
        QuestionDef::new("3", "Tell us about a recent accomplishment you're proud of.", ""),
        QuestionDef::new(
            "4",
            "Are there any links you'd like to share so we can get to know you better?",
            "For example GitHub, LinkedIn or your website. Put each link on a new line. ",
        ),
    ]
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            application_record: default_application_record(),
            update_application: default_update_application(),
            remove_cv: default_remove_cv(),
            load_resources: default_load_resources(),
            save_resource: default_save_resource(),
            remove_asset: default_remove_asset(),
        }
    }
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            default_country: default_country(),
            event_date: default_event_date(),
            cv_mime_type: default_cv_mime_type(),
            questions: default_questions(),
        }
    }
}

impl Default for SponsorSettings {
    fn default() -> Self {
        Self {
            portal_fields: default_portal_fields(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            csrf_token: None,
            timeout_secs: None,
            endpoints: Endpoints::default(),
            application: ApplicationSettings::default(),
            sponsor: SponsorSettings::default(),
        }
    }
}

impl ClientConfig {
    /// Parse a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| SyncError::Config(e.to_string()))
    }

    /// Read and parse a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SyncError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    /// Join an endpoint path onto the base URL
    pub fn url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }
}

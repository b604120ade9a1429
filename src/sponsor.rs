//! Sponsor portal
//!
//! One detail record per (sponsor, detail type): free-form text fields
//! plus a list of uploaded files, stored server side as a JSON payload.

use crate::asset_flow::RemovalPhase;
use crate::assets::Asset;
use crate::client::PortalClient;
use crate::config::SponsorSettings;
use crate::engine::{LoadOutcome, Messages, Mutation, RecordStore, SaveOptions, SyncEngine};
use crate::error::{Result, SyncError};
use crate::notify::{Level, Notifier};
use crate::record::{Action, FieldCatalog, Record, RecordState};
use crate::types::{
    Envelope, LoadResourcesRequest, PortalPayload, RemoveAssetRequest, SaveResourceRequest,
    SponsorDetailDto,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Sponsor the portal acts for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SponsorRef {
    pub id: i64,
    pub slug: String,
}

impl SponsorRef {
    pub fn new(id: i64, slug: impl Into<String>) -> Self {
        Self {
            id,
            slug: slug.into(),
        }
    }
}

pub type SponsorRecord = Record<()>;

fn uploaded(count: usize) -> String {
    format!("Successfully uploaded {count} file(s)")
}

fn remove_failed(server: Option<&str>) -> String {
    match server {
        Some(message) => format!("Failed to remove file: {message}"),
        None => "Failed to remove file".to_string(),
    }
}

pub const SPONSOR_MESSAGES: Messages = Messages {
    saved: "Form saved",
    failed: "An error occurred",
    uploaded,
    upload_failed: "An error occurred",
    removed: "Successfully removed file",
    removed_level: Level::Success,
    remove_failed,
};

impl SponsorDetailDto {
    /// Typed record from the stored payload
    pub fn decode(self) -> Result<SponsorRecord> {
        let payload = PortalPayload::decode(&self.payload)?;
        Ok(Record {
            id: self.id,
            fixed: (),
            dynamic: payload.data,
            assets: payload.files.into(),
        })
    }
}

/// Remote store of one sponsor detail
pub struct SponsorResourceStore {
    client: PortalClient,
    sponsor: SponsorRef,
    detail_type: String,
}

impl SponsorResourceStore {
    pub fn new(client: PortalClient, sponsor: SponsorRef, detail_type: impl Into<String>) -> Self {
        Self {
            client,
            sponsor,
            detail_type: detail_type.into(),
        }
    }

    pub fn sponsor(&self) -> &SponsorRef {
        &self.sponsor
    }

    pub fn detail_type(&self) -> &str {
        &self.detail_type
    }
}

#[async_trait]
impl RecordStore for SponsorResourceStore {
    type Fixed = ();

    fn messages(&self) -> &Messages {
        &SPONSOR_MESSAGES
    }

    async fn load(&self) -> Result<Option<SponsorRecord>> {
        let request = LoadResourcesRequest {
            sponsor_id: self.sponsor.id,
            sponsor_slug: self.sponsor.slug.clone(),
            detail_type: self.detail_type.clone(),
        };
        let response = self.client.load_resources(&request).await?.into_success()?;
        response.details.into_iter().next().map(|d| d.decode()).transpose()
    }

    async fn save(&self, mutation: &Mutation<()>) -> Result<SponsorRecord> {
        let record = &mutation.record;
        let payload = PortalPayload {
            data: record.dynamic.clone(),
            files: record.assets.clone().into(),
        };
        let request = SaveResourceRequest {
            sponsor_id: self.sponsor.id,
            sponsor_slug: self.sponsor.slug.clone(),
            detail_type: self.detail_type.clone(),
            detail_id: record.id.unwrap_or(-1),
            complete: "yes",
            payload: payload.encode()?,
        };
        let response = self.client.save_resource(&request).await?.into_success()?;
        let detail = response
            .detail
            .ok_or_else(|| SyncError::protocol(None, "save response has no detail"))?;

        let mut saved = detail.decode()?;
        saved.id = saved.id.or(record.id);
        Ok(saved)
    }

    async fn remove_asset(&self, asset: &Asset) -> Result<()> {
        let request = RemoveAssetRequest {
            sponsor_id: self.sponsor.id,
            sponsor_slug: self.sponsor.slug.clone(),
            asset_url: asset.url.clone(),
        };
        self.client.remove_asset(&request).await?.into_success()?;
        Ok(())
    }
}

/// "Resources" style label for a field key
pub fn field_label(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Sponsor portal surface
pub struct SponsorPortal {
    engine: SyncEngine<SponsorResourceStore>,
    max_upload_mb: u32,
}

impl SponsorPortal {
    pub fn new(
        client: PortalClient,
        settings: &SponsorSettings,
        sponsor: SponsorRef,
        detail_type: impl Into<String>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let catalog: FieldCatalog = settings.portal_fields.iter().cloned().collect();
        let store = SponsorResourceStore::new(client, sponsor, detail_type);
        Self {
            engine: SyncEngine::new(store, RecordState::new(catalog, ()), notifier),
            max_upload_mb: settings.max_upload_mb,
        }
    }

    pub fn engine(&self) -> &SyncEngine<SponsorResourceStore> {
        &self.engine
    }

    pub fn state(&self) -> RecordState<()> {
        self.engine.snapshot()
    }

    pub fn max_upload_mb(&self) -> u32 {
        self.max_upload_mb
    }

    pub async fn load(&self) -> LoadOutcome {
        self.engine.load().await
    }

    /// (key, label, value) for every field, catalog order first
    pub fn fields(&self) -> Vec<(String, String, String)> {
        self.engine.with_state(|s| {
            let mut keys: Vec<&str> = s.catalog.keys().collect();
            keys.extend(
                s.record
                    .dynamic
                    .keys()
                    .map(String::as_str)
                    .filter(|k| !s.catalog.contains(k)),
            );
            keys.into_iter()
                .map(|k| (k.to_string(), field_label(k), s.dynamic_value(k).to_string()))
                .collect()
        })
    }

    pub fn set_field(&self, key: &str, value: &str) {
        self.engine.dispatch(Action::SetDynamicField {
            key: key.to_string(),
            value: value.to_string(),
        });
    }

    /// Save the draft; `silent` suppresses the success notification
    pub async fn save(&self, silent: bool) -> Result<SponsorRecord> {
        let options = if silent {
            SaveOptions::silent()
        } else {
            SaveOptions::default()
        };
        self.engine.save(self.engine.draft(), options).await
    }

    pub fn assets(&self) -> Vec<Asset> {
        self.engine.with_state(|s| s.record.assets.iter().cloned().collect())
    }

    pub fn is_upload_form_open(&self) -> bool {
        self.engine.with_state(|s| s.ui.upload_form_open)
    }

    pub fn toggle_upload_form(&self) {
        if self.is_upload_form_open() {
            self.engine.assets().close_upload_form();
        } else {
            self.engine.assets().open_upload_form();
        }
    }

    /// Save files the upload form already stored
    pub async fn add_uploaded(&self, uploaded: Vec<Asset>) -> Result<SponsorRecord> {
        self.engine.assets().add_uploaded(uploaded).await
    }

    pub fn request_removal(&self, asset: &Asset) -> Result<()> {
        self.engine.assets().request_removal(asset)
    }

    pub fn cancel_removal(&self) -> Result<()> {
        self.engine.assets().cancel_removal()
    }

    pub async fn confirm_removal(&self) -> Result<SponsorRecord> {
        self.engine.assets().confirm_removal().await
    }

    pub fn removal_phase(&self) -> RemovalPhase {
        self.engine.assets().phase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::CollectingNotifier;

    #[test]
    fn test_field_labels() {
        assert_eq!(field_label("description"), "Description");
        assert_eq!(field_label("url"), "Url");
        assert_eq!(field_label(""), "");
    }

    #[test]
    fn test_messages() {
        assert_eq!((SPONSOR_MESSAGES.uploaded)(2), "Successfully uploaded 2 file(s)");
        assert_eq!(
            (SPONSOR_MESSAGES.remove_failed)(Some("gone")),
            "Failed to remove file: gone"
        );
        assert_eq!((SPONSOR_MESSAGES.remove_failed)(None), "Failed to remove file");
    }

    #[test]
    fn test_decode_detail() {
        let dto = SponsorDetailDto {
            id: Some(4),
            payload: r#"{"data":{"url":"https://acme.test"},"files":[{"name":"logo.png","url":"u1"},{"name":"dup","url":"u1"}]}"#.into(),
        };
        let record = dto.decode().unwrap();
        assert_eq!(record.id, Some(4));
        assert_eq!(record.dynamic_value("url"), "https://acme.test");
        assert_eq!(record.assets.urls(), vec!["u1"]);

        let bad = SponsorDetailDto {
            id: None,
            payload: "[]".into(),
        };
        assert!(matches!(bad.decode(), Err(SyncError::Protocol { .. })));
    }

    #[test]
    fn test_portal_fields_and_toggle() {
        let client = PortalClient::new(Default::default()).unwrap();
        let portal = SponsorPortal::new(
            client,
            &SponsorSettings::default(),
            SponsorRef::new(1, "acme"),
            "resources",
            Arc::new(CollectingNotifier::new()),
        );

        portal.set_field("description", "Widgets");
        portal.set_field("unknown", "ignored");
        let fields = portal.fields();
        assert_eq!(fields.len(), 2);
        assert_eq!(
            fields[0],
            ("description".into(), "Description".into(), "Widgets".into())
        );

        assert!(!portal.is_upload_form_open());
        portal.toggle_upload_form();
        assert!(portal.is_upload_form_open());
        portal.toggle_upload_form();
        assert!(!portal.is_upload_form_open());
    }
}

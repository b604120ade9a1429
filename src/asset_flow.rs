//! Asset lifecycle: add (upload) and remove (confirm, delete, re-sync)
//!
//! Both flows go through the engine so a confirmed response still
//! replaces the record wholesale. Adding never touches the local asset
//! list; the new list only exists in the outgoing mutation until the
//! server confirms it.

use crate::assets::Asset;
use crate::engine::{RecordStore, SaveOptions, SyncEngine};
use crate::error::{Result, SyncError};
use crate::record::{Action, Record};
use crate::types::Attachment;
use async_trait::async_trait;
use std::path::PathBuf;

/// Progress of a single remove-asset action
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RemovalPhase {
    #[default]
    Idle,
    /// Confirmation gate shown for this asset
    ConfirmationPending(Asset),
    Deleting(Asset),
    Done,
}

/// Platform file picker
#[async_trait]
pub trait FileSelector: Send + Sync {
    /// Let the user pick one file; `Ok(None)` on cancellation.
    ///
    /// `mime_type` is a filter hint, not enforced.
    async fn select_one(&self, mime_type: &str) -> Result<Option<Attachment>>;
}

/// Selector that always "picks" a file already on disk
#[derive(Debug, Clone)]
pub struct LocalFileSelector {
    path: PathBuf,
}

impl LocalFileSelector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FileSelector for LocalFileSelector {
    async fn select_one(&self, mime_type: &str) -> Result<Option<Attachment>> {
        let bytes = tokio::fs::read(&self.path).await?;
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Some(Attachment::new(file_name, mime_type, bytes)))
    }
}

/// Add/remove operations on one engine's asset list
pub struct AssetManager<'a, S: RecordStore> {
    engine: &'a SyncEngine<S>,
}

impl<S: RecordStore> SyncEngine<S> {
    pub fn assets(&self) -> AssetManager<'_, S> {
        AssetManager { engine: self }
    }
}

impl<'a, S: RecordStore> AssetManager<'a, S> {
    pub fn phase(&self) -> RemovalPhase {
        self.engine.with_state(|s| s.ui.removal.clone())
    }

    pub fn open_upload_form(&self) {
        self.engine.dispatch(Action::SetUploadFormOpen(true));
    }

    pub fn close_upload_form(&self) {
        self.engine.dispatch(Action::SetUploadFormOpen(false));
    }

    /// Save assets already stored by the upload form, appended to the
    /// current list.
    pub async fn add_uploaded(&self, uploaded: Vec<Asset>) -> Result<Record<S::Fixed>> {
        let count = uploaded.len();
        let mut mutation = self.engine.draft();
        mutation.record.assets = mutation.record.assets.concat(uploaded);
        tracing::debug!(count, total = mutation.record.assets.len(), "saving uploaded assets");

        let message = (self.engine.messages().uploaded)(count);
        let record = self
            .engine
            .save(mutation, SaveOptions::with_message(message))
            .await?;
        self.close_upload_form();
        Ok(record)
    }

    /// Save the current draft with `file` attached
    pub async fn add_file(&self, file: Attachment) -> Result<Record<S::Fixed>> {
        let guard = self.engine.acquire()?;
        tracing::debug!(file = %file.file_name, bytes = file.size(), "uploading attachment");
        self.engine.dispatch(Action::SetUploading(true));

        let message = (self.engine.messages().uploaded)(1);
        let mutation = self.engine.draft().with_attachment(file);
        let result = self
            .engine
            .save_locked(&guard, mutation, SaveOptions::with_message(message))
            .await;

        self.engine.dispatch(Action::SetUploading(false));
        result
    }

    /// Pick a file and upload it. `Ok(None)` if the user cancelled.
    pub async fn add_from(
        &self,
        selector: &dyn FileSelector,
        mime_type: &str,
    ) -> Result<Option<Record<S::Fixed>>> {
        match selector.select_one(mime_type).await {
            Ok(Some(file)) => self.add_file(file).await.map(Some),
            Ok(None) => Ok(None),
            Err(e) => {
                tracing::warn!(error = %e, "file selection failed");
                self.engine
                    .notifier()
                    .error(self.engine.messages().upload_failed);
                Err(e)
            }
        }
    }

    /// Open the confirmation gate for `asset`
    pub fn request_removal(&self, asset: &Asset) -> Result<()> {
        let (phase, present) = self.engine.with_state(|s| {
            (s.ui.removal.clone(), s.record.assets.contains_url(&asset.url))
        });
        if !matches!(phase, RemovalPhase::Idle | RemovalPhase::Done) {
            return Err(SyncError::InvalidTransition(format!(
                "removal already in progress: {phase:?}"
            )));
        }
        if !present {
            return Err(SyncError::InvalidTransition(format!(
                "asset {} is not attached",
                asset.url
            )));
        }
        self.engine
            .dispatch(Action::SetRemoval(RemovalPhase::ConfirmationPending(asset.clone())));
        Ok(())
    }

    /// Close the confirmation gate without deleting anything
    pub fn cancel_removal(&self) -> Result<()> {
        match self.phase() {
            RemovalPhase::ConfirmationPending(_) => {
                self.engine.dispatch(Action::SetRemoval(RemovalPhase::Idle));
                Ok(())
            }
            phase => Err(SyncError::InvalidTransition(format!(
                "nothing to cancel: {phase:?}"
            ))),
        }
    }

    /// Delete the pending asset, drop it locally, then re-sync the record.
    ///
    /// A failed delete goes back to `Idle` with the asset list untouched.
    pub async fn confirm_removal(&self) -> Result<Record<S::Fixed>> {
        let asset = match self.phase() {
            RemovalPhase::ConfirmationPending(asset) => asset,
            phase => {
                return Err(SyncError::InvalidTransition(format!(
                    "no removal awaiting confirmation: {phase:?}"
                )))
            }
        };
        let guard = self.engine.acquire()?;
        self.engine
            .dispatch(Action::SetRemoval(RemovalPhase::Deleting(asset.clone())));

        if let Err(e) = self.engine.remove_asset_locked(&guard, &asset).await {
            tracing::warn!(asset = %asset.url, error = %e, "asset removal failed");
            let message = (self.engine.messages().remove_failed)(e.server_message());
            self.engine.notifier().error(&message);
            self.engine.dispatch(Action::SetRemoval(RemovalPhase::Idle));
            return Err(e);
        }

        let remaining = self
            .engine
            .with_state(|s| s.record.assets.without_url(&asset.url));
        self.engine.dispatch(Action::ReplaceAssets(remaining));
        self.engine.dispatch(Action::SetRemoval(RemovalPhase::Done));
        tracing::info!(asset = %asset.url, "asset removed, re-syncing");

        let messages = self.engine.messages();
        let options = SaveOptions::with_message(messages.removed).at_level(messages.removed_level);
        self.engine
            .save_locked(&guard, self.engine.draft(), options)
            .await
    }
}

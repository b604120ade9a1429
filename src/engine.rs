//! Save/sync engine
//!
//! Owns one [`RecordState`] and the single-flight lock of its record.
//! Edits are applied synchronously through [`SyncEngine::dispatch`];
//! `load`, `save` and asset removal are the only suspension points.
//! A confirmed response replaces the record wholesale, any failure leaves
//! it exactly as it was before the call.

use crate::assets::Asset;
use crate::error::{Result, SyncError};
use crate::lock::{MutationGuard, MutationLock};
use crate::notify::{Level, Notifier};
use crate::record::{Action, FixedFields, Record, RecordState};
use crate::types::Attachment;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;

/// Notification texts of one surface
#[derive(Debug, Clone, Copy)]
pub struct Messages {
    pub saved: &'static str,
    /// Shown for transport/protocol failures and silent rejections
    pub failed: &'static str,
    pub uploaded: fn(usize) -> String,
    pub upload_failed: &'static str,
    pub removed: &'static str,
    /// Level the removal notice is shown at
    pub removed_level: Level,
    pub remove_failed: fn(Option<&str>) -> String,
}

/// Remote side of one record kind
#[async_trait]
pub trait RecordStore: Send + Sync {
    type Fixed: FixedFields;

    fn messages(&self) -> &Messages;

    /// `Ok(None)` when nothing is stored yet
    async fn load(&self) -> Result<Option<Record<Self::Fixed>>>;

    /// Persist `mutation` and return the record as the server now holds it
    async fn save(&self, mutation: &Mutation<Self::Fixed>) -> Result<Record<Self::Fixed>>;

    async fn remove_asset(&self, asset: &Asset) -> Result<()>;
}

/// What a save sends: a full record snapshot plus an optional file
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation<F> {
    pub record: Record<F>,
    pub attachment: Option<Attachment>,
}

impl<F> Mutation<F> {
    pub fn new(record: Record<F>) -> Self {
        Self {
            record,
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

pub type CompletionCallback<F> = Box<dyn FnOnce(&Record<F>) + Send>;

/// Per-call save behaviour
pub struct SaveOptions<F> {
    /// Suppress the success notification
    pub silent: bool,
    /// Replaces the surface's default success text
    pub success_message: Option<String>,
    /// Level of the success notification
    pub level: Level,
    /// Runs after the confirmed record has been applied
    pub on_success: Option<CompletionCallback<F>>,
}

impl<F> Default for SaveOptions<F> {
    fn default() -> Self {
        Self {
            silent: false,
            success_message: None,
            level: Level::Success,
            on_success: None,
        }
    }
}

impl<F> SaveOptions<F> {
    pub fn silent() -> Self {
        Self {
            silent: true,
            ..Self::default()
        }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            success_message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn at_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn on_success(mut self, callback: impl FnOnce(&Record<F>) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(callback));
        self
    }
}

#[derive(Debug, Clone, Copy)]
enum BusyKind {
    Loading,
    Saving,
}

/// Raises a busy flag for its lifetime
struct BusyFlag<'a, F: FixedFields> {
    state: &'a watch::Sender<RecordState<F>>,
    kind: BusyKind,
}

impl<'a, F: FixedFields> BusyFlag<'a, F> {
    fn raise(state: &'a watch::Sender<RecordState<F>>, kind: BusyKind) -> Self {
        apply(state, busy_action(kind, true));
        Self { state, kind }
    }
}

impl<F: FixedFields> Drop for BusyFlag<'_, F> {
    fn drop(&mut self) {
        apply(self.state, busy_action(self.kind, false));
    }
}

fn busy_action<F: FixedFields>(kind: BusyKind, on: bool) -> Action<F> {
    match kind {
        BusyKind::Loading => Action::SetLoading(on),
        BusyKind::Saving => Action::SetSaving(on),
    }
}

fn apply<F: FixedFields>(state: &watch::Sender<RecordState<F>>, action: Action<F>) {
    state.send_modify(|s| *s = std::mem::take(s).apply(action));
}

/// Result of [`SyncEngine::load`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Stored record applied
    Restored,
    /// Nothing stored yet
    Empty,
    /// Request failed; the stored record, if any, is unknown
    Failed,
    /// Another request was in flight
    Skipped,
}

impl LoadOutcome {
    pub fn is_restored(self) -> bool {
        self == LoadOutcome::Restored
    }
}

/// Save/sync engine for one record
pub struct SyncEngine<S: RecordStore> {
    store: S,
    state: watch::Sender<RecordState<S::Fixed>>,
    lock: MutationLock,
    notifier: Arc<dyn Notifier>,
}

impl<S: RecordStore> SyncEngine<S> {
    pub fn new(store: S, initial: RecordState<S::Fixed>, notifier: Arc<dyn Notifier>) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            store,
            state,
            lock: MutationLock::new(),
            notifier,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    pub fn messages(&self) -> &Messages {
        self.store.messages()
    }

    /// Current state
    pub fn snapshot(&self) -> RecordState<S::Fixed> {
        self.state.borrow().clone()
    }

    /// Read the current state without cloning it
    pub fn with_state<R>(&self, f: impl FnOnce(&RecordState<S::Fixed>) -> R) -> R {
        f(&self.state.borrow())
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<RecordState<S::Fixed>> {
        self.state.subscribe()
    }

    /// Apply one transition to the state
    pub fn dispatch(&self, action: Action<S::Fixed>) {
        tracing::trace!(?action, "dispatch");
        apply(&self.state, action);
    }

    /// Mutation carrying the current draft
    pub fn draft(&self) -> Mutation<S::Fixed> {
        Mutation::new(self.with_state(|s| s.record.clone()))
    }

    pub fn is_in_flight(&self) -> bool {
        self.lock.is_held()
    }

    pub(crate) fn acquire(&self) -> Result<MutationGuard> {
        self.lock.try_acquire()
    }

    /// Restore the stored record, if any.
    ///
    /// Failures are logged and otherwise leave the defaults in place; the
    /// outcome tells callers that must not save over an unseen record.
    pub async fn load(&self) -> LoadOutcome {
        let _guard = match self.acquire() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::debug!("load skipped, request in flight");
                return LoadOutcome::Skipped;
            }
        };
        let _loading = BusyFlag::raise(&self.state, BusyKind::Loading);

        match self.store.load().await {
            Ok(Some(record)) => {
                tracing::info!(id = ?record.id, "record loaded");
                self.dispatch(Action::ReplaceFromServer(record));
                LoadOutcome::Restored
            }
            Ok(None) => {
                tracing::debug!("no stored record, keeping defaults");
                LoadOutcome::Empty
            }
            Err(e) => {
                tracing::warn!(error = %e, "load failed, keeping defaults");
                LoadOutcome::Failed
            }
        }
    }

    /// Persist `mutation`.
    ///
    /// Refused with [`SyncError::Busy`] while another request for this
    /// record is in flight; nothing is queued.
    pub async fn save(
        &self,
        mutation: Mutation<S::Fixed>,
        options: SaveOptions<S::Fixed>,
    ) -> Result<Record<S::Fixed>> {
        let guard = self.acquire().inspect_err(|_| {
            tracing::warn!("save refused, request in flight");
        })?;
        self.save_locked(&guard, mutation, options).await
    }

    pub(crate) async fn save_locked(
        &self,
        _guard: &MutationGuard,
        mutation: Mutation<S::Fixed>,
        options: SaveOptions<S::Fixed>,
    ) -> Result<Record<S::Fixed>> {
        let _saving = BusyFlag::raise(&self.state, BusyKind::Saving);

        match self.store.save(&mutation).await {
            Ok(record) => {
                tracing::info!(id = ?record.id, assets = record.assets.len(), "save confirmed");
                self.dispatch(Action::ReplaceFromServer(record.clone()));
                if !options.silent {
                    let message = options
                        .success_message
                        .as_deref()
                        .unwrap_or(self.messages().saved);
                    match options.level {
                        Level::Success => self.notifier.success(message),
                        Level::Info => self.notifier.info(message),
                        Level::Error => self.notifier.error(message),
                    }
                }
                if let Some(callback) = options.on_success {
                    callback(&record);
                }
                Ok(record)
            }
            Err(e) => {
                tracing::warn!(error = %e, "save failed");
                self.notifier
                    .error(&e.notification_message(self.messages().failed));
                Err(e)
            }
        }
    }

    pub(crate) async fn remove_asset_locked(&self, _guard: &MutationGuard, asset: &Asset) -> Result<()> {
        let _loading = BusyFlag::raise(&self.state, BusyKind::Loading);
        self.store.remove_asset(asset).await
    }
}

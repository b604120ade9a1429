//! Draft/submitted lifecycle
//!
//! Transitions are user-triggered saves. The committed status only moves
//! when the server confirms; while a transition is in flight the requested
//! action is shown as loading.

use crate::engine::{RecordStore, SaveOptions, SyncEngine};
use crate::error::{Result, SyncError};
use crate::record::{Action, FixedFields, Record};
use crate::types::Attachment;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LifecycleStatus {
    Draft,
    Submitted,
}

impl LifecycleStatus {
    pub fn from_submitted(submitted: bool) -> Self {
        if submitted {
            LifecycleStatus::Submitted
        } else {
            LifecycleStatus::Draft
        }
    }

    pub fn is_submitted(self) -> bool {
        self == LifecycleStatus::Submitted
    }
}

/// Save actions offered by a form with a submission gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FormAction {
    SaveDraft,
    Submit,
    Unsubmit,
    Update,
}

impl FormAction {
    /// Status the save asks the server for
    pub fn requested_status(self) -> LifecycleStatus {
        match self {
            FormAction::SaveDraft | FormAction::Unsubmit => LifecycleStatus::Draft,
            FormAction::Submit | FormAction::Update => LifecycleStatus::Submitted,
        }
    }

    /// Status the action is offered from
    pub fn offered_from(self) -> LifecycleStatus {
        match self {
            FormAction::SaveDraft | FormAction::Submit => LifecycleStatus::Draft,
            FormAction::Unsubmit | FormAction::Update => LifecycleStatus::Submitted,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FormAction::SaveDraft => "Save Draft",
            FormAction::Submit => "Submit",
            FormAction::Unsubmit => "Unsubmit",
            FormAction::Update => "Update",
        }
    }
}

/// One action button as the surface should render it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Affordance {
    pub action: FormAction,
    pub primary: bool,
    pub destructive: bool,
    pub loading: bool,
}

/// Buttons for `status`. `pending` marks the action whose save is in flight.
pub fn affordances(status: LifecycleStatus, pending: Option<FormAction>) -> Vec<Affordance> {
    let actions: [(FormAction, bool, bool); 2] = match status {
        LifecycleStatus::Draft => [
            (FormAction::SaveDraft, false, false),
            (FormAction::Submit, true, false),
        ],
        LifecycleStatus::Submitted => [
            (FormAction::Unsubmit, false, true),
            (FormAction::Update, true, false),
        ],
    };
    actions
        .into_iter()
        .map(|(action, primary, destructive)| Affordance {
            action,
            primary,
            destructive,
            loading: pending == Some(action),
        })
        .collect()
}

/// Fixed fields carrying a submission flag
pub trait Submittable: FixedFields {
    fn is_submitted(&self) -> bool;

    fn set_submitted(&mut self, submitted: bool);
}

/// Lifecycle transitions on one engine
pub struct LifecycleController<'a, S: RecordStore>
where
    S::Fixed: Submittable,
{
    engine: &'a SyncEngine<S>,
}

impl<S: RecordStore> SyncEngine<S>
where
    S::Fixed: Submittable,
{
    pub fn lifecycle(&self) -> LifecycleController<'_, S> {
        LifecycleController { engine: self }
    }
}

impl<'a, S: RecordStore> LifecycleController<'a, S>
where
    S::Fixed: Submittable,
{
    /// Last server-confirmed status
    pub fn status(&self) -> LifecycleStatus {
        self.engine
            .with_state(|s| LifecycleStatus::from_submitted(s.record.fixed.is_submitted()))
    }

    pub fn pending(&self) -> Option<FormAction> {
        self.engine.with_state(|s| s.ui.pending_action)
    }

    pub fn affordances(&self) -> Vec<Affordance> {
        affordances(self.status(), self.pending())
    }

    /// Save the draft with the status `action` requests
    pub async fn perform(
        &self,
        action: FormAction,
        options: SaveOptions<S::Fixed>,
    ) -> Result<Record<S::Fixed>> {
        self.perform_with(action, None, options).await
    }

    /// Like [`perform`](Self::perform), with a file sent along
    pub async fn perform_with(
        &self,
        action: FormAction,
        attachment: Option<Attachment>,
        options: SaveOptions<S::Fixed>,
    ) -> Result<Record<S::Fixed>> {
        let status = self.status();
        if action.offered_from() != status {
            return Err(SyncError::InvalidTransition(format!(
                "{} is not available while {status:?}",
                action.label()
            )));
        }

        let guard = self.engine.acquire()?;
        let mut mutation = self.engine.draft();
        mutation.attachment = attachment;
        mutation
            .record
            .fixed
            .set_submitted(action.requested_status().is_submitted());
        tracing::debug!(?action, from = ?status, "lifecycle save");

        self.engine.dispatch(Action::SetPendingAction(Some(action)));
        let result = self.engine.save_locked(&guard, mutation, options).await;
        self.engine.dispatch(Action::SetPendingAction(None));
        result
    }

    pub async fn submit(&self) -> Result<Record<S::Fixed>> {
        self.perform(FormAction::Submit, SaveOptions::default()).await
    }

    pub async fn unsubmit(&self) -> Result<Record<S::Fixed>> {
        self.perform(FormAction::Unsubmit, SaveOptions::default()).await
    }

    /// Save without changing the status
    pub async fn save_in_place(&self, options: SaveOptions<S::Fixed>) -> Result<Record<S::Fixed>> {
        let action = match self.status() {
            LifecycleStatus::Draft => FormAction::SaveDraft,
            LifecycleStatus::Submitted => FormAction::Update,
        };
        self.perform(action, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::FakeStore;
    use crate::notify::CollectingNotifier;
    use crate::record::RecordState;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Form {
        country: String,
        submitted: bool,
    }

    impl FixedFields for Form {
        type Field = String;

        fn set(&mut self, country: String) {
            self.country = country;
        }
    }

    impl Submittable for Form {
        fn is_submitted(&self) -> bool {
            self.submitted
        }

        fn set_submitted(&mut self, submitted: bool) {
            self.submitted = submitted;
        }
    }

    fn engine(store: FakeStore<Form>) -> SyncEngine<FakeStore<Form>> {
        let fixed = Form {
            country: "GB".into(),
            submitted: false,
        };
        SyncEngine::new(
            store,
            RecordState::new(["1"].into_iter().collect(), fixed),
            Arc::new(CollectingNotifier::new()),
        )
    }

    #[test]
    fn test_affordances_by_status() {
        let draft = affordances(LifecycleStatus::Draft, None);
        assert_eq!(
            draft.iter().map(|a| a.action).collect::<Vec<_>>(),
            vec![FormAction::SaveDraft, FormAction::Submit]
        );
        assert!(draft[1].primary);

        let submitted = affordances(LifecycleStatus::Submitted, Some(FormAction::Update));
        assert!(submitted[0].destructive);
        assert!(!submitted[0].loading);
        assert!(submitted[1].loading);
    }

    #[tokio::test]
    async fn test_submit_then_unsubmit_round_trips() {
        let engine = engine(FakeStore::echoing());
        engine.dispatch(Action::SetDynamicField {
            key: "1".into(),
            value: "answer".into(),
        });
        let before = engine.snapshot().record;

        engine.lifecycle().submit().await.unwrap();
        assert_eq!(engine.lifecycle().status(), LifecycleStatus::Submitted);

        engine.lifecycle().unsubmit().await.unwrap();
        let after = engine.snapshot().record;
        assert_eq!(engine.lifecycle().status(), LifecycleStatus::Draft);
        assert_eq!(after, before);
        assert_eq!(engine.lifecycle().pending(), None);
    }

    #[tokio::test]
    async fn test_failed_submit_keeps_committed_status() {
        let store = FakeStore::new();
        store.push_save(Err(SyncError::Application { message: None }));
        let engine = engine(store);

        assert!(engine.lifecycle().submit().await.is_err());
        assert_eq!(engine.lifecycle().status(), LifecycleStatus::Draft);
        assert_eq!(engine.lifecycle().pending(), None);
        // the request did ask for the new status
        assert!(engine.store().saved()[0].record.fixed.submitted);
    }

    #[tokio::test]
    async fn test_invalid_transitions() {
        let engine = engine(FakeStore::echoing());
        assert!(matches!(
            engine.lifecycle().unsubmit().await,
            Err(SyncError::InvalidTransition(_))
        ));
        engine.lifecycle().submit().await.unwrap();
        assert!(engine.lifecycle().submit().await.is_err());

        // in-place save keeps the status
        engine.lifecycle().save_in_place(SaveOptions::silent()).await.unwrap();
        assert_eq!(engine.lifecycle().status(), LifecycleStatus::Submitted);
        assert!(engine.store().saved().iter().skip(1).all(|m| m.record.fixed.submitted));
    }
}

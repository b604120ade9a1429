//! Record state model
//!
//! One [`RecordState`] per open form. Every change goes through
//! [`RecordState::apply`], a pure transition from one state value to the
//! next; nothing in here performs I/O.

use crate::asset_flow::RemovalPhase;
use crate::assets::AssetList;
use crate::lifecycle::FormAction;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt::Debug;

/// Kind-specific typed scalars of a record
pub trait FixedFields: Clone + Default + PartialEq + Debug + Send + Sync + 'static {
    /// One settable field together with its new value
    type Field: Clone + Debug + Send + Sync + 'static;

    fn set(&mut self, field: Self::Field);
}

/// Records without fixed fields (sponsor details)
impl FixedFields for () {
    type Field = Infallible;

    fn set(&mut self, field: Self::Field) {
        match field {}
    }
}

/// One persisted entity as the client sees it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record<F> {
    /// Server identifier, `None` until the first confirmed save
    pub id: Option<i64>,
    pub fixed: F,
    pub dynamic: BTreeMap<String, String>,
    pub assets: AssetList,
}

impl<F> Record<F> {
    pub fn dynamic_value(&self, key: &str) -> &str {
        self.dynamic.get(key).map(String::as_str).unwrap_or("")
    }
}

/// Client-known set of dynamic field keys
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldCatalog(Vec<String>);

impl FieldCatalog {
    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|k| k == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for FieldCatalog {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut keys: Vec<String> = Vec::new();
        for key in iter {
            let key = key.into();
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        FieldCatalog(keys)
    }
}

/// Visibility and progress flags of the sub-flows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubflowFlags {
    pub upload_form_open: bool,
    pub is_uploading: bool,
    pub removal: RemovalPhase,
    /// Lifecycle action whose save is in flight
    pub pending_action: Option<FormAction>,
}

/// Everything a surface renders from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordState<F> {
    pub record: Record<F>,
    pub catalog: FieldCatalog,
    pub is_loading: bool,
    pub is_saving: bool,
    pub ui: SubflowFlags,
}

/// State transitions accepted by [`RecordState::apply`]
#[derive(Debug, Clone)]
pub enum Action<F: FixedFields> {
    SetDynamicField { key: String, value: String },
    SetFixedField(F::Field),
    ReplaceAssets(AssetList),
    ReplaceFromServer(Record<F>),
    SetLoading(bool),
    SetSaving(bool),
    SetUploading(bool),
    SetUploadFormOpen(bool),
    SetRemoval(RemovalPhase),
    SetPendingAction(Option<FormAction>),
}

impl<F: FixedFields> RecordState<F> {
    /// Fresh state: every catalog key present with an empty value
    pub fn new(catalog: FieldCatalog, fixed: F) -> Self {
        let dynamic = catalog
            .keys()
            .map(|k| (k.to_string(), String::new()))
            .collect();
        Self {
            record: Record {
                id: None,
                fixed,
                dynamic,
                assets: AssetList::new(),
            },
            catalog,
            ..Default::default()
        }
    }

    /// Sets a dynamic value. Keys outside the catalog that the record does
    /// not already carry are ignored.
    pub fn set_dynamic_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        if self.catalog.contains(&key) || self.record.dynamic.contains_key(&key) {
            self.record.dynamic.insert(key, value.into());
        } else {
            tracing::debug!(key = %key, "ignoring unknown dynamic field");
        }
        self
    }

    pub fn set_fixed_field(mut self, field: F::Field) -> Self {
        self.record.fixed.set(field);
        self
    }

    pub fn replace_assets(mut self, assets: AssetList) -> Self {
        self.record.assets = assets;
        self
    }

    /// Replaces the record wholesale with a server-confirmed one
    pub fn replace_from_server(mut self, record: Record<F>) -> Self {
        self.record = record;
        self
    }

    pub fn apply(self, action: Action<F>) -> Self {
        match action {
            Action::SetDynamicField { key, value } => self.set_dynamic_field(key, value),
            Action::SetFixedField(field) => self.set_fixed_field(field),
            Action::ReplaceAssets(assets) => self.replace_assets(assets),
            Action::ReplaceFromServer(record) => self.replace_from_server(record),
            Action::SetLoading(on) => Self { is_loading: on, ..self },
            Action::SetSaving(on) => Self { is_saving: on, ..self },
            Action::SetUploading(on) => {
                let mut next = self;
                next.ui.is_uploading = on;
                next
            }
            Action::SetUploadFormOpen(open) => {
                let mut next = self;
                next.ui.upload_form_open = open;
                next
            }
            Action::SetRemoval(phase) => {
                let mut next = self;
                next.ui.removal = phase;
                next
            }
            Action::SetPendingAction(action) => {
                let mut next = self;
                next.ui.pending_action = action;
                next
            }
        }
    }

    /// A mutating request is outstanding
    pub fn is_busy(&self) -> bool {
        self.is_loading || self.is_saving
    }

    pub fn dynamic_value(&self, key: &str) -> &str {
        self.record.dynamic_value(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::Asset;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Flags {
        country: String,
    }

    impl FixedFields for Flags {
        type Field = String;

        fn set(&mut self, field: String) {
            self.country = field;
        }
    }

    fn state() -> RecordState<Flags> {
        RecordState::new(["1", "2", "3"].into_iter().collect(), Flags::default())
    }

    #[test]
    fn test_set_dynamic_field_reads_back() {
        let before = state().set_dynamic_field("2", "rust");
        let after = before.clone().set_dynamic_field("1", "hello");

        assert_eq!(after.dynamic_value("1"), "hello");
        assert_eq!(after.dynamic_value("2"), "rust");
        assert_eq!(after.dynamic_value("3"), "");
        assert_eq!(after.record.dynamic.len(), before.record.dynamic.len());
    }

    #[test]
    fn test_unknown_key_is_ignored() {
        let s = state().set_dynamic_field("99", "nope");
        assert!(!s.record.dynamic.contains_key("99"));
        assert_eq!(s.record.dynamic.len(), 3);
    }

    #[test]
    fn test_server_keys_outside_catalog_stay_editable() {
        let mut server = Record::<Flags>::default();
        server.dynamic.insert("logo_alt".into(), "".into());
        let s = state()
            .replace_from_server(server)
            .set_dynamic_field("logo_alt", "Acme");
        assert_eq!(s.dynamic_value("logo_alt"), "Acme");
        // catalog keys stay writable after a replace that dropped them
        let s = s.set_dynamic_field("1", "x");
        assert_eq!(s.dynamic_value("1"), "x");
    }

    #[test]
    fn test_replace_from_server_is_wholesale() {
        let local = state()
            .set_dynamic_field("1", "local")
            .replace_assets(vec![Asset::new("a", "a")].into());

        let mut server = Record {
            id: Some(7),
            fixed: Flags {
                country: "FR".into(),
            },
            ..Default::default()
        };
        server.dynamic.insert("2".into(), "remote".into());

        let s = local.replace_from_server(server.clone());
        assert_eq!(s.record, server);
        assert!(s.record.assets.is_empty());
        assert_eq!(s.dynamic_value("1"), "");
    }

    #[test]
    fn test_apply_flags() {
        let s = state()
            .apply(Action::SetSaving(true))
            .apply(Action::SetFixedField("GB".into()))
            .apply(Action::SetUploadFormOpen(true));
        assert!(s.is_saving);
        assert!(s.is_busy());
        assert!(s.ui.upload_form_open);
        assert_eq!(s.record.fixed.country, "GB");

        let s = s.apply(Action::SetSaving(false));
        assert!(!s.is_busy());
    }
}

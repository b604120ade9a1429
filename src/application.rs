//! Applicant form
//!
//! Fixed fields (country, visa, submission flag), free-text answers keyed
//! by question id, and a CV held as the record's only asset.

use crate::asset_flow::{FileSelector, RemovalPhase};
use crate::assets::{Asset, AssetList};
use crate::client::PortalClient;
use crate::config::{ApplicationSettings, QuestionDef};
use crate::engine::{LoadOutcome, Messages, Mutation, RecordStore, SaveOptions, SyncEngine};
use crate::error::{Result, SyncError};
use crate::lifecycle::{Affordance, FormAction, LifecycleStatus, Submittable};
use crate::notify::{Level, Notifier};
use crate::record::{Action, FieldCatalog, FixedFields, Record, RecordState};
use crate::staged::VisaDateEditor;
use crate::types::{ApplicationRecordDto, ApplicationUpdate, Envelope};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplicationFields {
    pub country: String,
    pub visa_required: bool,
    pub visa_date: Option<NaiveDate>,
    pub submitted: bool,
}

/// Editable fixed fields. The submission flag is only changed through
/// the lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplicationField {
    Country(String),
    VisaRequired(bool),
    VisaDate(Option<NaiveDate>),
}

impl FixedFields for ApplicationFields {
    type Field = ApplicationField;

    fn set(&mut self, field: ApplicationField) {
        match field {
            ApplicationField::Country(code) => self.country = code,
            ApplicationField::VisaRequired(required) => self.visa_required = required,
            ApplicationField::VisaDate(date) => self.visa_date = date,
        }
    }
}

impl Submittable for ApplicationFields {
    fn is_submitted(&self) -> bool {
        self.submitted
    }

    fn set_submitted(&mut self, submitted: bool) {
        self.submitted = submitted;
    }
}

pub type ApplicationRecord = Record<ApplicationFields>;

fn cv_uploaded(_: usize) -> String {
    "CV uploaded.".to_string()
}

fn cv_remove_failed(_: Option<&str>) -> String {
    "Failed to remove CV.".to_string()
}

pub const APPLICATION_MESSAGES: Messages = Messages {
    saved: "Application saved.",
    failed: "An error occurred.",
    uploaded: cv_uploaded,
    upload_failed: "An error occurred while uploading the file.",
    removed: "CV removed",
    removed_level: Level::Info,
    remove_failed: cv_remove_failed,
};

/// Lenient visa date: ISO date, RFC 3339 timestamp, or the browser's
/// `Date.toString()` form (`Sun Dec 01 2019 00:00:00 GMT+0000 (...)`).
/// Anything else is unset.
fn parse_visa_date(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.date_naive());
    }
    if let Some(prefix) = raw.get(..10) {
        if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return Some(date);
        }
    }
    if let Some(prefix) = raw.get(..15) {
        if let Ok(date) = NaiveDate::parse_from_str(prefix, "%a %b %d %Y") {
            return Some(date);
        }
    }
    tracing::warn!(value = raw, "unparseable visa date, treating as unset");
    None
}

impl ApplicationRecordDto {
    /// Typed record; an undecodable answer map is a protocol failure
    pub fn decode(self, default_country: &str) -> Result<ApplicationRecord> {
        let dynamic: BTreeMap<String, String> = match self.question_responses.as_deref() {
            None | Some("") => BTreeMap::new(),
            Some(raw) => serde_json::from_str(raw).map_err(|e| {
                SyncError::protocol(None, format!("undecodable questionResponses: {e}"))
            })?,
        };

        let mut assets = AssetList::new();
        if let Some(url) = self.cv_url.filter(|u| !u.is_empty()) {
            let name = self
                .cv_filename
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "CV".to_string());
            assets.push(Asset::new(name, url));
        }

        Ok(Record {
            id: self.id,
            fixed: ApplicationFields {
                country: self
                    .country
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| default_country.to_string()),
                visa_required: self.visa_required.map(bool::from).unwrap_or(false),
                visa_date: parse_visa_date(self.visa_required_date.as_deref()),
                submitted: self.is_submitted.map(bool::from).unwrap_or(false),
            },
            dynamic,
            assets,
        })
    }
}

/// Remote store of the signed-in user's application
pub struct ApplicationStore {
    client: PortalClient,
    question_ids: Vec<String>,
    default_country: String,
}

impl ApplicationStore {
    pub fn new(client: PortalClient, settings: &ApplicationSettings) -> Self {
        Self {
            client,
            question_ids: settings.questions.iter().map(|q| q.id.clone()).collect(),
            default_country: settings.default_country.clone(),
        }
    }

    /// Outgoing form: every question id, nothing else
    pub fn encode(&self, record: &ApplicationRecord) -> Result<ApplicationUpdate> {
        let answers: BTreeMap<String, String> = self
            .question_ids
            .iter()
            .map(|id| (id.clone(), record.dynamic_value(id).to_string()))
            .collect();
        let fixed = &record.fixed;
        ApplicationUpdate::new(
            &answers,
            &fixed.country,
            fixed.visa_required,
            fixed.visa_date,
            fixed.submitted,
        )
    }
}

#[async_trait]
impl RecordStore for ApplicationStore {
    type Fixed = ApplicationFields;

    fn messages(&self) -> &Messages {
        &APPLICATION_MESSAGES
    }

    async fn load(&self) -> Result<Option<ApplicationRecord>> {
        let response = self.client.fetch_application().await?.into_success()?;
        response
            .record
            .map(|dto| dto.decode(&self.default_country))
            .transpose()
    }

    async fn save(&self, mutation: &Mutation<ApplicationFields>) -> Result<ApplicationRecord> {
        let update = self.encode(&mutation.record)?;
        let response = self
            .client
            .update_application(&update, mutation.attachment.as_ref())
            .await?
            .into_success()?;
        response
            .payload
            .ok_or_else(|| SyncError::protocol(None, "update response has no payload"))?
            .decode(&self.default_country)
    }

    async fn remove_asset(&self, _asset: &Asset) -> Result<()> {
        self.client.remove_cv().await?.into_success()?;
        Ok(())
    }
}

/// Applicant form surface
pub struct ApplicationForm {
    engine: SyncEngine<ApplicationStore>,
    questions: Vec<QuestionDef>,
    cv_mime_type: String,
    /// Application period still open
    window_open: bool,
    visa_editor: VisaDateEditor,
}

impl ApplicationForm {
    pub fn new(
        client: PortalClient,
        settings: &ApplicationSettings,
        window_open: bool,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::with_today(
            client,
            settings,
            window_open,
            notifier,
            chrono::Local::now().date_naive(),
        )
    }

    /// Same as [`new`](Self::new) with an explicit current date
    pub fn with_today(
        client: PortalClient,
        settings: &ApplicationSettings,
        window_open: bool,
        notifier: Arc<dyn Notifier>,
        today: NaiveDate,
    ) -> Self {
        let catalog: FieldCatalog = settings.questions.iter().map(|q| q.id.clone()).collect();
        let fixed = ApplicationFields {
            country: settings.default_country.clone(),
            ..Default::default()
        };
        let store = ApplicationStore::new(client, settings);
        Self {
            engine: SyncEngine::new(store, RecordState::new(catalog, fixed), notifier),
            questions: settings.questions.clone(),
            cv_mime_type: settings.cv_mime_type.clone(),
            window_open,
            visa_editor: VisaDateEditor::new(None, today, settings.event_date),
        }
    }

    pub fn engine(&self) -> &SyncEngine<ApplicationStore> {
        &self.engine
    }

    pub fn state(&self) -> RecordState<ApplicationFields> {
        self.engine.snapshot()
    }

    pub fn questions(&self) -> &[QuestionDef] {
        &self.questions
    }

    pub fn is_window_open(&self) -> bool {
        self.window_open
    }

    fn ensure_open(&self) -> Result<()> {
        if self.window_open {
            Ok(())
        } else {
            Err(SyncError::EditingClosed)
        }
    }

    pub async fn load(&self) -> LoadOutcome {
        self.engine.load().await
    }

    pub fn status(&self) -> LifecycleStatus {
        self.engine.lifecycle().status()
    }

    /// Buttons to offer; none once the window has closed
    pub fn actions(&self) -> Vec<Affordance> {
        if !self.window_open {
            return Vec::new();
        }
        self.engine.lifecycle().affordances()
    }

    pub fn answer(&self, question_id: &str) -> String {
        self.engine.with_state(|s| s.dynamic_value(question_id).to_string())
    }

    /// Set an answer, cut to the question's length limit
    pub fn set_answer(&self, question_id: &str, text: &str) -> Result<()> {
        self.ensure_open()?;
        let limit = self
            .questions
            .iter()
            .find(|q| q.id == question_id)
            .map(|q| q.max_length)
            .unwrap_or(usize::MAX);
        let value: String = text.chars().take(limit).collect();
        self.engine.dispatch(Action::SetDynamicField {
            key: question_id.to_string(),
            value,
        });
        Ok(())
    }

    pub fn set_country(&self, code: &str) -> Result<()> {
        self.ensure_open()?;
        self.engine
            .dispatch(Action::SetFixedField(ApplicationField::Country(code.to_string())));
        Ok(())
    }

    pub fn set_visa_required(&self, required: bool) -> Result<()> {
        self.ensure_open()?;
        self.engine
            .dispatch(Action::SetFixedField(ApplicationField::VisaRequired(required)));
        Ok(())
    }

    // ==================== Visa date ====================

    pub fn visa_editor(&self) -> &VisaDateEditor {
        &self.visa_editor
    }

    pub fn open_visa_editor(&mut self) -> Result<()> {
        self.ensure_open()?;
        let committed = self.engine.with_state(|s| s.record.fixed.visa_date);
        self.visa_editor.open(committed);
        Ok(())
    }

    pub fn select_visa_date(&mut self, date: NaiveDate) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.visa_editor.select(date))
    }

    /// Commit the picked date to the draft; saved with the next save.
    /// `Ok(None)` when nothing was committed or the date was cleared.
    pub fn confirm_visa_date(&mut self) -> Result<Option<NaiveDate>> {
        self.ensure_open()?;
        let Some(value) = self.visa_editor.confirm() else {
            return Ok(None);
        };
        self.engine
            .dispatch(Action::SetFixedField(ApplicationField::VisaDate(value)));
        Ok(value)
    }

    pub fn cancel_visa_editor(&mut self) {
        self.visa_editor.cancel();
    }

    // ==================== Saving ====================

    pub async fn perform(&self, action: FormAction) -> Result<ApplicationRecord> {
        self.ensure_open()?;
        self.engine
            .lifecycle()
            .perform(action, SaveOptions::default())
            .await
    }

    pub async fn submit(&self) -> Result<ApplicationRecord> {
        self.perform(FormAction::Submit).await
    }

    pub async fn unsubmit(&self) -> Result<ApplicationRecord> {
        self.perform(FormAction::Unsubmit).await
    }

    /// "Save Draft" or "Update", depending on the status
    pub async fn save(&self) -> Result<ApplicationRecord> {
        self.ensure_open()?;
        self.engine
            .lifecycle()
            .save_in_place(SaveOptions::default())
            .await
    }

    // ==================== CV ====================

    pub fn cv(&self) -> Option<Asset> {
        self.engine
            .with_state(|s| s.record.assets.iter().next().cloned())
    }

    /// Pick a CV and save it with the current status
    pub async fn upload_cv(&self, selector: &dyn FileSelector) -> Result<Option<ApplicationRecord>> {
        self.ensure_open()?;
        self.engine
            .assets()
            .add_from(selector, &self.cv_mime_type)
            .await
    }

    pub fn request_cv_removal(&self) -> Result<()> {
        self.ensure_open()?;
        let cv = self
            .cv()
            .ok_or_else(|| SyncError::InvalidTransition("no CV attached".into()))?;
        self.engine.assets().request_removal(&cv)
    }

    pub fn cancel_cv_removal(&self) -> Result<()> {
        self.engine.assets().cancel_removal()
    }

    pub async fn confirm_cv_removal(&self) -> Result<ApplicationRecord> {
        self.ensure_open()?;
        self.engine.assets().confirm_removal().await
    }

    pub fn removal_phase(&self) -> RemovalPhase {
        self.engine.assets().phase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Flag;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_visa_date_formats() {
        assert_eq!(parse_visa_date(Some("2019-12-01")), Some(date(2019, 12, 1)));
        assert_eq!(
            parse_visa_date(Some("2019-12-01T00:00:00+00:00")),
            Some(date(2019, 12, 1))
        );
        assert_eq!(
            parse_visa_date(Some("2019-12-01 00:00:00")),
            Some(date(2019, 12, 1))
        );
        assert_eq!(
            parse_visa_date(Some(
                "Sun Dec 01 2019 00:00:00 GMT+0000 (Coordinated Universal Time)"
            )),
            Some(date(2019, 12, 1))
        );
        assert_eq!(parse_visa_date(Some("Sun Dec 01 2019")), Some(date(2019, 12, 1)));
        assert_eq!(parse_visa_date(Some("Tue Jan 14 2020 12:30:00 GMT-0500")), Some(date(2020, 1, 14)));
        assert_eq!(parse_visa_date(Some("")), None);
        assert_eq!(parse_visa_date(Some("next tuesday")), None);
        assert_eq!(parse_visa_date(None), None);
    }

    #[test]
    fn test_decode_record() {
        let dto = ApplicationRecordDto {
            id: Some(12),
            question_responses: Some(r#"{"1":"learn","2":"rust"}"#.into()),
            country: Some("FR".into()),
            visa_required: Some(Flag(true)),
            visa_required_date: Some("2019-11-30".into()),
            is_submitted: Some(Flag(true)),
            cv_url: Some("https://cdn.test/cv.pdf".into()),
            cv_filename: Some("cv.pdf".into()),
        };
        let record = dto.decode("GB").unwrap();

        assert_eq!(record.id, Some(12));
        assert_eq!(record.dynamic_value("2"), "rust");
        assert_eq!(record.fixed.country, "FR");
        assert!(record.fixed.visa_required);
        assert_eq!(record.fixed.visa_date, Some(date(2019, 11, 30)));
        assert!(record.fixed.submitted);
        assert_eq!(record.assets.as_slice(), &[Asset::new("cv.pdf", "https://cdn.test/cv.pdf")]);
    }

    #[test]
    fn test_decode_defaults_and_errors() {
        let record = ApplicationRecordDto {
            cv_url: Some(String::new()),
            ..Default::default()
        }
        .decode("GB")
        .unwrap();
        assert_eq!(record.fixed.country, "GB");
        assert!(record.dynamic.is_empty());
        assert!(record.assets.is_empty());

        let err = ApplicationRecordDto {
            question_responses: Some("{not json".into()),
            ..Default::default()
        }
        .decode("GB")
        .unwrap_err();
        assert!(matches!(err, SyncError::Protocol { .. }));
    }

    #[test]
    fn test_encode_sends_every_question_only() {
        let settings = ApplicationSettings::default();
        let client = PortalClient::new(Default::default()).unwrap();
        let store = ApplicationStore::new(client, &settings);

        let mut record = ApplicationRecord::default();
        record.fixed.country = "GB".into();
        record.dynamic.insert("2".into(), "rust".into());
        record.dynamic.insert("stray".into(), "x".into());

        let update = store.encode(&record).unwrap();
        assert_eq!(
            update.question_responses,
            r#"{"1":"","2":"rust","3":"","4":""}"#
        );
        assert_eq!(update.is_submitted, "false");
        assert_eq!(update.visa_required_date, "");
    }

    #[test]
    fn test_closed_window_refuses_edits() {
        let client = PortalClient::new(Default::default()).unwrap();
        let form = ApplicationForm::new(
            client,
            &ApplicationSettings::default(),
            false,
            Arc::new(crate::notify::CollectingNotifier::new()),
        );
        assert!(matches!(form.set_answer("1", "x"), Err(SyncError::EditingClosed)));
        assert!(form.actions().is_empty());
        assert_eq!(form.answer("1"), "");
    }

    #[test]
    fn test_answers_are_cut_to_limit() {
        let client = PortalClient::new(Default::default()).unwrap();
        let form = ApplicationForm::new(
            client,
            &ApplicationSettings::default(),
            true,
            Arc::new(crate::notify::CollectingNotifier::new()),
        );
        form.set_answer("1", &"é".repeat(250)).unwrap();
        assert_eq!(form.answer("1").chars().count(), 200);
        assert_eq!(form.state().record.fixed.country, "GB");
        assert_eq!(form.actions()[1].action, FormAction::Submit);
    }

    #[test]
    fn test_visa_editor_commits_into_draft() {
        let client = PortalClient::new(Default::default()).unwrap();
        let mut form = ApplicationForm::with_today(
            client,
            &ApplicationSettings::default(),
            true,
            Arc::new(crate::notify::CollectingNotifier::new()),
            date(2019, 10, 1),
        );

        form.open_visa_editor().unwrap();
        assert!(form.select_visa_date(date(2019, 12, 2)).unwrap());
        form.cancel_visa_editor();
        assert_eq!(form.state().record.fixed.visa_date, None);

        form.open_visa_editor().unwrap();
        assert!(form.select_visa_date(date(2019, 12, 3)).unwrap());
        assert_eq!(form.confirm_visa_date().unwrap(), Some(date(2019, 12, 3)));
        assert_eq!(form.state().record.fixed.visa_date, Some(date(2019, 12, 3)));
    }

    #[test]
    fn test_closed_window_refuses_visa_date() {
        let client = PortalClient::new(Default::default()).unwrap();
        let mut form = ApplicationForm::with_today(
            client,
            &ApplicationSettings::default(),
            false,
            Arc::new(crate::notify::CollectingNotifier::new()),
            date(2019, 10, 1),
        );

        assert!(matches!(form.open_visa_editor(), Err(SyncError::EditingClosed)));
        assert!(matches!(
            form.select_visa_date(date(2019, 12, 3)),
            Err(SyncError::EditingClosed)
        ));
        assert!(matches!(form.confirm_visa_date(), Err(SyncError::EditingClosed)));
        assert!(!form.visa_editor().is_open());
        assert_eq!(form.state().record.fixed.visa_date, None);
    }

    #[test]
    fn test_browser_visa_date_survives_resave() {
        let dto = ApplicationRecordDto {
            visa_required: Some(Flag(true)),
            visa_required_date: Some(
                "Sun Dec 01 2019 00:00:00 GMT+0000 (Coordinated Universal Time)".into(),
            ),
            ..Default::default()
        };
        let record = dto.decode("GB").unwrap();

        let client = PortalClient::new(Default::default()).unwrap();
        let store = ApplicationStore::new(client, &ApplicationSettings::default());
        let update = store.encode(&record).unwrap();
        assert_eq!(update.visa_required, "true");
        assert_eq!(update.visa_required_date, "2019-12-01");
    }
}

//! Client-side state sync for the event dashboard forms
//!
//! Each editable record (an applicant's application, a sponsor's detail
//! page) is held as an immutable [`RecordState`] that only the
//! [`SyncEngine`] replaces. Local edits build a draft; a save sends the
//! draft and, once the server confirms, swaps the whole record for the
//! server's copy. One mutating request per record at a time.
//!
//! # Example
//!
//! ```rust,no_run
//! use portal_sync::{ApplicationForm, ClientConfig, PortalClient, TracingNotifier};
//! use std::sync::Arc;
//!
//! # async fn example() -> portal_sync::Result<()> {
//! let config = ClientConfig {
//!     base_url: "http://localhost:8000".into(),
//!     ..Default::default()
//! };
//! let settings = config.application.clone();
//! let client = PortalClient::new(config)?;
//!
//! let form = ApplicationForm::new(client, &settings, true, Arc::new(TracingNotifier));
//! form.load().await;
//! form.set_answer("1", "Meet people building with Rust")?;
//! form.submit().await?;
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod asset_flow;
pub mod assets;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod lock;
pub mod notify;
pub mod record;
pub mod sponsor;
pub mod staged;
pub mod types;

// Re-export main types
pub use application::{ApplicationField, ApplicationFields, ApplicationForm, ApplicationStore};
pub use asset_flow::{AssetManager, FileSelector, LocalFileSelector, RemovalPhase};
pub use assets::{Asset, AssetList};
pub use client::PortalClient;
pub use config::ClientConfig;
pub use engine::{LoadOutcome, Messages, Mutation, RecordStore, SaveOptions, SyncEngine};
pub use error::{Result, SyncError};
pub use lifecycle::{Affordance, FormAction, LifecycleController, LifecycleStatus, Submittable};
pub use notify::{CollectingNotifier, Notifier, TracingNotifier};
pub use record::{Action, FieldCatalog, FixedFields, Record, RecordState};
pub use sponsor::{SponsorPortal, SponsorRef, SponsorResourceStore};
pub use staged::{Staged, VisaDateEditor};

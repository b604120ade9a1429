//! portal-sync: command-line front end for the dashboard forms
//!
//! Every command loads the record, applies the change, saves when the
//! change needs it, and prints the resulting record as JSON.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use portal_sync::{
    ApplicationForm, Asset, ClientConfig, LoadOutcome, LocalFileSelector, PortalClient,
    SponsorPortal, SponsorRef, TracingNotifier,
};

#[derive(Parser)]
#[command(name = "portal-sync")]
#[command(about = "Edit dashboard application and sponsor records")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "PORTAL_SYNC_CONFIG", default_value = "portal-sync.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Applicant's own application
    Application {
        /// Treat the application period as closed
        #[arg(long)]
        closed: bool,

        #[command(subcommand)]
        action: ApplicationCommands,
    },

    /// A sponsor's detail page
    Sponsor {
        #[arg(long)]
        sponsor_id: i64,

        #[arg(long)]
        slug: String,

        #[arg(long, default_value = "resources")]
        detail_type: String,

        #[command(subcommand)]
        action: SponsorCommands,
    },
}

#[derive(Debug, Subcommand)]
enum ApplicationCommands {
    /// Print the stored application
    Show,
    /// Save without changing the status
    Save,
    Submit,
    Unsubmit,
    /// Attach a CV file
    UploadCv { file: PathBuf },
    /// Remove the attached CV
    RemoveCv {
        /// Confirm the removal
        #[arg(long)]
        yes: bool,
    },
    /// Answer one question and save
    Answer { id: String, text: String },
}

#[derive(Debug, Subcommand)]
enum SponsorCommands {
    Show,
    /// Set a field and save
    SetField { key: String, value: String },
    /// Record a file already uploaded to storage
    AddAsset { name: String, url: String },
    RemoveAsset {
        url: String,
        /// Confirm the removal
        #[arg(long)]
        yes: bool,
    },
}

impl ApplicationCommands {
    fn mutates(&self) -> bool {
        !matches!(self, ApplicationCommands::Show)
    }
}

impl SponsorCommands {
    fn mutates(&self) -> bool {
        !matches!(self, SponsorCommands::Show)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("portal_sync=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Application { closed, action } => run_application(config, !closed, action).await,
        Commands::Sponsor {
            sponsor_id,
            slug,
            detail_type,
            action,
        } => {
            let sponsor = SponsorRef::new(sponsor_id, slug);
            run_sponsor(config, sponsor, detail_type, action).await
        }
    }
}

fn load_config(path: &Path) -> anyhow::Result<ClientConfig> {
    if path.exists() {
        info!("Config file: {}", path.display());
        ClientConfig::load(path).with_context(|| format!("loading {}", path.display()))
    } else {
        info!("Config file not found, using defaults");
        Ok(ClientConfig::default())
    }
}

/// A failed load leaves the stored record unknown; saving defaults over it
/// would overwrite it (or create a second sponsor detail).
fn ensure_loaded(outcome: LoadOutcome, mutates: bool, what: &str) -> anyhow::Result<()> {
    match outcome {
        LoadOutcome::Restored => Ok(()),
        LoadOutcome::Failed | LoadOutcome::Skipped if mutates => {
            bail!("could not load the stored {what}, not saving over it")
        }
        _ => {
            warn!("No stored {what} loaded, showing defaults");
            Ok(())
        }
    }
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_application(
    config: ClientConfig,
    window_open: bool,
    action: ApplicationCommands,
) -> anyhow::Result<()> {
    let settings = config.application.clone();
    let client = PortalClient::new(config)?;
    let form = ApplicationForm::new(client, &settings, window_open, Arc::new(TracingNotifier));

    ensure_loaded(form.load().await, action.mutates(), "application")?;

    match action {
        ApplicationCommands::Show => {}
        ApplicationCommands::Save => {
            form.save().await?;
        }
        ApplicationCommands::Submit => {
            form.submit().await?;
        }
        ApplicationCommands::Unsubmit => {
            form.unsubmit().await?;
        }
        ApplicationCommands::UploadCv { file } => {
            let selector = LocalFileSelector::new(file);
            form.upload_cv(&selector).await?;
        }
        ApplicationCommands::RemoveCv { yes } => {
            form.request_cv_removal()?;
            if !yes {
                form.cancel_cv_removal()?;
                bail!("pass --yes to remove the CV");
            }
            form.confirm_cv_removal().await?;
        }
        ApplicationCommands::Answer { id, text } => {
            form.set_answer(&id, &text)?;
            form.save().await?;
        }
    }

    print_json(&form.state().record)
}

async fn run_sponsor(
    config: ClientConfig,
    sponsor: SponsorRef,
    detail_type: String,
    action: SponsorCommands,
) -> anyhow::Result<()> {
    let settings = config.sponsor.clone();
    let client = PortalClient::new(config)?;
    let portal = SponsorPortal::new(
        client,
        &settings,
        sponsor,
        detail_type,
        Arc::new(TracingNotifier),
    );

    ensure_loaded(portal.load().await, action.mutates(), "sponsor detail")?;

    match action {
        SponsorCommands::Show => {}
        SponsorCommands::SetField { key, value } => {
            portal.set_field(&key, &value);
            portal.save(false).await?;
        }
        SponsorCommands::AddAsset { name, url } => {
            portal.add_uploaded(vec![Asset::new(name, url)]).await?;
        }
        SponsorCommands::RemoveAsset { url, yes } => {
            let asset = portal
                .assets()
                .into_iter()
                .find(|a| a.url == url)
                .with_context(|| format!("no asset with url {url}"))?;
            portal.request_removal(&asset)?;
            if !yes {
                portal.cancel_removal()?;
                bail!("pass --yes to remove {url}");
            }
            portal.confirm_removal().await?;
        }
    }

    print_json(&portal.state().record)
}

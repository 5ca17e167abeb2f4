mod api;
mod cli;
mod config;
mod session;
mod storage;

use crate::cli::ConfigCommand;
use clap::Parser;
use color_eyre::Result;
use earnit_api::ApiClient;
use earnit_core::storage::{Placement, SecureValueStore};
use earnit_session::SessionManager;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Entry point wiring the CLI to the session store and API client.
#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = cli::Cli::parse();
    let config = config::load()?;
    let store = storage::store_from_config(&config)?;
    let sessions = SessionManager::new(store.clone());
    let base_url = api::base_url(config.api_base_url.as_deref());

    match cli.command.unwrap_or(cli::Command::Whoami) {
        cli::Command::Login { token, role } => session::login(&sessions, &token, role).await?,
        cli::Command::Role { role } => session::set_role(&sessions, role).await?,
        cli::Command::Set { key, value } => session::set_value(&sessions, &key, &value).await?,
        cli::Command::Whoami => session::whoami(&sessions, &base_url).await?,
        cli::Command::Logout => session::logout(&sessions).await?,
        cli::Command::Get { path, no_auth } => {
            let api = ApiClient::new(base_url, sessions);
            api::get(&api, &path, no_auth).await?
        }
        cli::Command::Post {
            path,
            body,
            no_auth,
        } => {
            let api = ApiClient::new(base_url, sessions);
            api::post(&api, &path, &body, no_auth).await?
        }
        cli::Command::Health => run_health_check(&store).await?,
        cli::Command::Version => print_version(),
        cli::Command::Config(ConfigCommand::Init) => init_config(&config)?,
    }

    Ok(())
}

fn init_tracing() {
    // Respect user-provided filters, default to info to avoid noisy stdout.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn print_version() {
    println!("earnit {}", env!("CARGO_PKG_VERSION"));
}

/// Report the active backend and round-trip a probe value through the store.
async fn run_health_check(store: &SecureValueStore) -> Result<()> {
    let placement = run_store_health(store).await?;
    let backend = match placement {
        Placement::Primary => store.primary_name(),
        Placement::Fallback => store.fallback_name(),
    };
    println!("Storage: ok ({backend})");
    Ok(())
}

async fn run_store_health(store: &SecureValueStore) -> Result<Placement> {
    let probe_key = "health/probe";
    let payload = "ok";
    let placement = store
        .write(probe_key, payload)
        .await
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
    let round_trip = store.read(probe_key).await;
    store.delete(probe_key).await;

    if round_trip.as_deref() != Some(payload) {
        color_eyre::eyre::bail!("storage round-trip failed");
    }
    Ok(placement)
}

fn init_config(config: &config::Config) -> Result<()> {
    let path = config::write_default_if_missing(config)?;
    println!("Config initialized at {}", path.display());
    Ok(())
}

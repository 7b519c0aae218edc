mod chat_client;
mod classifier;
mod commands;
mod config;
mod database;
mod fanout;
mod jira_client;
mod markup;
mod mentions;
mod models;
mod renderer;
mod routes;
mod subscriptions;
#[cfg(test)]
mod test_support;

use chat_client::{ChatClient, ChatPlatform};
use config::Config;
use database::{Database, RecordStore};
use jira_client::{IssueTracker, JiraClient};
use std::sync::Arc;
use subscriptions::ProjectSubscriptionStore;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
struct AppState {
    store: Arc<ProjectSubscriptionStore>,
    /// `None` until a Jira installation has been configured.
    tracker: Option<Arc<dyn IssueTracker>>,
    chat: Arc<dyn ChatPlatform>,
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    init_tracing();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "bridge stopped");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    let database = Arc::new(Database::new(&config.database_path).await?);

    if let Some(installation) = &config.installation {
        subscriptions::save_installation(database.as_ref(), installation).await?;
    }
    let jira = match subscriptions::load_installation(database.as_ref()).await? {
        Some(installation) => {
            tracing::info!(base_url = %installation.base_url, "using Jira installation");
            Some(Arc::new(JiraClient::new(&installation)?))
        }
        None => {
            tracing::warn!("no Jira installation configured, commands and mentions are disabled");
            None
        }
    };

    if let Some(jira) = &jira {
        ensure_webhook(database.as_ref(), jira, config.public_webhook_url.as_deref()).await;
    }

    let records: Arc<dyn RecordStore> = database;
    let state = AppState {
        store: Arc::new(ProjectSubscriptionStore::new(records)),
        tracker: jira.map(|jira| jira as Arc<dyn IssueTracker>),
        chat: Arc::new(ChatClient::new(&config.chat)?),
    };

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, routes::router(state)).await?;
    Ok(())
}

/// Registers the webhook once; later starts reuse the stored registration.
async fn ensure_webhook(records: &dyn RecordStore, jira: &JiraClient, public_url: Option<&str>) {
    match subscriptions::load_webhook_registration(records).await {
        Ok(Some(registration)) => {
            tracing::info!(webhook = %registration.self_url, "webhook already registered");
            return;
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(error = %e, "could not read webhook registration");
            return;
        }
    }

    let Some(url) = public_url else {
        tracing::warn!("PUBLIC_WEBHOOK_URL is not set, Jira will not send events until a webhook is added");
        return;
    };
    match jira.register_webhook(url).await {
        Ok(registration) => {
            tracing::info!(webhook = %registration.self_url, "registered Jira webhook");
            if let Err(e) = subscriptions::save_webhook_registration(records, &registration).await {
                tracing::warn!(error = %e, "could not store webhook registration");
            }
        }
        Err(e) => tracing::error!(error = %e, "webhook registration failed"),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

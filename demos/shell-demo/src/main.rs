//! Bootstrapper-style demo: build a shell, drive a tabbed main-content
//! scenario, open a window, and run one modal dialog round trip.
//!
//! Run with `RUST_LOG=podium=trace,shell_demo=debug` to watch the
//! lifecycle transitions.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use podium::{
    DialogResult, Lifecycle, OneActive, Screen, ScreenError, ScreenExt, ShellViewModel,
    WindowManager,
};

struct Document {
    lifecycle: Lifecycle,
}

impl Document {
    fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            lifecycle: Lifecycle::named(name),
        })
    }
}

#[async_trait]
impl Screen for Document {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    async fn on_initialize(&self, _token: &CancellationToken) -> Result<(), ScreenError> {
        info!(doc = %self.display_name(), "loading document");
        Ok(())
    }

    async fn on_deactivate(&self, close: bool, _token: &CancellationToken) -> Result<(), ScreenError> {
        info!(doc = %self.display_name(), close, "document put away");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "podium=debug,shell_demo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let shell = ShellViewModel::new();
    let token = CancellationToken::new();
    shell.activate(&token).await.map_err(|e| anyhow::anyhow!(e))?;
    info!("shell up");

    // Tabbed main content.
    let tabs = OneActive::<dyn Screen>::new();
    shell
        .show_main_content(tabs.clone(), &token)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    for name in ["readme", "design-notes", "changelog"] {
        tabs.activate_item(Some(Document::new(name) as Arc<dyn Screen>), &token)
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
    }
    if let Some(active) = tabs.active_item() {
        info!(tab = %active.display_name(), "active tab");
    }

    // An auxiliary window lives alongside the main content.
    shell
        .show_window(Document::new("search-results"), &token)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    // Modal round trip: a second task plays the user confirming the dialog.
    let prompt = Document::new("confirm-exit");
    {
        let prompt = prompt.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            if let Err(error) = prompt.try_close(Some(DialogResult::Confirmed)).await {
                tracing::warn!(%error, "dialog close failed");
            }
        });
    }
    let result = shell
        .show_dialog(prompt, &token)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    info!(?result, "dialog settled");

    // Negotiated shutdown.
    if shell
        .can_close(&token)
        .await
        .map_err(|e| anyhow::anyhow!(e))?
    {
        shell
            .deactivate(true, &token)
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        info!("shell closed");
    }
    Ok(())
}

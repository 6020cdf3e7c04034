//! Shell - top-level composition root and window-manager façade.
//!
//! [`ShellViewModel`] wires the standard application shape out of the
//! conductor family: an always-active root conducting the main-content
//! region, the dialog host, and the open-windows set. [`WindowManager`] is
//! the trait surface application code programs against to surface screens
//! without knowing which conductor ends up hosting them.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::conductor::{AllActive, Conductor};
use crate::dialog::DialogConductor;
use crate::error::ScreenError;
use crate::guard::AsyncGuard;
use crate::lifecycle::Lifecycle;
use crate::screen::{DialogResult, Screen, ScreenExt};

/// The surfacing contract: how application code puts screens on screen.
#[async_trait]
pub trait WindowManager: Send + Sync {
    /// Show a modal dialog and wait for its result.
    async fn show_dialog(
        &self,
        dialog: Arc<dyn Screen>,
        token: &CancellationToken,
    ) -> Result<Option<DialogResult>, ScreenError>;

    /// Make a screen the shell's main content, displacing the current one.
    async fn show_main_content(
        &self,
        screen: Arc<dyn Screen>,
        token: &CancellationToken,
    ) -> Result<(), ScreenError>;

    /// Open a screen as an independent window.
    async fn show_window(
        &self,
        window: Arc<dyn Screen>,
        token: &CancellationToken,
    ) -> Result<(), ScreenError>;

    /// Open a screen as a popup. Popups live alongside windows; they share
    /// the windows conductor and its lifecycle semantics.
    async fn show_popup(
        &self,
        popup: Arc<dyn Screen>,
        token: &CancellationToken,
    ) -> Result<(), ScreenError>;
}

/// The standard shell: one main-content slot, one dialog host, any number
/// of simultaneously-active windows.
pub struct ShellViewModel {
    lifecycle: Lifecycle,
    root: Arc<AllActive<dyn Screen>>,
    main_content: Arc<Conductor<dyn Screen>>,
    dialogs: Arc<DialogConductor>,
    windows: Arc<AllActive<dyn Screen>>,
    ops: AsyncGuard,
}

impl ShellViewModel {
    pub fn new() -> Arc<Self> {
        let root = AllActive::<dyn Screen>::new();
        let main_content = Conductor::<dyn Screen>::new();
        let dialogs = DialogConductor::new();
        let windows = AllActive::<dyn Screen>::new();
        root.conduct(main_content.clone());
        root.conduct(dialogs.clone());
        root.conduct(windows.clone());
        Arc::new(Self {
            lifecycle: Lifecycle::named("shell"),
            root,
            main_content,
            dialogs,
            windows,
            ops: AsyncGuard::new(),
        })
    }

    pub fn main_content(&self) -> &Arc<Conductor<dyn Screen>> {
        &self.main_content
    }

    pub fn dialogs(&self) -> &Arc<DialogConductor> {
        &self.dialogs
    }

    pub fn windows(&self) -> &Arc<AllActive<dyn Screen>> {
        &self.windows
    }

    /// Ongoing-work guard covering every window-manager operation,
    /// including the full span of a modal dialog.
    pub fn ops(&self) -> &AsyncGuard {
        &self.ops
    }
}

#[async_trait]
impl WindowManager for ShellViewModel {
    async fn show_dialog(
        &self,
        dialog: Arc<dyn Screen>,
        token: &CancellationToken,
    ) -> Result<Option<DialogResult>, ScreenError> {
        let _busy = self.ops.token();
        tracing::debug!(dialog = %dialog.display_name(), "showing dialog");
        self.dialogs.show_dialog(dialog, token).await
    }

    async fn show_main_content(
        &self,
        screen: Arc<dyn Screen>,
        token: &CancellationToken,
    ) -> Result<(), ScreenError> {
        let _busy = self.ops.token();
        tracing::debug!(screen = %screen.display_name(), "switching main content");
        self.main_content.activate_item(Some(screen), token).await
    }

    async fn show_window(
        &self,
        window: Arc<dyn Screen>,
        token: &CancellationToken,
    ) -> Result<(), ScreenError> {
        let _busy = self.ops.token();
        tracing::debug!(window = %window.display_name(), "opening window");
        self.windows.activate_item(window, token).await
    }

    async fn show_popup(
        &self,
        popup: Arc<dyn Screen>,
        token: &CancellationToken,
    ) -> Result<(), ScreenError> {
        let _busy = self.ops.token();
        tracing::debug!(popup = %popup.display_name(), "opening popup");
        self.windows.activate_item(popup, token).await
    }
}

#[async_trait]
impl Screen for ShellViewModel {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    async fn on_activate(&self, token: &CancellationToken) -> Result<(), ScreenError> {
        self.root.activate(token).await
    }

    async fn on_deactivate(&self, close: bool, token: &CancellationToken) -> Result<(), ScreenError> {
        self.root.deactivate(close, token).await
    }

    async fn can_close(&self, token: &CancellationToken) -> Result<bool, ScreenError> {
        self.root.can_close(token).await
    }
}

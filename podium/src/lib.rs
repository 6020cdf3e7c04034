//! Screen lifecycle and conductor composition for async UI applications.
//!
//! The model is the classic screen/conductor split: a [`Screen`] is a unit
//! of presentation logic with an activate/deactivate/close lifecycle, and a
//! conductor is a screen that owns other screens and drives their
//! lifecycles. Conductors nest, so an application is a tree rooted at a
//! [`ShellViewModel`], with activation cascading down and close negotiation
//! cascading back up.
//!
//! Everything is async and cancellation is cooperative: transition drivers
//! hand hooks a `CancellationToken` and consult it between steps, but a
//! hook that has started always gets to finish its bookkeeping. Opposing
//! transitions (an activation racing a deactivation) cancel each other's
//! tokens and then wait, so hook invocations on one screen never overlap.
//!
//! ```no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use tokio_util::sync::CancellationToken;
//! use podium::{Lifecycle, Screen, ScreenError, ScreenExt, OneActive};
//!
//! struct Document {
//!     lifecycle: Lifecycle,
//! }
//!
//! #[async_trait]
//! impl Screen for Document {
//!     fn lifecycle(&self) -> &Lifecycle {
//!         &self.lifecycle
//!     }
//!
//!     async fn on_activate(&self, _token: &CancellationToken) -> Result<(), ScreenError> {
//!         // load content, start watchers, ...
//!         Ok(())
//!     }
//! }
//!
//! # async fn run() -> Result<(), ScreenError> {
//! let tabs = OneActive::<Document>::new();
//! let token = CancellationToken::new();
//! tabs.activate(&token).await?;
//! tabs.activate_item(
//!     Some(Arc::new(Document { lifecycle: Lifecycle::named("readme") })),
//!     &token,
//! )
//! .await?;
//! # Ok(())
//! # }
//! ```

pub mod close;
pub mod collection;
pub mod conductor;
pub mod dialog;
pub mod error;
pub mod event;
pub mod guard;
pub mod lifecycle;
pub mod screen;
pub mod shell;

pub use close::{CloseResult, CloseStrategy, DefaultCloseStrategy};
pub use collection::{ListChanged, ObservableList};
pub use conductor::{ActivationProcessed, AllActive, Conductor, ConductorEvents, OneActive, Parent};
pub use dialog::DialogConductor;
pub use error::{ConductorError, ScreenError};
pub use event::{AsyncEvent, Notifier};
pub use guard::{AsyncGuard, OngoingToken};
pub use lifecycle::{ActivationEvent, DeactivationEvent, Lifecycle, ScreenId};
pub use screen::{CloseHost, DialogResult, Screen, ScreenExt};
pub use shell::{ShellViewModel, WindowManager};

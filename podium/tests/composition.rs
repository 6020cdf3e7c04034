//! End-to-end scenarios across the screen/conductor tree: activation
//! cascades, racing transitions, close negotiation bubbling, and the
//! modal dialog flow through a full shell.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use podium::{
    DialogResult, Lifecycle, OneActive, Screen, ScreenError, ScreenExt, ShellViewModel,
    WindowManager,
};

struct Workspace {
    lifecycle: Lifecycle,
    init_count: AtomicUsize,
    log: Mutex<Vec<String>>,
    allow_close: AtomicBool,
    hold_initialize: Option<Arc<Notify>>,
    hold_activation: Option<Arc<Notify>>,
}

impl Workspace {
    fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            lifecycle: Lifecycle::named(name),
            init_count: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
            allow_close: AtomicBool::new(true),
            hold_initialize: None,
            hold_activation: None,
        })
    }
}

#[async_trait]
impl Screen for Workspace {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    async fn on_initialize(&self, _token: &CancellationToken) -> Result<(), ScreenError> {
        self.init_count.fetch_add(1, Ordering::SeqCst);
        self.log.lock().push("init".into());
        if let Some(gate) = &self.hold_initialize {
            gate.notified().await;
        }
        Ok(())
    }

    async fn on_activate(&self, token: &CancellationToken) -> Result<(), ScreenError> {
        self.log.lock().push("activate".into());
        if let Some(gate) = &self.hold_activation {
            tokio::select! {
                _ = gate.notified() => {}
                _ = token.cancelled() => {}
            }
        }
        Ok(())
    }

    async fn on_deactivate(&self, close: bool, _token: &CancellationToken) -> Result<(), ScreenError> {
        self.log.lock().push(format!("deactivate close={close}"));
        Ok(())
    }

    async fn can_close(&self, _token: &CancellationToken) -> Result<bool, ScreenError> {
        Ok(self.allow_close.load(Ordering::SeqCst))
    }
}

#[tokio::test]
async fn activation_cascades_through_a_nested_tree() {
    let shell = ShellViewModel::new();
    let token = CancellationToken::new();

    let tabs = OneActive::<dyn Screen>::new();
    let doc = Workspace::new("doc");
    tabs.activate_item(Some(doc.clone() as Arc<dyn Screen>), &token)
        .await
        .unwrap();

    shell
        .show_main_content(tabs.clone(), &token)
        .await
        .unwrap();
    assert!(!doc.lifecycle().is_active());

    shell.activate(&token).await.unwrap();
    assert!(shell.main_content().lifecycle().is_active());
    assert!(tabs.lifecycle().is_active());
    assert!(doc.lifecycle().is_active());

    shell.deactivate(false, &token).await.unwrap();
    assert!(!tabs.lifecycle().is_active());
    assert!(!doc.lifecycle().is_active());
    // Plain deactivation keeps the tree intact for reactivation.
    assert_eq!(tabs.items().len(), 1);
}

#[tokio::test]
async fn racing_deactivation_defers_to_in_flight_initialization() {
    let gate = Arc::new(Notify::new());
    let screen = Arc::new(Workspace {
        lifecycle: Lifecycle::named("slow-init"),
        init_count: AtomicUsize::new(0),
        log: Mutex::new(Vec::new()),
        allow_close: AtomicBool::new(true),
        hold_initialize: Some(gate.clone()),
        hold_activation: None,
    });
    let token = CancellationToken::new();

    let activating = {
        let screen = screen.clone();
        let token = token.clone();
        tokio::spawn(async move { screen.activate(&token).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!screen.lifecycle().is_initialized());

    let deactivating = {
        let screen = screen.clone();
        let token = token.clone();
        tokio::spawn(async move { screen.deactivate(true, &token).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    // Initialization finishes untouched, then the close proceeds.
    gate.notify_one();
    activating.await.unwrap().unwrap();
    deactivating.await.unwrap().unwrap();

    assert_eq!(screen.init_count.load(Ordering::SeqCst), 1);
    assert!(screen.lifecycle().is_initialized());
    assert!(!screen.lifecycle().is_active());
    let log = screen.log.lock();
    assert_eq!(log[0], "init");
    assert_eq!(log.last().map(String::as_str), Some("deactivate close=true"));
}

#[tokio::test]
async fn opposing_transitions_never_overlap_hooks() {
    let gate = Arc::new(Notify::new());
    let screen = Arc::new(Workspace {
        lifecycle: Lifecycle::named("contended"),
        init_count: AtomicUsize::new(0),
        log: Mutex::new(Vec::new()),
        allow_close: AtomicBool::new(true),
        hold_initialize: None,
        hold_activation: Some(gate.clone()),
    });
    let token = CancellationToken::new();

    let activating = {
        let screen = screen.clone();
        let token = token.clone();
        tokio::spawn(async move { screen.activate(&token).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(screen.lifecycle().busy().is_ongoing());

    screen.deactivate(false, &token).await.unwrap();
    activating.await.unwrap().unwrap();

    assert!(!screen.lifecycle().busy().is_ongoing());
    assert!(!screen.lifecycle().is_active());
    let log = screen.log.lock();
    assert_eq!(*log, vec!["init", "activate", "deactivate close=false"]);
}

#[tokio::test]
async fn rapid_tab_switching_keeps_one_item_active() {
    let tabs = OneActive::<Workspace>::new();
    let token = CancellationToken::new();
    tabs.activate(&token).await.unwrap();

    let docs: Vec<_> = (0..4).map(|i| Workspace::new(&format!("doc-{i}"))).collect();
    for _round in 0..3 {
        for doc in &docs {
            tabs.activate_item(Some(doc.clone()), &token).await.unwrap();
            let active_count = docs
                .iter()
                .filter(|d| d.lifecycle().is_active())
                .count();
            assert_eq!(active_count, 1);
        }
    }
    assert_eq!(tabs.items().len(), 4);
    for doc in &docs {
        assert_eq!(doc.init_count.load(Ordering::SeqCst), 1);
    }
}

#[tokio::test]
async fn close_refusal_bubbles_from_leaf_to_shell() {
    let shell = ShellViewModel::new();
    let token = CancellationToken::new();
    shell.activate(&token).await.unwrap();

    let tabs = OneActive::<dyn Screen>::new();
    let dirty = Workspace::new("unsaved");
    dirty.allow_close.store(false, Ordering::SeqCst);
    tabs.activate_item(Some(dirty.clone() as Arc<dyn Screen>), &token)
        .await
        .unwrap();
    shell.show_main_content(tabs.clone(), &token).await.unwrap();

    assert!(!shell.can_close(&token).await.unwrap());

    dirty.allow_close.store(true, Ordering::SeqCst);
    assert!(shell.can_close(&token).await.unwrap());
}

#[tokio::test]
async fn modal_dialog_flow_through_the_shell() {
    let shell = ShellViewModel::new();
    let token = CancellationToken::new();
    shell.activate(&token).await.unwrap();

    let prompt = Workspace::new("save-changes");
    let waiting = {
        let shell = shell.clone();
        let prompt = prompt.clone();
        let token = token.clone();
        tokio::spawn(async move {
            shell.show_dialog(prompt as Arc<dyn Screen>, &token).await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(prompt.lifecycle().is_active());

    // The dialog confirms itself through its parent link.
    prompt
        .try_close(Some(DialogResult::Confirmed))
        .await
        .unwrap();

    let result = waiting.await.unwrap().unwrap();
    assert_eq!(result, Some(DialogResult::Confirmed));
    assert!(!prompt.lifecycle().is_active());
    assert!(shell.dialogs().active_dialog().is_none());
}

#[tokio::test]
async fn reactivation_after_close_does_not_reinitialize() {
    let tabs = OneActive::<Workspace>::new();
    let token = CancellationToken::new();
    tabs.activate(&token).await.unwrap();

    let doc = Workspace::new("transient");
    tabs.activate_item(Some(doc.clone()), &token).await.unwrap();
    tabs.deactivate_item(doc.clone(), true, &token).await.unwrap();
    assert!(!doc.lifecycle().is_active());
    assert!(tabs.items().is_empty());

    // A closed screen that comes back is still initialized; init is once
    // per screen instance, not once per conduction.
    tabs.activate_item(Some(doc.clone()), &token).await.unwrap();
    assert!(doc.lifecycle().is_active());
    assert_eq!(doc.init_count.load(Ordering::SeqCst), 1);
}

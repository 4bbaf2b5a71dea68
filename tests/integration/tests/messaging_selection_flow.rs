use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::Result;
use serde_json::{json, Value};
use tau_messaging::{
    ActionDispatcher, FileCatalogSource, InMemoryMessageMetadataStore, JinjaPredicateEvaluator,
    MessageManager, MessageMetadataStore, MessagingCollaborators, MessagingConfig,
    MessagingTelemetryEvent, TelemetrySink,
};
use url::Url;

static WORKSPACE_COUNTER: AtomicU64 = AtomicU64::new(1);

struct IsolatedWorkspace {
    root: PathBuf,
}

impl IsolatedWorkspace {
    fn new(label: &str) -> Self {
        let tick = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let count = WORKSPACE_COUNTER.fetch_add(1, Ordering::Relaxed);
        let root = std::env::temp_dir().join(format!(
            "tau-messaging-{label}-{}-{tick}-{count}",
            std::process::id()
        ));
        fs::create_dir_all(&root).expect("must create isolated workspace root");
        Self { root }
    }

    fn root(&self) -> &Path {
        &self.root
    }
}

impl Drop for IsolatedWorkspace {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

#[derive(Default)]
struct CollectingTelemetry {
    events: Mutex<Vec<MessagingTelemetryEvent>>,
}

impl CollectingTelemetry {
    fn names(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .expect("telemetry lock")
            .iter()
            .map(MessagingTelemetryEvent::name)
            .collect()
    }
}

impl TelemetrySink for CollectingTelemetry {
    fn record(&self, event: &MessagingTelemetryEvent) {
        self.events
            .lock()
            .expect("telemetry lock")
            .push(event.clone());
    }
}

#[derive(Default)]
struct CollectingDispatcher {
    opened: Mutex<Vec<Url>>,
}

impl ActionDispatcher for CollectingDispatcher {
    fn open(&self, target: &Url) -> Result<()> {
        self.opened
            .lock()
            .expect("dispatcher lock")
            .push(target.clone());
        Ok(())
    }
}

struct Scenario {
    _workspace: IsolatedWorkspace,
    catalog_path: PathBuf,
    attributes: Arc<Mutex<Value>>,
    manager: MessageManager,
    store: Arc<InMemoryMessageMetadataStore>,
    telemetry: Arc<CollectingTelemetry>,
    dispatcher: Arc<CollectingDispatcher>,
}

fn write_catalog(path: &Path, catalog: &Value) {
    fs::write(
        path,
        serde_json::to_string_pretty(catalog).expect("catalog should encode"),
    )
    .expect("must write catalog");
}

fn onboarding_catalog(on_control: &str) -> Value {
    json!({
        "messages": [
            {"id": "onboarding-control", "surface": "home", "style": "FEATURED", "action": "OPEN_SYNC", "triggers": ["FRESH_INSTALL"], "is_control": true},
            {"id": "onboarding-treatment", "surface": "home", "style": "FEATURED", "action": "OPEN_SYNC", "triggers": ["FRESH_INSTALL"]},
            {"id": "set-default", "surface": "home", "style": "DEFAULT", "action": "OPEN_SETTINGS", "triggers": ["NOT_DEFAULT"], "title": "Make Tau your default"},
            {"id": "rate-app", "surface": "home", "style": "QUIET", "action": "https://tau.example/rate", "triggers": ["ALWAYS"]},
            {"id": "sync-banner", "surface": "banner", "style": "FEATURED", "action": "OPEN_SYNC", "triggers": ["ALWAYS"]}
        ],
        "styles": {
            "FEATURED": {"priority": 90, "max_display_count": 3},
            "DEFAULT": {"priority": 50, "max_display_count": 2},
            "QUIET": {"priority": 10}
        },
        "actions": {
            "OPEN_SYNC": "://sync?entrypoint=onboarding&uuid={{ uuid }}",
            "OPEN_SETTINGS": "://settings/default-browser"
        },
        "triggers": {
            "ALWAYS": "true",
            "FRESH_INSTALL": "days_since_install < 3",
            "NOT_DEFAULT": "not is_default_browser"
        },
        "message_under_experiment": "onboarding",
        "on_control": on_control
    })
}

fn scenario(label: &str, catalog: Value, config: MessagingConfig) -> Scenario {
    let workspace = IsolatedWorkspace::new(label);
    let catalog_path = workspace.root().join("messaging.json");
    write_catalog(&catalog_path, &catalog);

    let attributes = Arc::new(Mutex::new(json!({
        "days_since_install": 1,
        "is_default_browser": false
    })));
    let provider_attributes = attributes.clone();
    let evaluator = JinjaPredicateEvaluator::new(move || {
        provider_attributes
            .lock()
            .ok()
            .map(|attributes| attributes.clone())
    });
    let store = Arc::new(InMemoryMessageMetadataStore::new());
    let telemetry = Arc::new(CollectingTelemetry::default());
    let dispatcher = Arc::new(CollectingDispatcher::default());
    let manager = MessageManager::new(
        MessagingCollaborators {
            catalog_source: Arc::new(FileCatalogSource::new(catalog_path.clone())),
            evaluator: Arc::new(evaluator),
            store: store.clone(),
            telemetry: telemetry.clone(),
            dispatcher: dispatcher.clone(),
        },
        config,
    )
    .expect("manager should build");

    Scenario {
        _workspace: workspace,
        catalog_path,
        attributes,
        manager,
        store,
        telemetry,
        dispatcher,
    }
}

fn next_id(scenario: &Scenario, surface: &str) -> Option<String> {
    scenario
        .manager
        .get_next_message(surface)
        .map(|message| message.id)
}

#[test]
fn integration_control_arm_falls_through_to_next_eligible_message() {
    let scenario = scenario(
        "show-next",
        onboarding_catalog("show_next_message"),
        MessagingConfig::default(),
    );

    assert_eq!(
        next_id(&scenario, "home").as_deref(),
        Some("onboarding-treatment")
    );
    assert_eq!(scenario.telemetry.names(), vec!["exposure"]);
}

#[test]
fn integration_show_none_control_hides_every_home_message() {
    let scenario = scenario(
        "show-none",
        onboarding_catalog("show_none"),
        MessagingConfig::default(),
    );

    assert_eq!(next_id(&scenario, "home"), None);
    assert_eq!(next_id(&scenario, "banner").as_deref(), Some("sync-banner"));
    assert_eq!(scenario.telemetry.names(), vec!["exposure"]);
}

#[test]
fn integration_context_changes_are_seen_on_next_selection() {
    let scenario = scenario(
        "context",
        onboarding_catalog("show_next_message"),
        MessagingConfig::default(),
    );
    *scenario.attributes.lock().expect("attributes lock") = json!({
        "days_since_install": 30,
        "is_default_browser": false
    });
    assert_eq!(next_id(&scenario, "home").as_deref(), Some("set-default"));

    *scenario.attributes.lock().expect("attributes lock") = json!({
        "days_since_install": 30,
        "is_default_browser": true
    });
    assert_eq!(next_id(&scenario, "home").as_deref(), Some("rate-app"));
}

#[test]
fn integration_display_press_and_dismiss_drive_expiry() {
    let scenario = scenario(
        "lifecycle",
        onboarding_catalog("show_next_message"),
        MessagingConfig {
            deep_link_scheme: "tau-nightly".to_string(),
            ..MessagingConfig::default()
        },
    );

    let treatment = scenario
        .manager
        .get_next_message("home")
        .expect("treatment selected");
    scenario.manager.on_message_displayed(&treatment);
    let target = scenario
        .manager
        .on_message_pressed(&treatment)
        .expect("press dispatches");
    assert_eq!(target.scheme(), "tau-nightly");
    assert_eq!(target.host_str(), Some("sync"));
    assert_eq!(
        scenario.dispatcher.opened.lock().expect("dispatcher lock").len(),
        1
    );
    assert!(
        scenario
            .store
            .metadata("onboarding-treatment")
            .expect("metadata")
            .expired
    );

    *scenario.attributes.lock().expect("attributes lock") = json!({
        "days_since_install": 30,
        "is_default_browser": false
    });
    let set_default = scenario
        .manager
        .get_next_message("home")
        .expect("set-default selected");
    assert_eq!(set_default.id, "set-default");
    scenario.manager.on_message_dismissed(&set_default);

    assert_eq!(next_id(&scenario, "home").as_deref(), Some("rate-app"));
    assert_eq!(
        scenario.telemetry.names(),
        vec![
            "exposure",
            "message_shown",
            "message_clicked",
            "message_dismissed"
        ]
    );
}

#[test]
fn integration_catalog_file_edits_apply_without_rebuilding_manager() {
    let scenario = scenario(
        "catalog-edit",
        onboarding_catalog("show_next_message"),
        MessagingConfig::default(),
    );
    assert_eq!(next_id(&scenario, "banner").as_deref(), Some("sync-banner"));

    let mut edited = onboarding_catalog("show_next_message");
    edited["messages"][4]["style"] = json!("RETIRED");
    write_catalog(&scenario.catalog_path, &edited);

    assert_eq!(next_id(&scenario, "banner"), None);
    assert_eq!(scenario.telemetry.names().last().copied(), Some("malformed"));

    fs::write(&scenario.catalog_path, "{ truncated").expect("must corrupt catalog");
    assert_eq!(next_id(&scenario, "home"), None);
}

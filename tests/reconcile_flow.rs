//! Registry → builder → reconciler, end to end against the in-memory store.

use vulcan_config_builder::builder::build;
use vulcan_config_builder::reconcile::Reconciler;
use vulcan_config_builder::registry::read_services;
use vulcan_config_builder::store::memory::Operation;
use vulcan_config_builder::store::MemoryStore;

const SERVICES: &str = "/ft/services";
const PROXY: &str = "/vulcand";

fn seed_svc_a(store: &MemoryStore) {
    store.seed("/ft/services/svc-a/healthcheck", "true");
    store.seed("/ft/services/svc-a/servers/1", "10.0.0.1:8080");
    store.seed("/ft/services/svc-a/servers/2", "10.0.0.2:8080");
    store.seed("/ft/services/svc-a/path-regex/p1", "/content/.*");
}

async fn sync(store: &MemoryStore) -> vulcan_config_builder::ReconcileReport {
    let services = read_services(store, SERVICES).await.unwrap();
    Reconciler::new(store, PROXY)
        .reconcile(&build(&services))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_single_service_full_layout() {
    let store = MemoryStore::new();
    seed_svc_a(&store);

    let report = sync(&store).await;
    assert_eq!(report.failures, 0);

    let keys: Vec<String> = store.leaves(PROXY).into_keys().collect();
    assert_eq!(
        keys,
        vec![
            "/vulcand/backends/b:svc-a/backend",
            "/vulcand/backends/b:svc-a/servers/1",
            "/vulcand/backends/b:svc-a/servers/2",
            "/vulcand/backends/b:svc-a:1/backend",
            "/vulcand/backends/b:svc-a:1/servers/1",
            "/vulcand/backends/b:svc-a:2/backend",
            "/vulcand/backends/b:svc-a:2/servers/2",
            "/vulcand/frontends/fe:byhost:svc-a/frontend",
            "/vulcand/frontends/fe:health:svc-a:1/frontend",
            "/vulcand/frontends/fe:health:svc-a:1/middlewares/rewrite",
            "/vulcand/frontends/fe:health:svc-a:2/frontend",
            "/vulcand/frontends/fe:health:svc-a:2/middlewares/rewrite",
            "/vulcand/frontends/fe:internal:svc-a/frontend",
            "/vulcand/frontends/fe:internal:svc-a/middlewares/rewrite",
            "/vulcand/frontends/fe:svc-a:path:p1/frontend",
        ]
    );
    assert_eq!(report.writes, keys.len());

    let leaves = store.leaves(PROXY);
    assert_eq!(
        leaves["/vulcand/frontends/fe:health:svc-a:2/frontend"],
        r#"{"Type":"http","BackendId":"b:svc-a:2","Route":"Path(`/health/svc-a-2/__health`)","Settings":{"FailoverPredicate":""}}"#
    );
    assert_eq!(
        leaves["/vulcand/frontends/fe:svc-a:path:p1/frontend"],
        r#"{"Type":"http","BackendId":"b:svc-a","Route":"PathRegexp(`/content/.*`)","Settings":{"FailoverPredicate":""}}"#
    );
}

#[tokio::test]
async fn test_unchanged_registry_writes_nothing() {
    let store = MemoryStore::new();
    seed_svc_a(&store);
    sync(&store).await;
    store.clear_journal();

    let report = sync(&store).await;
    assert!(report.is_noop());
    assert!(store.journal().is_empty());
}

#[tokio::test]
async fn test_address_change_rewrites_only_affected_keys() {
    let store = MemoryStore::new();
    seed_svc_a(&store);
    sync(&store).await;
    store.clear_journal();

    store.seed("/ft/services/svc-a/servers/2", "10.0.0.9:8080");
    let report = sync(&store).await;

    assert_eq!(report.writes, 2);
    assert_eq!(report.deletes, 0);
    assert_eq!(
        store.journal(),
        vec![
            Operation::Set("/vulcand/backends/b:svc-a/servers/2".to_string()),
            Operation::Set("/vulcand/backends/b:svc-a:2/servers/2".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_foreign_keys_untouched() {
    let store = MemoryStore::new();
    let manual_frontend = r#"{"Type":"http","BackendId":"legacy","Route":"Path(`/x`)"}"#;
    let manual_backend = r#"{"Type":"http"}"#;
    store.seed("/vulcand/frontends/manual/frontend", manual_frontend);
    store.seed("/vulcand/backends/legacy/backend", manual_backend);
    store.seed("/vulcand/hosts/example.com/host", "{}");
    seed_svc_a(&store);

    let report = sync(&store).await;
    assert_eq!(report.foreign, 3);

    // removing every service must still leave foreign keys alone
    store.clear_journal();
    let services = Vec::new();
    Reconciler::new(&store, PROXY).reconcile(&build(&services)).await.unwrap();

    let leaves = store.leaves(PROXY);
    assert_eq!(leaves.len(), 3);
    assert_eq!(leaves["/vulcand/frontends/manual/frontend"], manual_frontend);
    assert_eq!(leaves["/vulcand/backends/legacy/backend"], manual_backend);
    assert!(store
        .journal()
        .iter()
        .all(|op| op.key().contains("fe:") || op.key().contains("b:")));
}

#[tokio::test]
async fn test_invalid_address_drops_server_records() {
    let store = MemoryStore::new();
    seed_svc_a(&store);
    store.seed("/ft/services/svc-b/servers/1", "10.0.1.1:8080");
    sync(&store).await;

    store.seed("/ft/services/svc-b/servers/1", "not an address");
    store.clear_journal();
    let report = sync(&store).await;

    // invalid address: server records go, backends stay
    assert_eq!(report.deletes, 2);
    assert!(!store.contains("/vulcand/backends/b:svc-b/servers/1"));
    assert!(store.contains("/vulcand/backends/b:svc-b/backend"));
    assert!(store.contains("/vulcand/frontends/fe:byhost:svc-b/frontend"));
}

#[tokio::test]
async fn test_write_failure_does_not_stop_cycle() {
    let store = MemoryStore::new();
    seed_svc_a(&store);
    store.fail_writes_to("/vulcand/backends/b:svc-a/servers/1");

    let report = sync(&store).await;
    assert_eq!(report.failures, 1);
    assert_eq!(report.writes, 14);
    assert!(store.contains("/vulcand/frontends/fe:svc-a:path:p1/frontend"));

    // the failed key is retried next cycle
    store.clear_journal();
    let again = sync(&store).await;
    assert_eq!(again.failures, 1);
    assert_eq!(again.writes, 0);
    assert_eq!(
        store.journal(),
        vec![Operation::Set("/vulcand/backends/b:svc-a/servers/1".to_string())]
    );
}

#[tokio::test]
async fn test_existing_server_records_left_byte_identical() {
    let store = MemoryStore::new();
    store.seed("/ft/services/svc-a/servers/1", "10.0.0.1:8080");
    store.seed("/vulcand/backends/b:svc-a/servers/1", r#"{"url":"10.0.0.1:8080"}"#);
    store.seed("/vulcand/backends/b:svc-a:1/servers/1", r#"{"url":"10.0.0.1:8080"}"#);

    sync(&store).await;

    assert!(!store.journal().iter().any(|op| op.key().contains("/servers/")));
    assert_eq!(
        store.leaves(PROXY)["/vulcand/backends/b:svc-a/servers/1"],
        r#"{"url":"10.0.0.1:8080"}"#
    );
}

//! SQL driver against a SQLite database in a temporary directory.

use std::sync::Arc;
use std::time::Duration;

use hotconf_config::{
    ConfigError, Configurable, Configurator, ConfiguratorOptions, Connector, Driver,
    DriverRegistry, Options,
};
use hotconf_driver_sql::{DRIVER_NAME, SqlDriver};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::json;
use sqlx::SqlitePool;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const LOAD: &str = "SELECT body FROM settings WHERE name = 'app'";
const STORE: &str = "UPDATE settings SET body = ? WHERE name = 'app'";

struct Database {
    _dir: TempDir,
    dsn: String,
    pool: SqlitePool,
}

impl Database {
    async fn seeded(body: &serde_json::Value) -> Self {
        let dir = TempDir::new().unwrap();
        let dsn = format!("sqlite://{}?mode=rwc", dir.path().join("conf.db").display());
        let pool = SqlitePool::connect(&dsn).await.unwrap();
        sqlx::query("CREATE TABLE settings (name TEXT PRIMARY KEY, body TEXT NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO settings (name, body) VALUES ('app', ?)")
            .bind(body.to_string())
            .execute(&pool)
            .await
            .unwrap();
        Self {
            _dir: dir,
            dsn,
            pool,
        }
    }

    async fn update(&self, body: &serde_json::Value) {
        sqlx::query("UPDATE settings SET body = ? WHERE name = 'app'")
            .bind(body.to_string())
            .execute(&self.pool)
            .await
            .unwrap();
    }

    async fn body(&self) -> serde_json::Value {
        let text: String = sqlx::query_scalar("SELECT body FROM settings WHERE name = 'app'")
            .fetch_one(&self.pool)
            .await
            .unwrap();
        serde_json::from_str(&text).unwrap()
    }

    fn props(&self) -> Options {
        let props = Options::new();
        props.set("dsn", self.dsn.as_str());
        props.set("loadQuery", LOAD);
        props.set("storeQuery", STORE);
        props
    }
}

#[derive(Default)]
struct Levels {
    seen: Mutex<Vec<String>>,
}

impl Configurable for Levels {
    fn configure(&self, section: &Options, _first: bool) {
        self.seen.lock().push(section.get_string("level", ""));
    }
}

async fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    condition()
}

// ---------------------------------------------------------------------------
// Connecting
// ---------------------------------------------------------------------------

#[tokio::test]
async fn connect_requires_dsn_and_load_query() {
    let err = SqlDriver.connect(&Options::new(), None).await.err().unwrap();
    assert_eq!(err, ConfigError::connector(DRIVER_NAME, "dsn is required"));

    let props = Options::new();
    props.set("dsn", "sqlite::memory:");
    let err = SqlDriver.connect(&props, None).await.err().unwrap();
    assert_eq!(err, ConfigError::connector(DRIVER_NAME, "loadQuery is required"));
}

#[tokio::test]
async fn connect_fails_for_unreachable_database() {
    let dir = TempDir::new().unwrap();
    let props = Options::new();
    // Read-only mode never creates the file.
    props.set(
        "dsn",
        format!("sqlite://{}?mode=ro", dir.path().join("absent.db").display()),
    );
    props.set("loadQuery", LOAD);

    let err = SqlDriver.connect(&props, None).await.err().unwrap();
    assert!(matches!(err, ConfigError::Connector { .. }), "{err:?}");
}

#[tokio::test]
async fn connect_rejects_bad_cron_spec() {
    let db = Database::seeded(&json!({})).await;
    let props = db.props();
    props.set("cronSpec", "every now and then");

    let err = SqlDriver.connect(&props, None).await.err().unwrap();
    assert!(matches!(err, ConfigError::TypeError { .. }), "{err:?}");
}

// ---------------------------------------------------------------------------
// Load / store
// ---------------------------------------------------------------------------

#[tokio::test]
async fn load_and_store_round_trip() {
    let db = Database::seeded(&json!({"log": {"level": "info"}})).await;
    let mut connector = SqlDriver.connect(&db.props(), None).await.unwrap();

    let options = connector.load().await.unwrap();
    assert_eq!(options.get_string("log.level", ""), "info");

    options.set("log.level", "debug");
    connector.store(&options).await.unwrap();
    assert_eq!(db.body().await, json!({"log": {"level": "debug"}}));

    connector.close().await.unwrap();
    connector.close().await.unwrap();
}

#[tokio::test]
async fn store_without_query_fails() {
    let db = Database::seeded(&json!({})).await;
    let props = db.props();
    props.remove("storeQuery");

    let mut connector = SqlDriver.connect(&props, None).await.unwrap();
    let err = connector.store(&Options::new()).await.unwrap_err();
    assert_eq!(
        err,
        ConfigError::connector(DRIVER_NAME, "storeQuery is not configured")
    );
    connector.close().await.unwrap();
}

#[tokio::test]
async fn failing_store_query_names_the_step() {
    let db = Database::seeded(&json!({})).await;
    let props = db.props();
    props.set("storeQuery", "UPDATE no_such_table SET body = ?");

    let mut connector = SqlDriver.connect(&props, None).await.unwrap();
    let err = connector.store(&Options::new()).await.unwrap_err();
    assert!(matches!(err, ConfigError::Connector { .. }), "{err:?}");
    assert!(err.to_string().contains("store query: "), "{err}");
    connector.close().await.unwrap();
}

#[tokio::test]
async fn malformed_document_is_a_decode_error() {
    let db = Database::seeded(&json!({})).await;
    sqlx::query("UPDATE settings SET body = 'not json'")
        .execute(&db.pool)
        .await
        .unwrap();

    let mut connector = SqlDriver.connect(&db.props(), None).await.unwrap();
    let err = connector.load().await.unwrap_err();
    assert!(matches!(err, ConfigError::Decode { .. }), "{err:?}");
    connector.close().await.unwrap();
}

// ---------------------------------------------------------------------------
// Polling
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn polled_changes_are_delivered() {
    let db = Database::seeded(&json!({"log": {"level": "info"}})).await;
    let props = db.props();
    props.set("cronSpec", "@every 100ms");

    let registry = DriverRegistry::new();
    hotconf_driver_sql::register(&registry).unwrap();
    let configurator =
        Configurator::open_with(&registry, DRIVER_NAME, &props, ConfiguratorOptions::default())
            .await
            .unwrap();
    let levels = Arc::new(Levels::default());
    configurator.register("log", levels.clone()).await;

    db.update(&json!({"log": {"level": "trace"}})).await;
    let delivered = wait_for(|| levels.seen.lock().len() >= 2).await;
    assert!(delivered, "change was not delivered");
    assert_eq!(levels.seen.lock()[..2].to_vec(), vec!["info", "trace"]);

    configurator.close().await.unwrap();

    db.update(&json!({"log": {"level": "warn"}})).await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!levels.seen.lock().iter().any(|level| level == "warn"));
}

#[tokio::test(flavor = "multi_thread")]
async fn unchanged_rows_are_not_reported() {
    let db = Database::seeded(&json!({"log": {"level": "info"}})).await;
    let props = db.props();
    props.set("cronSpec", "@every 50ms");

    let registry = DriverRegistry::new();
    hotconf_driver_sql::register(&registry).unwrap();
    let configurator =
        Configurator::open_with(&registry, DRIVER_NAME, &props, ConfiguratorOptions::default())
            .await
            .unwrap();
    let levels = Arc::new(Levels::default());
    configurator.register("log", levels.clone()).await;

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(*levels.seen.lock(), vec!["info"]);
    configurator.close().await.unwrap();
}

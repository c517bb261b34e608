//! File driver against real files in a temporary directory.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use hotconf_config::{
    ConfigError, Configurable, Configurator, ConfiguratorOptions, Connector, Driver, DriverRegistry,
    Options,
};
use hotconf_driver_file::{DRIVER_NAME, FileDriver};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Hosts {
    seen: Mutex<Vec<(String, bool)>>,
}

impl Configurable for Hosts {
    fn configure(&self, section: &Options, first: bool) {
        self.seen
            .lock()
            .push((section.get_string("host", ""), first));
    }
}

fn props(path: &Path) -> Options {
    let props = Options::new();
    props.set("fileName", path.to_string_lossy().into_owned());
    props.set("eventDelay", "50ms");
    props
}

fn write_json(path: &Path, value: &serde_json::Value) {
    fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
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

async fn open(path: &Path) -> Configurator {
    let registry = DriverRegistry::new();
    hotconf_driver_file::register(&registry).unwrap();
    Configurator::open_with(
        &registry,
        DRIVER_NAME,
        &props(path),
        ConfiguratorOptions::default(),
    )
    .await
    .unwrap()
}

// ---------------------------------------------------------------------------
// Connecting
// ---------------------------------------------------------------------------

#[tokio::test]
async fn connect_requires_existing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing.json");

    let err = FileDriver
        .connect(&props(&path), None)
        .await
        .err()
        .unwrap();
    assert_eq!(err, ConfigError::file_not_found(&path));
}

#[tokio::test]
async fn connect_rejects_unknown_format() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.json");
    write_json(&path, &json!({}));

    let props = props(&path);
    props.set("format", "yaml");
    let err = FileDriver.connect(&props, None).await.err().unwrap();
    assert!(matches!(err, ConfigError::TypeError { .. }));
}

#[tokio::test]
async fn connect_requires_file_name() {
    let err = FileDriver
        .connect(&Options::new(), None)
        .await
        .err()
        .unwrap();
    assert_eq!(err, ConfigError::connector(DRIVER_NAME, "fileName is required"));
}

// ---------------------------------------------------------------------------
// Load / store
// ---------------------------------------------------------------------------

#[tokio::test]
async fn load_and_store_round_trip_hjson() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.hjson");
    fs::write(
        &path,
        "{\n  # primary\n  db: {\n    host: localhost\n    port: 5432\n  }\n}\n",
    )
    .unwrap();

    let mut connector = FileDriver.connect(&props(&path), None).await.unwrap();
    let options = connector.load().await.unwrap();
    assert_eq!(options.get_string("db.host", ""), "localhost");
    assert_eq!(options.file_path(), Some(path.as_path()));

    options.set("db.port", 6543);
    connector.store(&options).await.unwrap();

    let reloaded = connector.load().await.unwrap();
    assert_eq!(reloaded.get_int("db.port", 0), 6543);
    assert_eq!(reloaded, options);

    connector.close().await.unwrap();
    connector.close().await.unwrap();
}

// ---------------------------------------------------------------------------
// Watching
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread")]
async fn edits_are_delivered_to_registered_targets() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.json");
    write_json(&path, &json!({"db": {"host": "a"}}));

    let configurator = open(&path).await;
    let hosts = Arc::new(Hosts::default());
    configurator.register("db", hosts.clone()).await;

    write_json(&path, &json!({"db": {"host": "b"}}));
    let delivered = wait_for(|| hosts.seen.lock().len() >= 2).await;
    assert!(delivered, "change was not delivered");
    assert_eq!(
        hosts.seen.lock()[..2].to_vec(),
        vec![("a".to_string(), true), ("b".to_string(), false)]
    );

    configurator.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn rewriting_identical_content_is_silent() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.json");
    let content = json!({"db": {"host": "a"}});
    write_json(&path, &content);

    let configurator = open(&path).await;
    let hosts = Arc::new(Hosts::default());
    configurator.register("db", hosts.clone()).await;

    write_json(&path, &content);
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(hosts.seen.lock().len(), 1);

    configurator.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn nothing_is_delivered_after_close() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.json");
    write_json(&path, &json!({"db": {"host": "a"}}));

    let configurator = open(&path).await;
    let hosts = Arc::new(Hosts::default());
    configurator.register("db", hosts.clone()).await;
    configurator.close().await.unwrap();

    write_json(&path, &json!({"db": {"host": "c"}}));
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(hosts.seen.lock().len(), 1);
    assert!(!configurator.is_valid().await);
}

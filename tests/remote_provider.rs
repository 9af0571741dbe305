//! HTTP remote provider against a local config server.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use config_audit::config::{ConfigError, ConfigLoader, DocumentFormat, HttpProvider, RemoteProvider};
use config_audit::lifecycle::Shutdown;

mod common;

fn provider(addr: std::net::SocketAddr, format: DocumentFormat) -> HttpProvider {
    HttpProvider::new(format!("http://{}/config", addr), format, Duration::from_secs(2))
        .unwrap()
        .with_name("apollo")
        .with_poll_interval(Duration::from_millis(50))
}

#[tokio::test]
async fn test_load_parses_remote_document() {
    let addr = common::start_config_server(|| async {
        (200, "server:\n  port: 9090\nlog_level: debug\n".to_string())
    })
    .await;

    let snapshot = provider(addr, DocumentFormat::Yaml).load().await.unwrap();
    assert_eq!(snapshot.get_int("server.port"), Some(9090));
    assert_eq!(snapshot.get_string("log_level").as_deref(), Some("debug"));
}

#[tokio::test]
async fn test_remote_layer_has_highest_priority() {
    let addr = common::start_config_server(|| async { (200, r#"{"port": 9090}"#.to_string()) }).await;
    let loader = ConfigLoader::new()
        .with_defaults(config_audit::ConfigSnapshot::new().with("port", 80).with("host", "a"))
        .with_remote(Arc::new(provider(addr, DocumentFormat::Json)));

    let snapshot = loader.load().await.unwrap();
    assert_eq!(snapshot.get_int("port"), Some(9090));
    assert_eq!(snapshot.get_string("host").as_deref(), Some("a"));
}

#[tokio::test]
async fn test_error_status_is_a_remote_error() {
    let addr = common::start_config_server(|| async { (503, "unavailable".to_string()) }).await;

    let err = provider(addr, DocumentFormat::Json).load().await.unwrap_err();
    assert!(matches!(err, ConfigError::Remote { ref provider, .. } if provider == "apollo"));
}

#[tokio::test]
async fn test_watch_forwards_only_changed_documents() {
    let polls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&polls);
    let addr = common::start_config_server(move || {
        let counter = Arc::clone(&counter);
        async move {
            // Polls 0-2 serve v1, later polls serve v2; one failure in between.
            match counter.fetch_add(1, Ordering::SeqCst) {
                0..=2 => (200, r#"{"version": 1}"#.to_string()),
                3 => (500, "boom".to_string()),
                _ => (200, r#"{"version": 2}"#.to_string()),
            }
        }
    })
    .await;

    let shutdown = Shutdown::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let watcher = provider(addr, DocumentFormat::Json);
    let handle = tokio::spawn({
        let listener = shutdown.subscribe();
        async move { watcher.watch(tx, listener).await }
    });

    let first = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
    assert_eq!(first.get_int("version"), Some(1));
    let second = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
    assert_eq!(second.get_int("version"), Some(2));
    assert!(polls.load(Ordering::SeqCst) >= 5);

    shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    assert!(result.is_ok());
}

//! Shared utilities for integration tests.

use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use axum::{http::StatusCode, routing::get, Router};
use tokio::net::TcpListener;

use config_audit::audit::{AuditRecord, RecordSink, SinkError};

/// Start a programmable config server answering `GET /config`.
///
/// Binds an ephemeral port and returns its address.
#[allow(dead_code)]
pub async fn start_config_server<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = Router::new().route(
        "/config",
        get(move || {
            let f = f.clone();
            async move {
                let (status, body) = f().await;
                (StatusCode::from_u16(status).unwrap(), body)
            }
        }),
    );

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Sink that keeps every record for later assertions.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct CollectingSink {
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

#[allow(dead_code)]
impl CollectingSink {
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn take(&self) -> Vec<AuditRecord> {
        std::mem::take(&mut *self.records.lock().unwrap())
    }
}

impl RecordSink for CollectingSink {
    fn consume(&self, record: &AuditRecord) -> Result<(), SinkError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

#[allow(dead_code)]
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

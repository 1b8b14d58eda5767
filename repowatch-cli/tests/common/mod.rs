//! Shared fixtures for orchestrator integration tests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use repowatch_core::error::CloneError;
use repowatch_core::pipeline::{BoxFuture, RepositoryFetcher};
use repowatch_core::types::{Checkout, ScanTarget};

/// Fetcher that materialises fixture trees instead of cloning.
///
/// Each known URL maps to a list of `(relative path, contents)` files. Unknown
/// URLs fail with `CloneError::NotFound`.
#[derive(Default)]
pub struct FixtureFetcher {
    trees: HashMap<String, Vec<(&'static str, String)>>,
    pub fetched: Arc<Mutex<Vec<std::path::PathBuf>>>,
}

impl FixtureFetcher {
    pub fn with_tree(mut self, url: &str, files: Vec<(&'static str, String)>) -> Self {
        self.trees.insert(url.to_owned(), files);
        self
    }
}

impl RepositoryFetcher for FixtureFetcher {
    fn fetch<'a>(&'a self, target: &'a ScanTarget) -> BoxFuture<'a, Result<Checkout, CloneError>> {
        Box::pin(async move {
            let files = self
                .trees
                .get(&target.url)
                .ok_or_else(|| CloneError::NotFound(target.url.clone()))?;

            let dir = TempDir::new().map_err(|e| CloneError::TempDir(e.to_string()))?;
            let repo = dir.path().join(&target.name);
            for (rel, body) in files {
                write_file(&repo.join(rel), body);
            }
            self.fetched.lock().unwrap().push(repo);
            Ok::<_, CloneError>(Checkout::scoped(dir, &target.name))
        })
    }
}

fn write_file(path: &Path, body: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, body).unwrap();
}

/// Minimal packages.drupal.org p2 stand-in.
pub async fn start_registry(routes: Vec<(&'static str, String)>) -> SocketAddr {
    let routes: Arc<HashMap<String, String>> = Arc::new(
        routes
            .into_iter()
            .map(|(path, body)| (path.to_owned(), body))
            .collect(),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                continue;
            };
            let routes = Arc::clone(&routes);
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&buf);
                let path = head
                    .lines()
                    .next()
                    .and_then(|line| line.split_whitespace().nth(1))
                    .unwrap_or("/")
                    .to_owned();

                let (status, body) = match routes.get(&path) {
                    Some(body) => (200, body.clone()),
                    None => (404, "not found".to_owned()),
                };
                let response = format!(
                    "HTTP/1.1 {status} STUB\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    addr
}

/// p2 metadata body listing the given versions for one package.
pub fn p2(module: &str, versions: &[&str]) -> String {
    let releases: Vec<_> = versions
        .iter()
        .map(|v| serde_json::json!({"name": module, "version": v}))
        .collect();
    serde_json::json!({"packages": {module: releases}}).to_string()
}

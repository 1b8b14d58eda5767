//! 테스트용 HTTP 스텁 서버
//!
//! 경로별로 고정 응답을 돌려주고 받은 요청 경로를 기록합니다.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

#[derive(Clone, Default)]
pub struct StubRegistry {
    routes: Arc<HashMap<String, (u16, String)>>,
    pub hits: Arc<Mutex<Vec<String>>>,
}

impl StubRegistry {
    pub fn new(routes: impl IntoIterator<Item = (&'static str, u16, String)>) -> Self {
        let routes = routes
            .into_iter()
            .map(|(path, status, body)| (path.to_owned(), (status, body)))
            .collect();
        Self {
            routes: Arc::new(routes),
            hits: Arc::default(),
        }
    }

    /// 127.0.0.1의 임의 포트에서 서버를 시작하고 주소를 반환합니다.
    pub async fn start(self) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    continue;
                };
                let stub = self.clone();
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
                    stub.hits.lock().unwrap().push(path.clone());

                    let (status, body) = stub
                        .routes
                        .get(&path)
                        .cloned()
                        .unwrap_or((404, "not found".to_owned()));
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
}

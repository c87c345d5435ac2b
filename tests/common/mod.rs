#![allow(dead_code)]

use docker_image_puller::{ImagePuller, Logger, PullerConfig, RegistryTransport, TransportConfig};
use reqwest::StatusCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub const V1: &str = "application/vnd.docker.distribution.manifest.v1+json";
pub const V2: &str = "application/vnd.docker.distribution.manifest.v2+json";

/// Transport settings that keep retry tests fast
pub fn fast_transport() -> TransportConfig {
    TransportConfig {
        timeout: Duration::from_secs(2),
        max_retries: 5,
        max_concurrent: 10,
        backoff_base: Duration::from_millis(5),
        backoff_max: Duration::from_millis(40),
    }
}

pub fn config_for(base_url: &str) -> PullerConfig {
    PullerConfig::default()
        .with_base_url(base_url)
        .with_transport(fast_transport())
}

pub fn puller_for(config: &PullerConfig) -> (ImagePuller, Arc<RegistryTransport>) {
    let transport = Arc::new(
        RegistryTransport::new(config.transport.clone(), Logger::new(true)).expect("transport"),
    );
    let puller = ImagePuller::new(config, Arc::clone(&transport), Logger::new(true));
    (puller, transport)
}

pub fn manifest_json(layers: &[(&str, u64)]) -> String {
    let layers: Vec<_> = layers
        .iter()
        .map(|(digest, size)| {
            serde_json::json!({
                "mediaType": "application/vnd.docker.image.rootfs.diff.tar.gzip",
                "size": size,
                "digest": digest,
            })
        })
        .collect();
    serde_json::json!({
        "schemaVersion": 2,
        "mediaType": V2,
        "config": {
            "mediaType": "application/vnd.docker.container.image.v1+json",
            "size": 1472,
            "digest": "sha256:cccc"
        },
        "layers": layers,
    })
    .to_string()
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Path including the query string
    pub path: String,
    pub headers: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: Vec<u8>,
    pub content_type: &'static str,
    pub delay: Duration,
}

impl Reply {
    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
            content_type: "text/plain",
            delay: Duration::ZERO,
        }
    }

    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            ..Self::status(200)
        }
    }

    pub fn json(body: impl Into<String>, content_type: &'static str) -> Self {
        Self {
            body: body.into().into_bytes(),
            content_type,
            ..Self::status(200)
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

type Responder = dyn Fn(&RecordedRequest, usize) -> Reply + Send + Sync;

/// Minimal HTTP/1.1 server that answers from a closure and records every request.
///
/// The closure receives the request and how many earlier requests hit the same
/// path and `Accept` header, which lets a test script "fail twice, then succeed".
pub struct ScriptedServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl ScriptedServer {
    pub async fn start<F>(respond: F) -> Self
    where
        F: Fn(&RecordedRequest, usize) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let requests: Arc<Mutex<Vec<RecordedRequest>>> = Arc::default();
        let respond: Arc<Responder> = Arc::new(respond);

        {
            let requests = Arc::clone(&requests);
            tokio::spawn(async move {
                while let Ok((mut socket, _)) = listener.accept().await {
                    let requests = Arc::clone(&requests);
                    let respond = Arc::clone(&respond);
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        let reply = {
                            let mut seen = requests.lock().unwrap();
                            let earlier = seen
                                .iter()
                                .filter(|r| {
                                    r.path == request.path
                                        && r.header("accept") == request.header("accept")
                                })
                                .count();
                            seen.push(request.clone());
                            respond(&request, earlier)
                        };

                        if !reply.delay.is_zero() {
                            tokio::time::sleep(reply.delay).await;
                        }
                        let reason = StatusCode::from_u16(reply.status)
                            .ok()
                            .and_then(|s| s.canonical_reason())
                            .unwrap_or("Unknown");
                        let head = format!(
                            "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nContent-Type: {}\r\nConnection: close\r\n\r\n",
                            reply.status,
                            reason,
                            reply.body.len(),
                            reply.content_type
                        );
                        let _ = socket.write_all(head.as_bytes()).await;
                        let _ = socket.write_all(&reply.body).await;
                        let _ = socket.shutdown().await;
                    });
                }
            });
        }

        Self {
            base_url: format!("http://{}", addr),
            requests,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn hits(&self, path_prefix: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.path.starts_with(path_prefix))
            .count()
    }
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let head = String::from_utf8_lossy(&buf).into_owned();
    let mut lines = head.split("\r\n");
    let path = lines.next()?.split_whitespace().nth(1)?.to_string();
    let headers = lines
        .take_while(|line| !line.is_empty())
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    Some(RecordedRequest { path, headers })
}

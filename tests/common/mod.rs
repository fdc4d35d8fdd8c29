//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use reagent_gate::config::GateConfig;
use reagent_gate::security::clock::{Clock, ManualClock};
use reagent_gate::SecurityCore;

/// Start a mock upstream that answers every request with `200` and a body
/// of `"{method} {target}"` taken from the request line.
pub async fn start_echo_upstream(addr: SocketAddr) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = Vec::with_capacity(1024);
                        let mut chunk = [0u8; 1024];
                        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                            match socket.read(&mut chunk).await {
                                Ok(0) | Err(_) => return,
                                Ok(n) => buf.extend_from_slice(&chunk[..n]),
                            }
                        }

                        let head = String::from_utf8_lossy(&buf);
                        let body = head
                            .lines()
                            .next()
                            .and_then(|line| line.rsplit_once(' ').map(|(start, _)| start.to_string()))
                            .unwrap_or_default();

                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// A config that builds quickly: cheap key derivation, and clients told
/// apart by `X-Forwarded-For` as if behind a trusted proxy.
pub fn test_config() -> GateConfig {
    let mut config = GateConfig::default();
    config.gate.trust_forwarded_for = true;
    config.storage.passphrase = "integration-passphrase".into();
    config.storage.pbkdf2_rounds = 1;
    config
}

/// Security core on a manual clock starting at zero.
#[allow(dead_code)]
pub fn manual_core(config: &GateConfig) -> (SecurityCore, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(0));
    let shared: Arc<dyn Clock> = clock.clone();
    let core = SecurityCore::new(config, shared).unwrap();
    (core, clock)
}

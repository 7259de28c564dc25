//! WebSocket server: accepts TCP connections and hands each one to a
//! [`Coordinator`] chosen by request path.
//!
//! The accept loop runs until the shutdown token fires, then waits for every
//! connection task to unwind. Connection tasks share the token, so a
//! shutdown reaches every live session.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::constants::ACCEPT_RETRY_DELAY;
use crate::session::{Coordinator, Mode};
use crate::ws;

/// Bound listener plus the configuration every connection is served with.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    config: Arc<Config>,
}

impl Server {
    /// Bind to `config.addr`.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn bind(config: Config) -> Result<Self> {
        let listener = TcpListener::bind(&config.addr)
            .await
            .with_context(|| format!("Failed to bind {}", config.addr))?;
        Ok(Self {
            listener,
            config: Arc::new(config),
        })
    }

    /// Address actually bound (resolves port 0).
    ///
    /// # Errors
    ///
    /// Returns an error if the socket has no local address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Failed to read listener address")
    }

    /// Accept connections until `shutdown` fires.
    ///
    /// # Errors
    ///
    /// Currently never fails; accept errors are logged and retried.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let local = self.local_addr()?;
        log::info!(
            "[Server] Listening on ws://{local} (stream {}, timed {})",
            self.config.stream_path,
            self.config.timed_path
        );

        let mut connections = JoinSet::new();
        let mut next_seq = 0u64;

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = joined {
                        log::error!("[Server] Connection task failed: {e}");
                    }
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let conn_id = connection_id(next_seq);
                        next_seq += 1;
                        connections.spawn(handle_connection(
                            stream,
                            peer,
                            conn_id,
                            Arc::clone(&self.config),
                            shutdown.clone(),
                        ));
                    }
                    Err(e) => {
                        log::error!("[Server] Accept error: {e}");
                        tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                    }
                },
            }
        }

        log::info!("[Server] Shutting down, {} connection(s) open", connections.len());
        while let Some(joined) = connections.join_next().await {
            if let Err(e) = joined {
                log::error!("[Server] Connection task failed: {e}");
            }
        }
        Ok(())
    }
}

/// Connection id: sequence number plus a random suffix.
fn connection_id(seq: u64) -> String {
    let suffix: u16 = rand::random();
    format!("conn:{seq:x}{suffix:04x}")
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    conn_id: String,
    config: Arc<Config>,
    shutdown: CancellationToken,
) {
    let routes = [config.stream_path.as_str(), config.timed_path.as_str()];
    let accepted = tokio::select! {
        () = shutdown.cancelled() => return,
        accepted = ws::accept(stream, &routes) => accepted,
    };
    let (path, writer, reader) = match accepted {
        Ok(accepted) => accepted,
        Err(e) => {
            log::info!("[Server] {conn_id} from {peer} rejected: {e:#}");
            return;
        }
    };

    let mode = if path == config.timed_path {
        Mode::TimeBoxed
    } else {
        Mode::Pipelined
    };
    log::info!("[Server] {conn_id} connected from {peer} on {path} ({mode:?})");

    let summary = Coordinator::new(conn_id.as_str(), &config, shutdown)
        .run(mode, reader, writer)
        .await;

    log::info!(
        "[Server] {conn_id} ended: {} ({} messages, {} frames)",
        summary.end,
        summary.messages_sent,
        summary.frames_sent
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn local_config() -> Config {
        Config {
            addr: "127.0.0.1:0".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn test_connection_ids_are_unique_per_sequence() {
        let a = connection_id(0);
        let b = connection_id(1);
        assert!(a.starts_with("conn:0"), "{a}");
        assert!(b.starts_with("conn:1"), "{b}");
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_bind_port_zero_resolves_address() {
        let server = Server::bind(local_config()).await.unwrap();
        let addr = server.local_addr().unwrap();
        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn test_bind_failure_names_address() {
        let config = Config {
            addr: "not an address".to_string(),
            ..Config::default()
        };
        let err = Server::bind(config).await.unwrap_err();
        assert!(format!("{err:#}").contains("not an address"));
    }

    #[tokio::test]
    async fn test_run_returns_after_shutdown() {
        let server = Server::bind(local_config()).await.unwrap();
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(server.run(shutdown.clone()));

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("Server did not stop")
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_releases_pending_handshake() {
        let server = Server::bind(local_config()).await.unwrap();
        let addr = server.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(server.run(shutdown.clone()));

        // Raw TCP connection that never sends an upgrade request
        let _idle = TcpStream::connect(addr).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("Server did not drain")
            .unwrap()
            .unwrap();
    }
}

//! Accept/serve/reconnect loop.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpSocket};
use tokio::sync::Notify;
use tracing::{error, info};

use crate::config::Settings;
use crate::descriptor::DescriptorStore;
use crate::error::{DaemonError, DaemonResult};
use crate::registry::ControlRegistry;

use super::connection::{serve_session, SessionEnd};

/// The TCP control server.
///
/// Owns the registry and the descriptor store and drives them through the
/// listen → serve → re-listen lifecycle. One peer is served at a time by
/// design: when it disconnects, the listening socket is closed and rebound
/// so the next peer can connect immediately. There is no bound or backoff
/// on that cycle; the daemon assumes a trusted network.
pub struct ControlServer {
    port: u16,
    registry: ControlRegistry,
    store: DescriptorStore,
    /// Set once the first bind succeeded and the descriptor was written;
    /// gates the shutdown-time `running=false` flip.
    prepared: bool,
}

impl ControlServer {
    pub fn new(settings: &Settings) -> Self {
        Self {
            port: settings.socket.port,
            registry: settings.registry(),
            store: DescriptorStore::new(&settings.descriptor.path),
            prepared: false,
        }
    }

    /// Run the server until the shutdown signal fires or a fatal error
    /// occurs.
    ///
    /// On exit the descriptor's `running` record is flipped to `false`,
    /// provided the descriptor was ever written.
    pub async fn run(mut self, shutdown: Arc<Notify>) -> DaemonResult<()> {
        let result = self.serve_loop(&shutdown).await;

        if self.prepared {
            match self.store.set_running(false) {
                Ok(()) => {}
                // Don't let the cleanup failure mask the original error.
                Err(e) if result.is_err() => {
                    error!(error = %e, "Failed to clear running record during shutdown");
                }
                Err(e) => return Err(e),
            }
        }

        info!("Server stopped");
        result
    }

    async fn serve_loop(&mut self, shutdown: &Notify) -> DaemonResult<()> {
        loop {
            let listener = self.bind()?;

            if !self.prepared {
                // The resolved port is fixed for the rest of the process;
                // rebinds after a disconnect reuse it.
                self.port = listener
                    .local_addr()
                    .map_err(|e| DaemonError::Socket {
                        message: format!("Failed to resolve local address: {e}"),
                    })?
                    .port();
                self.store.prepare(&self.registry, self.port)?;
                self.prepared = true;
                info!(port = self.port, "Listening for a peer");
            }

            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = accepted.map_err(|e| DaemonError::Socket {
                        message: format!("Failed to accept connection: {e}"),
                    })?;
                    // Nothing listens while a peer is served: a would-be
                    // second peer is refused instead of sitting in a backlog
                    // that gets reset on rebind.
                    drop(listener);
                    info!(%peer, "Peer connected");

                    match serve_session(stream, peer, &mut self.registry, &self.store, shutdown).await? {
                        SessionEnd::PeerDisconnected => {
                            info!(%peer, "Peer disconnected, re-listening");
                        }
                        SessionEnd::ShutdownRequested => {
                            info!(%peer, "Shutdown requested while serving");
                            return Ok(());
                        }
                    }
                }
                _ = shutdown.notified() => {
                    info!("Shutdown requested while listening");
                    return Ok(());
                }
            }
        }
    }

    /// Bind the listening socket on the configured port (0 = ephemeral).
    ///
    /// `SO_REUSEADDR` keeps the deliberate close-and-rebind reconnect path
    /// from tripping over a lingering socket in TIME_WAIT.
    fn bind(&self) -> DaemonResult<TcpListener> {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port));

        let socket = TcpSocket::new_v4().map_err(|e| DaemonError::Socket {
            message: format!("Failed to create socket: {e}"),
        })?;
        socket.set_reuseaddr(true).map_err(|e| DaemonError::Socket {
            message: format!("Failed to set SO_REUSEADDR: {e}"),
        })?;
        socket.bind(addr).map_err(|e| DaemonError::Socket {
            message: format!("Failed to bind to {addr}: {e}"),
        })?;

        // Single peer at a time.
        socket.listen(1).map_err(|e| DaemonError::Socket {
            message: format!("Failed to listen on {addr}: {e}"),
        })
    }
}

//! Per-connection serving loop.

use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::descriptor::DescriptorStore;
use crate::error::DaemonResult;
use crate::registry::{Control, ControlRegistry, UnknownKind};
use crate::validation::parse_update;

/// Notice written to the peer before an orderly close.
const CLOSING_NOTICE: &[u8] = b"Closing connection!\n";

/// How a serving session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum SessionEnd {
    /// The peer went away (end of stream or connection reset). The server
    /// re-enters the listening state.
    PeerDisconnected,
    /// The shutdown signal fired while serving.
    ShutdownRequested,
}

/// Serve one connected peer until it disconnects or shutdown fires.
///
/// Reads newline-delimited `KEY=VALUE` updates in arrival order. Rejected
/// lines are logged and discarded without dropping the connection. There is
/// no read timeout: a silent peer holds the session open indefinitely, which
/// is accepted for the single-peer, trusted-network use case.
pub(super) async fn serve_session(
    stream: TcpStream,
    peer: SocketAddr,
    registry: &mut ControlRegistry,
    store: &DescriptorStore,
    shutdown: &Notify,
) -> DaemonResult<SessionEnd> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => handle_line(&line, peer, registry, store)?,
                Ok(None) => return Ok(SessionEnd::PeerDisconnected),
                Err(e) if is_disconnect(&e) => {
                    debug!(%peer, error = %e, "Read failed, treating as disconnect");
                    return Ok(SessionEnd::PeerDisconnected);
                }
                Err(e) => return Err(e.into()),
            },
            _ = shutdown.notified() => {
                // Best effort; the peer may already be gone.
                let _ = writer.write_all(CLOSING_NOTICE).await;
                let _ = writer.flush().await;
                return Ok(SessionEnd::ShutdownRequested);
            }
        }
    }
}

/// Process a single protocol line.
///
/// Protocol rejections keep the connection open and mutate nothing; only
/// descriptor I/O failures propagate (and stop the daemon).
fn handle_line(
    line: &str,
    peer: SocketAddr,
    registry: &mut ControlRegistry,
    store: &DescriptorStore,
) -> DaemonResult<()> {
    let update = match parse_update(line) {
        Ok(update) => update,
        Err(reason) => {
            warn!(%peer, line, %reason, "Rejected update");
            return Ok(());
        }
    };

    let applied = match registry.apply(update.kind, &update.value) {
        Ok(applied) => applied,
        Err(UnknownKind(kind)) => {
            // The kind validated, but was not configured for this run.
            warn!(%peer, %kind, "No control of this kind is registered");
            return Ok(());
        }
    };

    store.upsert(&Control::new(applied.kind, applied.new_value.clone()))?;

    info!(
        %peer,
        kind = %applied.kind,
        old = %applied.old_value,
        new = %applied.new_value,
        "Control updated"
    );
    Ok(())
}

/// Classify read errors that mean "the peer went away" as one disconnect
/// outcome, distinct from genuine I/O failures.
fn is_disconnect(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ControlKind;

    use std::fs;
    use tempfile::TempDir;

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    fn setup(dir: &TempDir) -> (ControlRegistry, DescriptorStore) {
        let registry = ControlRegistry::new(vec![
            Control::with_default(ControlKind::Toggle),
            Control::with_default(ControlKind::ColorPicker),
        ]);
        let store = DescriptorStore::new(dir.path().join("pad.service"));
        store.prepare(&registry, 9000).unwrap();
        (registry, store)
    }

    #[test]
    fn test_valid_line_updates_registry_and_file() {
        let dir = TempDir::new().unwrap();
        let (mut registry, store) = setup(&dir);

        handle_line("TOGGLE=true", peer(), &mut registry, &store).unwrap();

        let toggle = registry
            .controls()
            .find(|c| c.kind == ControlKind::Toggle)
            .unwrap();
        assert_eq!(toggle.value, "true");

        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.contains("toggle=true"));
    }

    #[test]
    fn test_rejected_line_mutates_nothing() {
        let dir = TempDir::new().unwrap();
        let (mut registry, store) = setup(&dir);
        let before = fs::read_to_string(store.path()).unwrap();

        for line in ["TOGGLE=<script>", "COLORPICKER=12345", "garbage", "toggle=true"] {
            handle_line(line, peer(), &mut registry, &store).unwrap();
        }

        assert!(registry.controls().all(|c| c.value == c.kind.default_value()));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
    }

    #[test]
    fn test_unregistered_kind_is_kept_open_noop() {
        let dir = TempDir::new().unwrap();
        let (mut registry, store) = setup(&dir);
        let before = fs::read_to_string(store.path()).unwrap();

        // CHECKBOX validates fine but is not configured for this run.
        handle_line("CHECKBOX=true", peer(), &mut registry, &store).unwrap();

        assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
    }

    #[test]
    fn test_disconnect_classification() {
        for kind in [
            io::ErrorKind::ConnectionReset,
            io::ErrorKind::ConnectionAborted,
            io::ErrorKind::BrokenPipe,
            io::ErrorKind::UnexpectedEof,
        ] {
            assert!(is_disconnect(&io::Error::from(kind)));
        }
        assert!(!is_disconnect(&io::Error::from(io::ErrorKind::PermissionDenied)));
    }
}

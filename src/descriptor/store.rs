//! On-disk descriptor store.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info, warn};

use crate::error::{DaemonError, DaemonResult};
use crate::registry::{Control, ControlRegistry};

use super::plan;

/// Avahi service type advertised in a freshly initialized descriptor.
const SERVICE_TYPE: &str = "_http._tcp";

/// Sole owner of the descriptor file's bytes.
///
/// Every operation is a full read, in-memory edit, full rewrite, performed
/// under one mutex so a shutdown-triggered write and an in-flight update
/// never interleave their read-modify-write cycles. Updates arrive at
/// human-interaction rate, so the full rewrite is deliberately simple
/// rather than fast.
///
/// Any I/O failure here is fatal to the daemon: the descriptor is the
/// single source of truth for discovery tooling, and running with a file
/// that no longer reflects reality is worse than stopping.
pub struct DescriptorStore {
    path: PathBuf,
    file_access: Mutex<()>,
}

impl DescriptorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file_access: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bring the descriptor file in line with the registry before serving.
    ///
    /// Creates and fills the file if it does not exist, otherwise reconciles
    /// the existing content against the registry's kind set.
    pub fn prepare(&self, registry: &ControlRegistry, port: u16) -> DaemonResult<()> {
        let _guard = self.file_access.lock().expect("descriptor lock poisoned");

        if self.path.is_file() {
            let old = self.read_lines()?;
            let new = plan::reconcile_lines(&old, registry, port);
            if new != old {
                self.write_lines(&new)?;
                info!(path = %self.path.display(), "Descriptor reconciled");
            } else {
                debug!(path = %self.path.display(), "Descriptor already converged");
            }
        } else {
            let doc = plan::skeleton(registry, port, SERVICE_TYPE);
            fs::write(&self.path, doc).map_err(|e| self.io_error(e))?;
            info!(path = %self.path.display(), port, "Descriptor initialized");
        }

        Ok(())
    }

    /// Rewrite the single record for `control.kind` to its current value.
    ///
    /// Missing records are a warning, not an error: `prepare` ran before
    /// serving started, so the record should always be there.
    pub fn upsert(&self, control: &Control) -> DaemonResult<()> {
        let _guard = self.file_access.lock().expect("descriptor lock poisoned");

        let old = self.read_lines()?;
        let (new, found) = plan::rewrite_record(&old, control.kind, &control.value);
        if !found {
            warn!(
                kind = %control.kind,
                path = %self.path.display(),
                "No descriptor record for control, skipping update"
            );
            return Ok(());
        }
        self.write_lines(&new)
    }

    /// Flip the `running` record.
    pub fn set_running(&self, running: bool) -> DaemonResult<()> {
        let _guard = self.file_access.lock().expect("descriptor lock poisoned");

        let old = self.read_lines()?;
        let new = plan::rewrite_running(&old, running);
        self.write_lines(&new)?;
        info!(running, path = %self.path.display(), "Running record updated");
        Ok(())
    }

    fn read_lines(&self) -> DaemonResult<Vec<String>> {
        let content = fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        Ok(content.lines().map(String::from).collect())
    }

    fn write_lines(&self, lines: &[String]) -> DaemonResult<()> {
        let mut content = lines.join("\n");
        content.push('\n');
        fs::write(&self.path, content).map_err(|e| self.io_error(e))
    }

    fn io_error(&self, source: io::Error) -> DaemonError {
        DaemonError::Descriptor {
            path: self.path.clone(),
            source,
        }
    }
}

//! Bundle resolution via the runtime's own state query.
//!
//! `start` and `exec` invocations carry no `--bundle` flag, only a
//! container id. The authoritative mapping from id to bundle directory
//! lives in the underlying runtime's state, so the shim asks it directly:
//! `<runtime> --root <root> state <id>` prints an OCI state document whose
//! `bundle` field names the directory.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

/// OCI runtime state document, reduced to what the shim reads.
#[derive(Debug, Deserialize)]
struct OciState {
    bundle: PathBuf,
}

/// Maps a container id to its bundle directory.
///
/// Injected into the pipeline so tests can substitute a fixed mapping for
/// the real subprocess call.
pub trait BundleLocator {
    /// Resolves the bundle directory for `container_id`, consulting the
    /// runtime state root `root` when given.
    fn bundle_dir(&self, root: Option<&str>, container_id: &str) -> Result<PathBuf>;
}

/// Production locator: synchronous `state` subprocess against the real
/// runtime binary.
pub struct StateQueryLocator {
    runtime: PathBuf,
}

impl StateQueryLocator {
    /// Creates a locator for an already-resolved runtime executable.
    pub fn new(runtime: impl Into<PathBuf>) -> Self {
        Self {
            runtime: runtime.into(),
        }
    }
}

impl BundleLocator for StateQueryLocator {
    fn bundle_dir(&self, root: Option<&str>, container_id: &str) -> Result<PathBuf> {
        let mut cmd = Command::new(&self.runtime);
        if let Some(root) = root {
            cmd.arg("--root").arg(root);
        }
        cmd.arg("state").arg(container_id);
        debug!(runtime = %self.runtime.display(), container_id, "querying runtime state");

        let output = cmd.output().map_err(|e| Error::BundleResolution {
            container_id: container_id.to_string(),
            reason: format!("failed to run {}: {e}", self.runtime.display()),
            stderr: String::new(),
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(Error::BundleResolution {
                container_id: container_id.to_string(),
                reason: format!("state query exited with {}", output.status),
                stderr,
            });
        }

        let state: OciState =
            serde_json::from_slice(&output.stdout).map_err(|e| Error::BundleResolution {
                container_id: container_id.to_string(),
                reason: format!("unparseable state output: {e}"),
                stderr,
            })?;
        debug!(bundle = %state.bundle.display(), container_id, "bundle resolved");
        Ok(state.bundle)
    }
}

/// Fixed-directory locator, mostly useful in tests but also a valid
/// [`BundleLocator`] wherever the bundle directory is already known.
pub struct FixedLocator {
    dir: PathBuf,
}

impl FixedLocator {
    /// Creates a locator that always answers with `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl BundleLocator for FixedLocator {
    fn bundle_dir(&self, _root: Option<&str>, _container_id: &str) -> Result<PathBuf> {
        Ok(self.dir.clone())
    }
}

impl<T: BundleLocator + ?Sized> BundleLocator for &T {
    fn bundle_dir(&self, root: Option<&str>, container_id: &str) -> Result<PathBuf> {
        (*self).bundle_dir(root, container_id)
    }
}

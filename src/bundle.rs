//! OCI bundle access.
//!
//! A bundle is a directory holding a container's rootfs and its runtime
//! spec (`config.json`). The shim only understands two corners of that
//! document - the `annotations` map and `process.user.additionalGids` -
//! but it must round-trip everything else untouched, so the spec types
//! flatten all unrecognized fields into opaque maps instead of dropping
//! them.

use crate::config::Config;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Spec file name inside a bundle directory.
pub const SPEC_FILE_NAME: &str = "config.json";

// =============================================================================
// OCI Spec Types (known corner + opaque rest)
// =============================================================================

/// OCI runtime spec document.
///
/// Mirrors the field presence rules of the upstream Go types: `annotations`
/// and `process` are omitted when absent, `user` inside a process is always
/// emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spec {
    /// CRI-provided annotations (pod namespace/name, container type, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<HashMap<String, String>>,

    /// The container process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<Process>,

    /// Everything this shim does not interpret, preserved verbatim.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// OCI process object, also the shape of a standalone exec process file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Process {
    /// Process credentials.
    #[serde(default)]
    pub user: User,

    /// Unrecognized process fields, preserved verbatim.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// OCI process user credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    /// User id.
    #[serde(default)]
    pub uid: u32,

    /// Primary group id.
    #[serde(default)]
    pub gid: u32,

    /// Supplementary group ids. Omitted when empty, matching the upstream
    /// `omitempty` convention.
    #[serde(
        default,
        rename = "additionalGids",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub additional_gids: Vec<u32>,

    /// Unrecognized user fields (e.g. `umask`), preserved verbatim.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

// =============================================================================
// Container Identity
// =============================================================================

/// Pod and container identity derived from bundle annotations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    /// Namespace of the owning pod.
    pub pod_namespace: String,
    /// Name of the owning pod.
    pub pod_name: String,
    /// Container name, if the CRI annotated it (cosmetic, logging only).
    pub container_name: Option<String>,
    /// Container type, if annotated. `sandbox` marks the infra container.
    pub container_type: Option<String>,
}

impl ContainerInfo {
    /// Whether this is the pod's infra (pause) container. Sandbox
    /// containers are never user workloads and bypass enforcement.
    pub fn is_sandbox(&self) -> bool {
        self.container_type.as_deref() == Some("sandbox")
    }
}

// =============================================================================
// Bundle
// =============================================================================

/// An on-disk OCI bundle with its spec loaded.
#[derive(Debug, Clone)]
pub struct Bundle {
    /// Bundle directory.
    pub dir: PathBuf,
    /// Parsed spec document.
    pub spec: Spec,
}

impl Bundle {
    /// Loads `config.json` from a bundle directory.
    pub fn load(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let path = dir.join(SPEC_FILE_NAME);
        let raw = fs::read(&path).map_err(|e| Error::SpecLoad {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let spec: Spec = serde_json::from_slice(&raw).map_err(|e| Error::SpecLoad {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        debug!(dir = %dir.display(), "OCI spec loaded");
        Ok(Self { dir, spec })
    }

    /// Writes the spec back to `config.json`, overwriting it.
    pub fn save(&self) -> Result<()> {
        let path = self.spec_path();
        let raw = serde_json::to_vec(&self.spec).map_err(|e| Error::SpecSave {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        fs::write(&path, raw).map_err(|e| Error::SpecSave {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        debug!(dir = %self.dir.display(), "OCI spec updated");
        Ok(())
    }

    /// Path of the spec file inside the bundle.
    pub fn spec_path(&self) -> PathBuf {
        self.dir.join(SPEC_FILE_NAME)
    }

    /// Resolves pod and container identity from the configured annotation
    /// keys.
    ///
    /// Pod namespace and name are mandatory: without them the owning pod
    /// cannot be fetched, so a miss is fatal. Container name and type are
    /// cosmetic / advisory; a miss is logged and tolerated unless
    /// `strict-annotations` is enabled.
    pub fn container_info(&self, cfg: &Config) -> Result<ContainerInfo> {
        let pod_namespace = self.mandatory_annotation(&cfg.pod_namespace_annotation)?;
        let pod_name = self.mandatory_annotation(&cfg.pod_name_annotation)?;

        let container_name =
            self.optional_annotation(&cfg.container_name_annotation, cfg.strict_annotations)?;
        let container_type =
            self.optional_annotation(&cfg.container_type_annotation, cfg.strict_annotations)?;

        Ok(ContainerInfo {
            pod_namespace,
            pod_name,
            container_name,
            container_type,
        })
    }

    fn annotation(&self, key: &str) -> Option<String> {
        self.spec
            .annotations
            .as_ref()
            .and_then(|a| a.get(key))
            .filter(|v| !v.is_empty())
            .cloned()
    }

    fn mandatory_annotation(&self, key: &str) -> Result<String> {
        self.annotation(key).ok_or_else(|| {
            Error::PodIdentity(format!(
                "annotation '{key}' not found or empty in {}",
                self.spec_path().display()
            ))
        })
    }

    fn optional_annotation(&self, key: &str, strict: bool) -> Result<Option<String>> {
        match self.annotation(key) {
            Some(v) => Ok(Some(v)),
            None if strict => Err(Error::PodIdentity(format!(
                "annotation '{key}' not found or empty (strict-annotations enabled)"
            ))),
            None => {
                warn!(
                    bundle = %self.dir.display(),
                    annotation = key,
                    "annotation not found in OCI spec, continuing without it"
                );
                Ok(None)
            }
        }
    }
}

// =============================================================================
// Standalone process files (exec)
// =============================================================================

/// Loads a standalone process spec file, as passed to `exec --process`.
pub fn load_process(path: &Path) -> Result<Process> {
    let raw = fs::read(path).map_err(|e| Error::SpecLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_json::from_slice(&raw).map_err(|e| Error::SpecLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Writes a standalone process spec file back in place.
pub fn save_process(path: &Path, process: &Process) -> Result<()> {
    let raw = serde_json::to_vec(process).map_err(|e| Error::SpecSave {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    fs::write(path, raw).map_err(|e| Error::SpecSave {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

//! Error types for the enforcement shim.

use std::path::PathBuf;

/// Result type alias for shim operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while enforcing supplemental groups.
///
/// Every variant is fatal to the current invocation: the shim aborts before
/// delegation so the container lifecycle operation fails closed. Non-fatal
/// conditions (missing cosmetic annotations) are logged as warnings instead
/// of surfacing here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // =========================================================================
    // Invocation Errors
    // =========================================================================
    /// Malformed runtime command line (a recognized flag without its value).
    #[error("invalid runtime arguments: {0}")]
    ArgParse(String),

    // =========================================================================
    // Bundle Errors
    // =========================================================================
    /// Bundle spec (config.json) could not be read or parsed.
    #[error("failed to load OCI spec from {path}: {reason}")]
    SpecLoad { path: PathBuf, reason: String },

    /// Bundle spec (config.json) could not be written back.
    #[error("failed to save OCI spec to {path}: {reason}")]
    SpecSave { path: PathBuf, reason: String },

    /// The underlying runtime's state query failed or returned garbage.
    #[error("failed to resolve bundle for container '{container_id}': {reason} (stderr: {stderr})")]
    BundleResolution {
        container_id: String,
        reason: String,
        stderr: String,
    },

    /// A mandatory pod-identity annotation is missing from the bundle.
    #[error("failed to resolve pod identity: {0}")]
    PodIdentity(String),

    // =========================================================================
    // Pod Accessor Errors
    // =========================================================================
    /// The kubelet does not know the pod.
    #[error("pod not found: {namespace}/{name}")]
    PodNotFound { namespace: String, name: String },

    /// The kubelet could not be reached or answered unusably.
    #[error("kubelet request failed: {0}")]
    KubeletTransport(String),

    // =========================================================================
    // Delegation Errors
    // =========================================================================
    /// The underlying runtime binary was not found on PATH.
    #[error("runtime executable not found: {0}")]
    RuntimeNotFound(String),

    /// execve(2) into the underlying runtime failed.
    #[error("failed to exec '{path}': {reason}")]
    Delegation { path: PathBuf, reason: String },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Config file invalid or unreadable.
    #[error("configuration error: {0}")]
    Config(String),

    // =========================================================================
    // I/O Errors
    // =========================================================================
    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

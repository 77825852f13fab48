//! Delegation to the underlying runtime.
//!
//! The shim's last act is to replace its own process image with the real
//! runtime via execve(2), handing over the original argument vector
//! unmodified. On success the shim ceases to exist; all spec mutation was
//! already persisted before this point, so nothing needs cleanup.

use crate::error::{Error, Result};
use std::convert::Infallible;
use std::ffi::CString;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::trace;

/// PATH fallback when the environment carries none, matching the
/// conventional system layout CRI daemons run under.
const DEFAULT_PATH: &[&str] = &[
    "/usr/local/sbin",
    "/usr/local/bin",
    "/usr/sbin",
    "/usr/bin",
    "/sbin",
    "/bin",
];

/// Resolves the underlying runtime binary to an executable path.
///
/// A name containing a path separator is checked directly; a bare name is
/// searched on `PATH` (or [`DEFAULT_PATH`] when `PATH` is unset or empty).
pub fn lookup_executable(name: &str) -> Result<PathBuf> {
    if name.contains('/') {
        let path = PathBuf::from(name);
        if is_executable(&path) {
            return Ok(path);
        }
        return Err(Error::RuntimeNotFound(name.to_string()));
    }

    let search_path = std::env::var("PATH").ok().filter(|p| !p.is_empty());
    let dirs: Vec<PathBuf> = match &search_path {
        Some(p) => std::env::split_paths(p).collect(),
        None => DEFAULT_PATH.iter().map(PathBuf::from).collect(),
    };

    for dir in dirs {
        let candidate = dir.join(name);
        if is_executable(&candidate) {
            return Ok(candidate);
        }
    }
    Err(Error::RuntimeNotFound(name.to_string()))
}

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Replaces the current process image with `runtime`, passing `args[1..]`
/// through verbatim (`args[0]` becomes the resolved runtime path).
///
/// Returns only on failure; the `Infallible` success type documents the
/// one-way transfer.
pub fn exec_into(runtime: &Path, args: &[String]) -> Result<Infallible> {
    let program = CString::new(runtime.as_os_str().as_encoded_bytes()).map_err(|e| {
        Error::Delegation {
            path: runtime.to_path_buf(),
            reason: format!("path contains NUL: {e}"),
        }
    })?;

    let mut argv = Vec::with_capacity(args.len().max(1));
    argv.push(program.clone());
    for arg in args.iter().skip(1) {
        argv.push(CString::new(arg.as_str()).map_err(|e| Error::Delegation {
            path: runtime.to_path_buf(),
            reason: format!("argument contains NUL: {e}"),
        })?);
    }

    trace!(runtime = %runtime.display(), "executing execve(2)");
    // execv inherits the current environment; returns only on error.
    match nix::unistd::execv(&program, &argv) {
        Ok(infallible) => match infallible {},
        Err(errno) => Err(Error::Delegation {
            path: runtime.to_path_buf(),
            reason: errno.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_finds_sh() {
        let path = lookup_executable("sh").unwrap();
        assert!(path.is_absolute());
        assert!(is_executable(&path));
    }

    #[test]
    fn test_lookup_missing_binary() {
        let err = lookup_executable("definitely-not-a-runtime-binary").unwrap_err();
        assert!(matches!(err, Error::RuntimeNotFound(_)));
    }

    #[test]
    fn test_lookup_direct_path() {
        assert!(lookup_executable("/bin/sh").is_ok() || lookup_executable("/usr/bin/sh").is_ok());
        assert!(lookup_executable("/nonexistent/sh").is_err());
    }
}

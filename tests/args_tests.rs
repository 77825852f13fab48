//! Tests for OCI runtime command-line classification.
//!
//! The shim must recognize its small flag subset while silently tolerating
//! every other flag the real runtime accepts, and must classify the
//! command from the first positional and the container id from the last.

use gidgate::{Invocation, RuntimeCommand};
use std::path::PathBuf;

fn argv(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|t| t.to_string()).collect()
}

// =============================================================================
// Full Invocation Classification
// =============================================================================

#[test]
fn test_create_invocation_is_fully_classified() {
    let inv = Invocation::parse(&argv(&[
        "gidgate",
        "--root",
        "/run/containerd/runc/k8s.io",
        "--log",
        "/var/log/ctr.log",
        "--log-format",
        "json",
        "create",
        "--bundle",
        "/run/containerd/bundle",
        "--pid-file",
        "/run/ctr.pid",
        "ctr-1",
    ]))
    .unwrap();

    assert_eq!(inv.command, RuntimeCommand::Create);
    assert_eq!(inv.container_id.as_deref(), Some("ctr-1"));
    assert_eq!(inv.options.root.as_deref(), Some("/run/containerd/runc/k8s.io"));
    assert_eq!(inv.options.log, Some(PathBuf::from("/var/log/ctr.log")));
    assert_eq!(inv.options.log_format.as_deref(), Some("json"));
    assert_eq!(inv.options.bundle, Some(PathBuf::from("/run/containerd/bundle")));
    assert_eq!(inv.options.pid_file, Some(PathBuf::from("/run/ctr.pid")));
}

#[test]
fn test_exec_invocation_with_process_file() {
    let inv = Invocation::parse(&argv(&[
        "gidgate",
        "--root",
        "/run/runc",
        "exec",
        "--process",
        "/tmp/process-1.json",
        "--detach",
        "ctr-2",
    ]))
    .unwrap();

    assert_eq!(inv.command, RuntimeCommand::Exec);
    assert_eq!(inv.container_id.as_deref(), Some("ctr-2"));
    assert_eq!(inv.options.process, Some(PathBuf::from("/tmp/process-1.json")));
}

#[test]
fn test_short_flags() {
    let inv = Invocation::parse(&argv(&["gidgate", "create", "-b", "/b", "ctr"])).unwrap();
    assert_eq!(inv.options.bundle, Some(PathBuf::from("/b")));

    let inv = Invocation::parse(&argv(&["gidgate", "exec", "-p", "/p.json", "ctr"])).unwrap();
    assert_eq!(inv.options.process, Some(PathBuf::from("/p.json")));
}

// =============================================================================
// Degenerate / Passthrough Shapes
// =============================================================================

#[test]
fn test_bare_program_name_is_other() {
    let inv = Invocation::parse(&argv(&["gidgate"])).unwrap();
    assert_eq!(inv.command, RuntimeCommand::Other);
    assert_eq!(inv.container_id, None);
}

#[test]
fn test_two_positionals_stay_unclassified() {
    // "gidgate create" alone has no container id, so nothing is set.
    let inv = Invocation::parse(&argv(&["gidgate", "create"])).unwrap();
    assert_eq!(inv.command, RuntimeCommand::Other);
    assert_eq!(inv.container_id, None);
}

#[test]
fn test_unknown_command_maps_to_other() {
    let inv = Invocation::parse(&argv(&["gidgate", "delete", "--force", "ctr-3"])).unwrap();
    assert_eq!(inv.command, RuntimeCommand::Other);
    assert_eq!(inv.container_id.as_deref(), Some("ctr-3"));
}

// =============================================================================
// Unknown Flag Tolerance
// =============================================================================

#[test]
fn test_unknown_flags_are_ignored() {
    let inv = Invocation::parse(&argv(&[
        "gidgate",
        "--systemd-cgroup",
        "--debug",
        "create",
        "--bundle",
        "/b",
        "--no-pivot",
        "ctr-4",
    ]))
    .unwrap();

    assert_eq!(inv.command, RuntimeCommand::Create);
    assert_eq!(inv.container_id.as_deref(), Some("ctr-4"));
    assert_eq!(inv.options.bundle, Some(PathBuf::from("/b")));
}

#[test]
fn test_unknown_flag_with_value_keeps_id_last() {
    // "--criu /usr/bin/criu" is unknown; its value falls through as a
    // positional, but the container id is still the last non-flag token.
    let inv = Invocation::parse(&argv(&[
        "gidgate",
        "create",
        "--criu",
        "/usr/bin/criu",
        "--bundle",
        "/b",
        "ctr-5",
    ]))
    .unwrap();

    assert_eq!(inv.command, RuntimeCommand::Create);
    assert_eq!(inv.container_id.as_deref(), Some("ctr-5"));
}

#[test]
fn test_recognized_flag_without_value_is_an_error() {
    assert!(Invocation::parse(&argv(&["gidgate", "create", "ctr", "--pid-file"])).is_err());
}

//! Supplemental-group enforcement.
//!
//! The invariant this crate exists to guarantee: after enforcement,
//!
//! ```text
//! process.user.additionalGids ⊆ (pod.supplementalGroups ∪ {pod.fsGroup})
//! ```
//!
//! holds for every non-sandbox container. Group ids requested by the
//! container image but not authorized by the pod's security context are
//! pruned; authorized ids are kept. When nothing violates, the process
//! spec is left byte-identical so callers can skip the write entirely.

use crate::bundle::Process;
use crate::kubelet::Pod;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// A set of group ids. Value-based, unordered membership; `BTreeSet` keeps
/// iteration (and thus the rewritten gid list) deterministic.
pub type GidSet = BTreeSet<i64>;

/// Outcome of one enforcement pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnforcementResult {
    /// Whether the process spec was mutated. Callers persist the spec only
    /// when this is set, avoiding needless writes and log noise.
    pub enforced: bool,
    /// The gids that survived, in ascending order.
    pub kept: Vec<u32>,
    /// The gids that were pruned, for audit logging.
    pub violated: Vec<i64>,
}

/// Collects the pod-authorized gid set: `supplementalGroups ∪ {fsGroup}`.
///
/// A pod without a security context authorizes nothing.
pub fn allowed_gids(pod: &Pod) -> GidSet {
    let mut allowed = GidSet::new();
    if let Some(sc) = &pod.spec.security_context {
        allowed.extend(sc.supplemental_groups.iter().copied());
        if let Some(fs_group) = sc.fs_group {
            allowed.insert(fs_group);
        }
    }
    allowed
}

/// Partitions requested gids against the allowed set.
///
/// Pure set logic, no I/O: `kept = requested ∩ allowed`,
/// `violated = requested \ allowed`. `enforced` is true only when
/// something was violated - an empty request can never violate.
pub fn check_gids(requested: &[u32], allowed: &GidSet) -> EnforcementResult {
    let requested: GidSet = requested.iter().map(|g| i64::from(*g)).collect();

    let mut kept = Vec::new();
    let mut violated = Vec::new();
    for gid in &requested {
        if allowed.contains(gid) {
            kept.push(*gid as u32);
        } else {
            violated.push(*gid);
        }
    }

    EnforcementResult {
        enforced: !violated.is_empty(),
        kept,
        violated,
    }
}

/// Enforces the invariant on a process spec against a pod.
///
/// Mutates `process.user.additionalGids` only when a violation exists and
/// reports what happened. Idempotent: re-running against the same pod
/// yields `enforced == false`.
pub fn enforce_process(process: &mut Process, pod: &Pod) -> EnforcementResult {
    let allowed = allowed_gids(pod);
    debug!(?allowed, requested = ?process.user.additional_gids, "checking additional gids");

    let result = check_gids(&process.user.additional_gids, &allowed);
    if result.enforced {
        info!(
            violated = ?result.violated,
            kept = ?result.kept,
            ?allowed,
            "dropping gids present in additionalGids but not authorized by the pod"
        );
        process.user.additional_gids = result.kept.clone();
    } else {
        info!(requested = ?process.user.additional_gids, ?allowed, "no gid violation, spec untouched");
    }
    result
}

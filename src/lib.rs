//! # gidgate
//!
//! **Strict supplemental-group enforcement shim for OCI container runtimes**
//!
//! gidgate sits between a CRI implementation (containerd, cri-o) and the
//! low-level OCI runtime (runc, crun), posing as the runtime binary. Before
//! delegating each invocation it guarantees that the container process can
//! never carry supplementary group ids beyond what the owning Kubernetes
//! pod explicitly authorized:
//!
//! ```text
//! process.user.additionalGids ⊆ (pod.supplementalGroups ∪ {pod.fsGroup})
//! ```
//!
//! Without this, a container image can declare a user belonging to extra
//! groups baked into its `/etc/group`, silently gaining access the pod
//! author never granted.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          gidgate                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │ argv ──► Invocation classifier (args)                       │
//! │             │ create          │ start/exec     │ other      │
//! │             ▼                 ▼                │            │
//! │       --bundle dir     `runtime state <id>`    │            │
//! │             │          (resolver)              │            │
//! │             ▼                 │                │            │
//! │       Bundle spec ◄───────────┘                │            │
//! │             │ annotations                      │            │
//! │             ▼                                  │            │
//! │       Container identity ── sandbox? ──────────┤            │
//! │             │                                  │            │
//! │             ▼                                  │            │
//! │       Kubelet GET /pods (kubelet)              │            │
//! │             │                                  │            │
//! │             ▼                                  │            │
//! │       Group enforcer (enforce) ── save iff mutated          │
//! │             │                                  │            │
//! │             ▼                                  ▼            │
//! │       execve(2) into the real runtime (delegate)            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Invocation Model
//!
//! Each invocation is a short-lived, single-threaded, synchronous process.
//! No state survives between invocations; bundle directory and cluster are
//! re-read every time. The process ends either in `execve(2)` (normal) or
//! a non-zero exit before delegation (fail closed).
//!
//! # Security Properties
//!
//! - **Fail closed**: any failure to determine the authorized gid set
//!   (unreachable kubelet, unknown pod, missing mandatory annotations)
//!   aborts the lifecycle operation instead of delegating unchecked.
//! - **Narrow mutation**: only `process.user.additionalGids` is ever
//!   rewritten; the rest of the spec round-trips untouched.
//! - **Sandbox bypass**: infra (pause) containers are never user workloads
//!   and are exempted.
//! - **No caching**: the pod is fetched fresh per invocation because
//!   admission can mutate it between `create` and a later `exec`.

pub mod args;
pub mod bundle;
pub mod config;
pub mod delegate;
pub mod enforce;
pub mod error;
pub mod kubelet;
pub mod resolver;
pub mod runtime;

// Re-exports
pub use args::{Invocation, InvocationOpts, RuntimeCommand};
pub use bundle::{Bundle, ContainerInfo, Process, Spec, User};
pub use config::{Config, LogConfig, LogFormat};
pub use enforce::{EnforcementResult, GidSet};
pub use error::{Error, Result};
pub use kubelet::{KubeletClient, Pod, PodSecurityContext, PodSource, PodSpec};
pub use resolver::{BundleLocator, FixedLocator, StateQueryLocator};
pub use runtime::StrictGidRuntime;

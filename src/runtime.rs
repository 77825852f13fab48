//! The enforcement pipeline.
//!
//! One invocation runs a single-pass, synchronous pipeline:
//!
//! ```text
//! classify → (bundle | resolve) → identity → pod fetch → enforce → persist → delegate
//! ```
//!
//! `create` mutates the bundle spec in place, `start` first recovers the
//! bundle through the runtime's state query, `exec` mutates the standalone
//! process file instead, and everything else passes straight through. Any
//! fatal error aborts before delegation so the lifecycle operation fails
//! closed rather than launching with unchecked group memberships.

use crate::args::{Invocation, RuntimeCommand};
use crate::bundle::{self, Bundle, ContainerInfo};
use crate::config::Config;
use crate::delegate;
use crate::enforce;
use crate::error::{Error, Result};
use crate::kubelet::PodSource;
use crate::resolver::BundleLocator;
use std::convert::Infallible;
use tracing::{debug, info, info_span};

/// The enforcement shim, generic over its two injected collaborators.
///
/// Production wires in [`crate::kubelet::KubeletClient`] and
/// [`crate::resolver::StateQueryLocator`]; tests substitute fakes.
pub struct StrictGidRuntime<P: PodSource, L: BundleLocator> {
    cfg: Config,
    pods: P,
    locator: L,
}

impl<P: PodSource, L: BundleLocator> StrictGidRuntime<P, L> {
    /// Assembles the pipeline.
    pub fn new(cfg: Config, pods: P, locator: L) -> Self {
        Self { cfg, pods, locator }
    }

    /// Runs the full pipeline for a raw argument vector and, when
    /// enforcement succeeded (or was not applicable), replaces the current
    /// process with the underlying runtime.
    ///
    /// Returns only on a fatal error.
    pub fn run(&self, args: &[String]) -> Result<Infallible> {
        debug!(?args, "container runtime command invoked");
        let invocation = Invocation::parse(args)?;
        self.enforce(&invocation)?;

        let runtime = delegate::lookup_executable(&self.cfg.runtime)?;
        delegate::exec_into(&runtime, args)
    }

    /// Runs classification-dependent enforcement without delegating.
    ///
    /// Split from [`StrictGidRuntime::run`] so the mutation pipeline is
    /// exercisable in-process.
    pub fn enforce(&self, invocation: &Invocation) -> Result<()> {
        // The per-container log file the CRI asked the runtime to use is
        // carried in the trace context so operators can correlate shim
        // decisions with the container's own runtime log.
        let span = info_span!(
            "invocation",
            command = %invocation.command,
            container_id = invocation.container_id.as_deref().unwrap_or(""),
            container_log = ?invocation.options.log,
        );
        let _entered = span.enter();
        debug!(?invocation, "runtime arguments classified");

        match invocation.command {
            RuntimeCommand::Create => self.enforce_create(invocation),
            RuntimeCommand::Start => self.enforce_start(invocation),
            RuntimeCommand::Exec => self.enforce_exec(invocation),
            RuntimeCommand::Other => {
                info!("command needs no enforcement, passing through");
                Ok(())
            }
        }
    }

    fn enforce_create(&self, invocation: &Invocation) -> Result<()> {
        let dir = invocation
            .options
            .bundle
            .as_deref()
            .ok_or_else(|| Error::ArgParse("create invocation carries no --bundle".to_string()))?;
        let bundle = Bundle::load(dir)?;
        self.enforce_bundle(bundle)
    }

    fn enforce_start(&self, invocation: &Invocation) -> Result<()> {
        let bundle = self.resolve_bundle(invocation)?;
        self.enforce_bundle(bundle)
    }

    /// `exec` reads its process spec from a standalone file; the bundle is
    /// only consulted for identity.
    fn enforce_exec(&self, invocation: &Invocation) -> Result<()> {
        let bundle = self.resolve_bundle(invocation)?;
        let Some(info) = self.identify(&bundle)? else {
            return Ok(());
        };

        let process_path = invocation.options.process.as_deref().ok_or_else(|| {
            Error::ArgParse("exec invocation carries no --process".to_string())
        })?;
        let mut process = bundle::load_process(process_path)?;

        let pod = self.pods.pod(&info.pod_namespace, &info.pod_name)?;
        let result = enforce::enforce_process(&mut process, &pod);
        if result.enforced {
            bundle::save_process(process_path, &process)?;
            info!(process_file = %process_path.display(), "supplemental groups enforced on process spec");
        }
        Ok(())
    }

    /// Shared tail for `create` and `start`: identify, fetch pod, enforce
    /// on the bundle's process spec, save only when something changed.
    fn enforce_bundle(&self, mut bundle: Bundle) -> Result<()> {
        let Some(info) = self.identify(&bundle)? else {
            return Ok(());
        };

        let pod = self.pods.pod(&info.pod_namespace, &info.pod_name)?;
        let process = bundle.spec.process.get_or_insert_with(Default::default);
        let result = enforce::enforce_process(process, &pod);
        if result.enforced {
            bundle.save()?;
            info!(bundle = %bundle.dir.display(), "supplemental groups enforced on bundle spec");
        }
        Ok(())
    }

    /// Resolves container identity; `Ok(None)` means sandbox short-circuit.
    fn identify(&self, bundle: &Bundle) -> Result<Option<ContainerInfo>> {
        let info = bundle.container_info(&self.cfg)?;
        info!(
            pod_namespace = %info.pod_namespace,
            pod_name = %info.pod_name,
            container = info.container_name.as_deref().unwrap_or(""),
            container_type = info.container_type.as_deref().unwrap_or(""),
            "container info loaded"
        );

        if info.is_sandbox() {
            info!("sandbox container, skipping supplemental group enforcement");
            return Ok(None);
        }
        Ok(Some(info))
    }

    fn resolve_bundle(&self, invocation: &Invocation) -> Result<Bundle> {
        let container_id = invocation
            .container_id
            .as_deref()
            .ok_or_else(|| Error::ArgParse("invocation carries no container id".to_string()))?;
        let dir = self
            .locator
            .bundle_dir(invocation.options.root.as_deref(), container_id)?;
        Bundle::load(dir)
    }
}

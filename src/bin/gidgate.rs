//! gidgate - strict supplemental-group enforcement runtime shim.
//!
//! Installed in place of the low-level OCI runtime (point the CRI runtime
//! handler at this binary). Each invocation enforces the pod's authorized
//! supplementary gid set on the container's spec, then execs into the real
//! runtime with the original arguments. On any fatal error the process
//! exits non-zero before delegation, so the lifecycle operation fails
//! closed.

use std::fs::OpenOptions;
use std::process::ExitCode;
use std::sync::Arc;

use gidgate::{
    Config, KubeletClient, LogFormat, StateQueryLocator, StrictGidRuntime, delegate,
};
use tracing::{debug, error, info};

fn main() -> ExitCode {
    let cfg = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("gidgate: failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&cfg) {
        eprintln!("gidgate: failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    // A panic must still leave a trace in the shim log before the CRI sees
    // the non-zero exit.
    std::panic::set_hook(Box::new(|info| {
        error!(%info, "panic");
    }));

    let execution = uuid::Uuid::new_v4();
    let span = tracing::info_span!("execution", id = %execution);
    let _entered = span.enter();

    info!(version = env!("CARGO_PKG_VERSION"), "execution start");
    debug!(?cfg, "config loaded");

    match run(cfg) {
        Ok(never) => match never {},
        Err(e) => {
            error!(error = %e, "failed to run container runtime shim");
            ExitCode::FAILURE
        }
    }
}

fn run(cfg: Config) -> gidgate::Result<std::convert::Infallible> {
    // Resolve the delegate runtime up front: a missing binary should fail
    // fast, before any state query or spec mutation.
    let runtime_path = delegate::lookup_executable(&cfg.runtime)?;
    let locator = StateQueryLocator::new(&runtime_path);
    let kubelet = KubeletClient::new(&cfg)?;

    let shim = StrictGidRuntime::new(cfg, kubelet, locator);
    let args: Vec<String> = std::env::args().collect();
    shim.run(&args)
}

/// Installs the global tracing subscriber writing to the configured log
/// file in the configured format.
fn init_logging(cfg: &Config) -> std::io::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&cfg.logging.log_file)?;
    let writer = Arc::new(file);

    let builder = tracing_subscriber::fmt()
        .with_max_level(cfg.log_level())
        .with_writer(writer)
        .with_ansi(false);

    match cfg.logging.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
    Ok(())
}

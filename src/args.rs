//! OCI runtime command-line classification.
//!
//! The shim is invoked by the CRI with the exact argument vector intended
//! for the real runtime (runc, crun, ...). Only a handful of flags matter
//! here; everything else must be tolerated and passed through untouched.
//! A strict CLI parser is therefore the wrong tool - this module scans the
//! vector by hand, consuming values only for the flags it recognizes.
//!
//! Positional layout after flag extraction follows the OCI runtime CLI
//! convention: `argv[0]` is the program itself, the first remaining
//! positional is the command name and the last one is the container id.

use crate::error::{Error, Result};
use std::path::PathBuf;

/// OCI runtime commands the shim acts on.
///
/// Everything that is not `create`, `start` or `exec` is classified as
/// [`RuntimeCommand::Other`] and passed through without touching any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeCommand {
    /// `create <id>` - bundle named by `--bundle`, spec mutated in place.
    Create,
    /// `start <id>` - bundle recovered via the runtime's state query.
    Start,
    /// `exec <id>` - process spec lives in the file named by `--process`.
    Exec,
    /// Any other (or absent) command - pure passthrough.
    #[default]
    Other,
}

impl RuntimeCommand {
    fn from_name(name: &str) -> Self {
        match name {
            "create" => Self::Create,
            "start" => Self::Start,
            "exec" => Self::Exec,
            _ => Self::Other,
        }
    }
}

impl std::fmt::Display for RuntimeCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Start => write!(f, "start"),
            Self::Exec => write!(f, "exec"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// The subset of runtime flags the shim recognizes.
///
/// All fields are optional; absence simply means the CRI did not pass the
/// flag on this invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationOpts {
    /// `--root` - runtime state root directory.
    pub root: Option<String>,
    /// `--log` - per-container log file.
    pub log: Option<PathBuf>,
    /// `--log-format` - per-container log format (`json` or `text`).
    pub log_format: Option<String>,
    /// `--pid-file` - where the runtime writes the container pid.
    pub pid_file: Option<PathBuf>,
    /// `--bundle` / `-b` - bundle directory (create only).
    pub bundle: Option<PathBuf>,
    /// `--process` / `-p` - standalone process spec file (exec only).
    pub process: Option<PathBuf>,
}

/// A classified runtime invocation.
///
/// Built once per process run from `argv` and immutable afterwards. The
/// original vector is kept by the caller for delegation; this struct only
/// carries the derived view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    /// The classified command.
    pub command: RuntimeCommand,
    /// The container id (last positional), if enough positionals were given.
    pub container_id: Option<String>,
    /// Recognized flag values.
    pub options: InvocationOpts,
}

impl Invocation {
    /// Classifies a raw argument vector as received from the CRI.
    ///
    /// Unrecognized flags are skipped, never an error. A recognized flag at
    /// the end of the vector with no value is malformed and fails with
    /// [`Error::ArgParse`]. Fewer than three positional tokens (program,
    /// command, container id) classify the invocation as
    /// [`RuntimeCommand::Other`] with no container id.
    pub fn parse(args: &[String]) -> Result<Self> {
        let mut opts = InvocationOpts::default();
        let mut positionals: Vec<&str> = Vec::new();

        let mut iter = args.iter();
        while let Some(raw) = iter.next() {
            let (flag, inline_value) = match raw.split_once('=') {
                Some((f, v)) if f.starts_with('-') => (f, Some(v.to_string())),
                _ => (raw.as_str(), None),
            };

            let target = match flag {
                "--root" => Some(Recognized::Root),
                "--log" => Some(Recognized::Log),
                "--log-format" => Some(Recognized::LogFormat),
                "--pid-file" => Some(Recognized::PidFile),
                "--bundle" | "-b" => Some(Recognized::Bundle),
                "--process" | "-p" => Some(Recognized::Process),
                _ => None,
            };

            match target {
                Some(slot) => {
                    let value = match inline_value {
                        Some(v) => v,
                        None => iter.next().cloned().ok_or_else(|| {
                            Error::ArgParse(format!("flag '{flag}' expects a value"))
                        })?,
                    };
                    slot.assign(&mut opts, value);
                }
                None if flag.starts_with('-') => {
                    // Unknown flag: skip the token itself. If it carries a
                    // separate value, that value falls through as a
                    // positional, which is harmless because the command is
                    // taken from the front and the id from the back.
                }
                None => positionals.push(raw.as_str()),
            }
        }

        let mut invocation = Invocation {
            options: opts,
            ..Default::default()
        };

        // positionals[0] is the shim binary itself.
        if positionals.len() >= 3 {
            invocation.command = RuntimeCommand::from_name(positionals[1]);
            invocation.container_id = positionals.last().map(|s| s.to_string());
        }

        Ok(invocation)
    }
}

/// Flag slots the scanner can fill.
enum Recognized {
    Root,
    Log,
    LogFormat,
    PidFile,
    Bundle,
    Process,
}

impl Recognized {
    fn assign(self, opts: &mut InvocationOpts, value: String) {
        match self {
            Self::Root => opts.root = Some(value),
            Self::Log => opts.log = Some(PathBuf::from(value)),
            Self::LogFormat => opts.log_format = Some(value),
            Self::PidFile => opts.pid_file = Some(PathBuf::from(value)),
            Self::Bundle => opts.bundle = Some(PathBuf::from(value)),
            Self::Process => opts.process = Some(PathBuf::from(value)),
        }
    }
}

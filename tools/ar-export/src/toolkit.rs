//! External USD toolkit discovery and invocation
//!
//! Real GLB -> USDZ conversion is delegated to a converter executable found on
//! `PATH`. Both supported converters take `<input> <output>` arguments:
//!
//! - `usdzconvert` (Apple USDZ tools)
//! - `usd_from_gltf` (Google)
//!
//! A missing toolkit is an expected condition; callers fall back to copying.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

/// Converter executables tried in order when none is configured
pub const KNOWN_CONVERTERS: [&str; 2] = ["usdzconvert", "usd_from_gltf"];

/// Longest stderr excerpt carried in an error message
const STDERR_EXCERPT_LEN: usize = 400;

/// Error type for toolkit discovery and conversion.
#[derive(Debug, thiserror::Error)]
pub enum ToolkitError {
    #[error("No USD converter found (tried: {tried})")]
    NotFound { tried: String },

    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} failed ({status}): {stderr}")]
    Exited {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("{program} exited successfully but wrote no output to {}", .output.display())]
    NoOutput { program: String, output: PathBuf },

    #[error("Failed to clear staging file {}: {source}", .path.display())]
    Staging {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to move converted package to {}: {source}", .output.display())]
    Install {
        output: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A located converter executable
#[derive(Debug, Clone)]
pub struct Toolkit {
    program: PathBuf,
}

impl Toolkit {
    /// Find a converter.
    ///
    /// With `preferred` set, only that program (bare name or path) is
    /// considered. Otherwise [`KNOWN_CONVERTERS`] are searched on `PATH`.
    pub fn locate(preferred: Option<&str>) -> Result<Self, ToolkitError> {
        let candidates: Vec<&str> = match preferred {
            Some(name) => vec![name],
            None => KNOWN_CONVERTERS.to_vec(),
        };

        for name in &candidates {
            if let Ok(program) = which::which(name) {
                tracing::debug!("Found USD converter {:?}", program);
                return Ok(Self { program });
            }
        }

        Err(ToolkitError::NotFound {
            tried: candidates.join(", "),
        })
    }

    /// Use an explicit executable path without searching
    pub fn from_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Short display name of the executable
    pub fn name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    /// Convert `input` to a USDZ package at `output`.
    ///
    /// The converter writes to a staging file next to `output`, which only
    /// replaces `output` once it exists and is non-empty. A failed
    /// conversion leaves any previous `output` untouched.
    pub fn convert(&self, input: &Path, output: &Path) -> Result<(), ToolkitError> {
        let program = self.name();
        let staging = staging_path(output);

        remove_if_present(&staging).map_err(|source| ToolkitError::Staging {
            path: staging.clone(),
            source,
        })?;

        let result = self.run_converter(&program, input, &staging);
        if result.is_err() {
            let _ = remove_if_present(&staging);
            return result;
        }

        std::fs::rename(&staging, output).map_err(|source| {
            let _ = remove_if_present(&staging);
            ToolkitError::Install {
                output: output.to_path_buf(),
                source,
            }
        })
    }

    fn run_converter(
        &self,
        program: &str,
        input: &Path,
        target: &Path,
    ) -> Result<(), ToolkitError> {
        tracing::debug!("Running {} {:?} {:?}", program, input, target);
        let result = Command::new(&self.program)
            .arg(input)
            .arg(target)
            .output()
            .map_err(|source| ToolkitError::Spawn {
                program: program.to_string(),
                source,
            })?;

        if !result.status.success() {
            return Err(ToolkitError::Exited {
                program: program.to_string(),
                status: result.status,
                stderr: stderr_excerpt(&result.stderr),
            });
        }

        let written = std::fs::metadata(target)
            .map(|m| m.len() > 0)
            .unwrap_or(false);
        if !written {
            return Err(ToolkitError::NoOutput {
                program: program.to_string(),
                output: target.to_path_buf(),
            });
        }

        Ok(())
    }
}

/// Hidden sibling of `output` the converter writes into.
///
/// Keeps the `.usdz` extension, which converters use to pick the format.
fn staging_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    output.with_file_name(format!(".{}.partial.usdz", stem))
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!("Removed leftover {:?}", path);
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Trimmed tail of a converter's stderr, suitable for a log line
fn stderr_excerpt(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.is_empty() {
        return "no error output".to_string();
    }

    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= STDERR_EXCERPT_LEN {
        text.to_string()
    } else {
        let tail: String = chars[chars.len() - STDERR_EXCERPT_LEN..].iter().collect();
        format!("...{}", tail)
    }
}

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{MetadataProvider, ProviderError};

/// Environment variable naming the `showinf` executable to use.
const SHOWINF_ENV: &str = "BIOFORMATS_SHOWINF";

/// Default tool name, resolved on PATH.
const SHOWINF_DEFAULT: &str = "showinf";

/// Max stderr characters carried into an error message.
const STDERR_EXCERPT: usize = 512;

// The Bio-Formats engine tolerates exactly one start per process lifetime, so
// the handle refuses a second acquisition instead of letting a later call fail
// deep inside the tool.
static RUNTIME_STARTED: AtomicBool = AtomicBool::new(false);

/// Process-wide handle for the Bio-Formats execution engine.
///
/// Acquire it once at the top of a batch run, before the first slide, and let
/// it drop after the last slide completes. A second [`BioformatsRuntime::start`]
/// in the same process returns [`ProviderError::RuntimeAlreadyStarted`].
///
/// # Example
///
/// ```rust,no_run
/// use czi_exposure::provider::BioformatsRuntime;
///
/// # fn main() -> anyhow::Result<()> {
/// let runtime = BioformatsRuntime::start(None)?;
/// let provider = runtime.provider();
/// // ... process every slide with `provider` ...
/// # Ok(())
/// # }
/// ```
pub struct BioformatsRuntime {
    showinf: PathBuf,
}

impl BioformatsRuntime {
    /// Start the runtime, resolving the `showinf` tool.
    ///
    /// Resolution order: explicit `tool` argument, then the
    /// `BIOFORMATS_SHOWINF` environment variable, then `showinf` on PATH.
    pub fn start(tool: Option<PathBuf>) -> Result<Self, ProviderError> {
        if RUNTIME_STARTED.swap(true, Ordering::SeqCst) {
            return Err(ProviderError::RuntimeAlreadyStarted);
        }

        let showinf = tool
            .or_else(|| std::env::var_os(SHOWINF_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(SHOWINF_DEFAULT));

        log::debug!("bioformats runtime started ({})", showinf.display());
        Ok(Self { showinf })
    }

    /// Borrow a provider bound to this runtime.
    pub fn provider(&self) -> BioformatsProvider<'_> {
        BioformatsProvider { runtime: self }
    }
}

impl Drop for BioformatsRuntime {
    fn drop(&mut self) {
        log::debug!("bioformats runtime released");
    }
}

/// Metadata provider backed by the Bio-Formats `showinf` tool.
///
/// Runs `showinf -omexml-only -nopix -novalid <image>` and returns stdout,
/// which is the OME-XML document for the image.
pub struct BioformatsProvider<'a> {
    runtime: &'a BioformatsRuntime,
}

impl MetadataProvider for BioformatsProvider<'_> {
    fn name(&self) -> &str {
        "bioformats"
    }

    fn ome_xml(&self, image: &Path) -> Result<String, ProviderError> {
        let tool = self.runtime.showinf.display().to_string();

        let output = Command::new(&self.runtime.showinf)
            .arg("-omexml-only")
            .arg("-nopix")
            .arg("-novalid")
            .arg(image)
            .output()
            .map_err(|source| ProviderError::Spawn {
                tool: tool.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr: String = String::from_utf8_lossy(&output.stderr)
                .chars()
                .take(STDERR_EXCERPT)
                .collect();
            return Err(ProviderError::Tool {
                tool,
                status: output.status,
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // A single test owns the process-wide flag: a first start succeeds, any
    // start after that is refused.
    #[test]
    fn runtime_starts_once_per_process() {
        let first = BioformatsRuntime::start(Some(PathBuf::from("/usr/bin/true")));
        assert!(first.is_ok());

        let second = BioformatsRuntime::start(Some(PathBuf::from("/usr/bin/true")));
        assert!(matches!(
            second,
            Err(ProviderError::RuntimeAlreadyStarted)
        ));

        // Dropping the handle does not re-arm the flag either.
        drop(first);
        let third = BioformatsRuntime::start(None);
        assert!(matches!(
            third,
            Err(ProviderError::RuntimeAlreadyStarted)
        ));
    }
}

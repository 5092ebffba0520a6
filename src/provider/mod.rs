//! External metadata provider seam.
//!
//! The only thing the rest of the crate needs from the imaging stack is
//! "given an image file path, return its embedded metadata as text". That
//! operation is modeled as the [`MetadataProvider`] trait so the coordinator
//! can run against the real Bio-Formats backend in production and a canned
//! blob in tests.
//!
//! The shipped implementation is [`BioformatsProvider`], which drives the
//! Bio-Formats `showinf` command-line tool through a once-per-process
//! [`BioformatsRuntime`] handle.

mod bioformats;

pub use bioformats::{BioformatsProvider, BioformatsRuntime};

use std::path::Path;
use thiserror::Error;

/// Errors from the external metadata provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider runtime was started a second time in the same process.
    /// The underlying engine supports exactly one start/stop per process
    /// lifetime, so re-acquisition is refused rather than attempted.
    #[error("metadata provider runtime already started once in this process")]
    RuntimeAlreadyStarted,

    /// The provider tool could not be spawned at all.
    #[error("failed to run `{tool}`: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The provider tool ran but reported failure for this image.
    #[error("`{tool}` exited with {status}: {stderr}")]
    Tool {
        tool: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Trait for external image-metadata backends.
///
/// Implement this to plug in a different metadata source. The library ships
/// with [`BioformatsProvider`]; tests use small mock implementations that
/// return canned OME-XML blobs.
///
/// # Example
///
/// ```rust,no_run
/// use czi_exposure::provider::{BioformatsRuntime, MetadataProvider};
/// use std::path::Path;
///
/// # fn main() -> anyhow::Result<()> {
/// let runtime = BioformatsRuntime::start(None)?;
/// let provider = runtime.provider();
/// let xml = provider.ome_xml(Path::new("R1_DAPI_slide1_scan.czi"))?;
/// println!("{} bytes of OME-XML", xml.len());
/// # Ok(())
/// # }
/// ```
pub trait MetadataProvider {
    /// The display name of this provider (e.g., "bioformats").
    fn name(&self) -> &str;

    /// Return the embedded-metadata document for `image` as text.
    fn ome_xml(&self, image: &Path) -> Result<String, ProviderError>;
}

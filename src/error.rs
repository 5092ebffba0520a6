use thiserror::Error;

use crate::provider::ProviderError;

/// Errors raised while parsing filenames or extracting exposure times.
///
/// Conditions are slide- or image-scoped wherever possible so one bad image
/// does not take down a whole batch; see the per-variant docs for which scope
/// applies.
#[derive(Debug, Error)]
pub enum ExposureError {
    /// Convention flag outside `{regular, stitched}` — fatal, reported immediately.
    #[error("unsupported naming convention `{0}` (known: regular, stitched)")]
    UnsupportedConvention(String),

    /// Filename does not split into enough underscore-delimited tokens for the
    /// requested convention. Aborts parsing of the slide it belongs to.
    #[error(
        "malformed filename `{name}`: the {convention} convention needs at least \
         {required} underscore-delimited tokens, found {found}"
    )]
    MalformedFilename {
        name: String,
        convention: &'static str,
        required: usize,
        found: usize,
    },

    /// The exposure-time key was not found in the metadata blob. Image-scoped.
    ///
    /// A key found more than once is recoverable (the first match is used and a
    /// warning is recorded); zero matches means there is nothing to extract.
    #[error("exposure-time key found {found} time(s) in metadata of `{image}`, expected exactly 1")]
    ExposurePatternCount { image: String, found: usize },

    /// No bracketed value list followed the exposure-time key. Image-scoped.
    #[error("no bracketed exposure list after the exposure-time key in metadata of `{image}`")]
    ExposureValueSyntax { image: String },

    /// A value inside the bracketed list did not parse as an integer nanosecond
    /// count. Image-scoped.
    #[error("invalid exposure value `{token}` in metadata of `{image}`")]
    InvalidExposureValue { image: String, token: String },

    /// The representative-scene heuristic could not run against the image
    /// directory. Slide-scoped.
    #[error("cannot pick a representative scene in `{dir}`: {reason}")]
    SceneSelection { dir: String, reason: String },

    /// The external metadata provider failed for one image. Image-scoped.
    #[error("metadata provider failed for `{image}`: {source}")]
    Provider {
        image: String,
        #[source]
        source: ProviderError,
    },

    /// Filesystem error (directory listing, CSV write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

//! Exposure-time extraction from OME-XML metadata.
//!
//! The metadata document is treated as an opaque blob: the only thing pulled
//! out of it is the per-channel exposure-time list sitting behind one fixed
//! Zeiss key path. Everything else in the document is returned untouched for
//! downstream inspection.

use std::path::Path;

use crate::error::ExposureError;
use crate::provider::MetadataProvider;

/// Metadata key path marking the per-channel exposure-time block in the
/// OME-XML emitted for CZI files. Matched as a literal.
pub const EXPOSURE_TIME_KEY: &str = "Information|Image|Channel|ExposureTime</Key><Value>";

/// How far past the key the bracketed value list is searched for.
pub const VALUE_WINDOW: usize = 200;

/// Exposure values are stored as nanoseconds; the tables use milliseconds.
const NS_PER_MS: i64 = 1_000_000;

/// Per-channel exposure times for one image.
#[derive(Debug, Clone)]
pub struct ExposureReading {
    /// Exposure time per channel in milliseconds (nanoseconds / 1,000,000,
    /// truncated), in the channel order of the metadata document.
    pub times_ms: Vec<i64>,
    /// The full, untouched metadata blob.
    pub metadata: String,
    /// Set when the exposure-time key occurred more than once; the first
    /// occurrence was used.
    pub warning: Option<String>,
}

/// Extract per-channel exposure times for `image` via `provider`.
///
/// # Example
///
/// ```rust,no_run
/// use czi_exposure::exposure::extract_exposure_times;
/// use czi_exposure::provider::BioformatsRuntime;
/// use std::path::Path;
///
/// # fn main() -> anyhow::Result<()> {
/// let runtime = BioformatsRuntime::start(None)?;
/// let provider = runtime.provider();
/// let reading = extract_exposure_times(
///     &provider,
///     Path::new("R1_CD74.CD206_JB-21__scan-Scene-01.czi"),
/// )?;
/// println!("exposure times (ms): {:?}", reading.times_ms);
/// # Ok(())
/// # }
/// ```
pub fn extract_exposure_times(
    provider: &dyn MetadataProvider,
    image: &Path,
) -> Result<ExposureReading, ExposureError> {
    let label = image.display().to_string();
    log::info!("process image: {label} ...");

    let metadata = provider
        .ome_xml(image)
        .map_err(|source| ExposureError::Provider {
            image: label.clone(),
            source,
        })?;

    let (times_ms, warning) = scrape_exposure_times(&metadata, &label)?;
    Ok(ExposureReading {
        times_ms,
        metadata,
        warning,
    })
}

/// Scrape the exposure-time list out of a metadata blob.
///
/// The key must occur exactly once. Zero occurrences fail with
/// [`ExposureError::ExposurePatternCount`]; more than one is recoverable —
/// the first occurrence is used and a warning string is returned alongside
/// the values.
pub fn scrape_exposure_times(
    metadata: &str,
    image: &str,
) -> Result<(Vec<i64>, Option<String>), ExposureError> {
    let hits: Vec<usize> = metadata
        .match_indices(EXPOSURE_TIME_KEY)
        .map(|(pos, _)| pos)
        .collect();

    let Some(&first) = hits.first() else {
        return Err(ExposureError::ExposurePatternCount {
            image: image.to_string(),
            found: 0,
        });
    };

    let warning = (hits.len() != 1).then(|| {
        format!(
            "exposure-time key found {} times in metadata of `{image}`, using the first",
            hits.len()
        )
    });

    // Bracketed numeric list within a fixed window after the key. The window
    // end is a byte offset; walk it back onto a char boundary so multibyte
    // text (µ in unit attributes) cannot split a character.
    let start = first + EXPOSURE_TIME_KEY.len();
    let mut end = (start + VALUE_WINDOW).min(metadata.len());
    while !metadata.is_char_boundary(end) {
        end -= 1;
    }
    let window = &metadata[start..end];

    let open = window
        .find('[')
        .ok_or_else(|| ExposureError::ExposureValueSyntax {
            image: image.to_string(),
        })?;
    let close = window[open..]
        .find(']')
        .map(|pos| open + pos)
        .ok_or_else(|| ExposureError::ExposureValueSyntax {
            image: image.to_string(),
        })?;

    let mut times_ms = Vec::new();
    for token in window[open + 1..close].split(',') {
        let nanoseconds: i64 =
            token
                .trim()
                .parse()
                .map_err(|_| ExposureError::InvalidExposureValue {
                    image: image.to_string(),
                    token: token.trim().to_string(),
                })?;
        times_ms.push(nanoseconds / NS_PER_MS);
    }

    Ok((times_ms, warning))
}

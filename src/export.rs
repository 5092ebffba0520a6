//! Slide and sample-set exposure export.
//!
//! The coordinator walks one slide at a time, pulls per-channel exposure
//! times for every image of one representative scene, and writes one CSV per
//! slide. Slides are independent: a failing slide is reported and the batch
//! moves on.

use serde::Serialize;
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use crate::convention::{self, Convention, ImageTable, CZI_SUFFIX, SCENE_MARKER};
use crate::error::ExposureError;
use crate::exposure::extract_exposure_times;
use crate::provider::MetadataProvider;

/// Suffix of the per-slide output file, appended to the slide label.
pub const OUTPUT_SUFFIX: &str = "_jinxExposureTimes.csv";

/// Outcome of exporting one slide.
///
/// Collected per slide so a batch run can summarize successes, per-image
/// failures, and pattern warnings at the end (and emit them as JSON).
#[derive(Debug, Serialize)]
pub struct SlideReport {
    pub slide: String,
    /// Path of the written CSV, `None` when nothing could be written.
    pub csv_path: Option<PathBuf>,
    /// Number of image rows in the CSV.
    pub images_ok: usize,
    /// Exposure-key pattern warnings, one per affected image.
    pub warnings: Vec<String>,
    /// Per-image extraction failures; these do not abort the slide.
    pub image_errors: Vec<String>,
    /// Slide-fatal error, set when the whole slide failed.
    pub error: Option<String>,
}

impl SlideReport {
    fn failed(slide: &str, error: String) -> Self {
        Self {
            slide: slide.to_string(),
            csv_path: None,
            images_ok: 0,
            warnings: Vec::new(),
            image_errors: Vec::new(),
            error: Some(error),
        }
    }
}

/// Pick the representative scene for a multi-scene directory.
///
/// Takes the second entry (index 1) of the sorted raw `.czi` listing and
/// returns its scene label. Only one scene per slide is needed for
/// exposure-time comparison across rounds, so the remaining scenes are
/// skipped entirely.
fn representative_scene(czi_dir: &Path) -> Result<String, ExposureError> {
    let mut files: Vec<String> = fs::read_dir(czi_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(CZI_SUFFIX))
        .collect();
    files.sort();

    let Some(second) = files.get(1) else {
        return Err(ExposureError::SceneSelection {
            dir: czi_dir.display().to_string(),
            reason: format!("need at least 2 .czi files, found {}", files.len()),
        });
    };

    let Some(pos) = second.find(SCENE_MARKER) else {
        return Err(ExposureError::SceneSelection {
            dir: czi_dir.display().to_string(),
            reason: format!("file `{second}` carries no scene label"),
        });
    };

    let tail = &second[pos + SCENE_MARKER.len()..];
    Ok(tail.split(CZI_SUFFIX).next().unwrap_or_default().to_string())
}

/// Export exposure-time tables for every slide present in `table`.
///
/// When the table spans more than one scene, a single representative scene is
/// chosen (the scene of the second entry in the sorted raw `.czi` listing of
/// `czi_dir`) and rows are restricted to it, so
/// every output table holds exactly one slide and one scene. Each image is
/// extracted in turn; image-scoped failures are recorded on the report and do
/// not disturb rows already collected.
///
/// The CSV lands at `{out_dir}/{slide}_jinxExposureTimes.csv` with a header
/// row, the filename as first column, and one integer-millisecond column per
/// channel.
pub fn export_slide_exposures(
    table: &ImageTable,
    czi_dir: &Path,
    out_dir: &Path,
    provider: &dyn MetadataProvider,
) -> Result<Vec<SlideReport>, ExposureError> {
    // One scene per slide is enough; only multi-scene tables need the pick.
    let scene_filter = match table.scenes() {
        Some(scenes) if scenes.len() > 1 => Some(representative_scene(czi_dir)?),
        _ => None,
    };

    let mut reports = Vec::new();

    for slide in table.slides() {
        log::info!("process slide: {slide} ...");

        let files = table.filenames_for(&slide, scene_filter.as_deref());

        let mut rows: Vec<(String, Vec<i64>)> = Vec::new();
        let mut warnings = Vec::new();
        let mut image_errors = Vec::new();

        for file in files {
            match extract_exposure_times(provider, &czi_dir.join(&file)) {
                Ok(reading) => {
                    if let Some(warning) = reading.warning {
                        log::warn!("{warning}");
                        warnings.push(warning);
                    }
                    rows.push((file, reading.times_ms));
                }
                Err(err) => {
                    log::error!("skipping image: {err}");
                    image_errors.push(err.to_string());
                }
            }
        }

        if rows.is_empty() {
            reports.push(SlideReport {
                slide: slide.clone(),
                csv_path: None,
                images_ok: 0,
                warnings,
                image_errors,
                error: Some(format!("no exposure data extracted for slide `{slide}`")),
            });
            continue;
        }

        fs::create_dir_all(out_dir)?;
        let csv_path = out_dir.join(format!("{slide}{OUTPUT_SUFFIX}"));
        write_exposure_csv(&csv_path, &rows)?;
        log::info!("write file: {}", csv_path.display());

        reports.push(SlideReport {
            slide,
            csv_path: Some(csv_path),
            images_ok: rows.len(),
            warnings,
            image_errors,
            error: None,
        });
    }

    Ok(reports)
}

/// Export exposure-time tables for a whole sample set.
///
/// For each slide label, in input order, parses
/// `{czi_root}/{slide}/splitscenes/` and exports that slide's tables into
/// `out_dir`. Slides are processed independently: a failure yields an errored
/// [`SlideReport`] and the remaining slides still run. An empty slide list
/// performs no extraction and writes no files.
///
/// # Example
///
/// ```rust,no_run
/// use czi_exposure::convention::Convention;
/// use czi_exposure::export::export_sampleset_exposures;
/// use czi_exposure::provider::BioformatsRuntime;
/// use std::path::Path;
///
/// # fn main() -> anyhow::Result<()> {
/// let runtime = BioformatsRuntime::start(None)?;
/// let provider = runtime.provider();
/// let reports = export_sampleset_exposures(
///     &["JB-21".to_string()],
///     Path::new("./"),
///     Path::new("./"),
///     Convention::Regular,
///     &provider,
/// );
/// for report in &reports {
///     println!("{}: {} image(s)", report.slide, report.images_ok);
/// }
/// # Ok(())
/// # }
/// ```
pub fn export_sampleset_exposures(
    slides: &[String],
    czi_root: &Path,
    out_dir: &Path,
    convention: Convention,
    provider: &dyn MetadataProvider,
) -> Vec<SlideReport> {
    let mut reports = Vec::new();

    for slide in slides {
        let czi_dir = czi_root.join(slide).join("splitscenes");

        match convention::parse_filenames(&czi_dir, convention) {
            // A requested slide must always come back with a report; an empty
            // directory is a failure, not a silent no-op.
            Ok(table) if table.is_empty() => {
                let error = format!("no czi files found in `{}`", czi_dir.display());
                log::error!("slide {slide}: {error}");
                reports.push(SlideReport::failed(slide, error));
            }
            Ok(table) => match export_slide_exposures(&table, &czi_dir, out_dir, provider) {
                Ok(mut slide_reports) => reports.append(&mut slide_reports),
                Err(err) => {
                    log::error!("slide {slide}: {err}");
                    reports.push(SlideReport::failed(slide, err.to_string()));
                }
            },
            Err(err) => {
                log::error!("slide {slide}: {err}");
                reports.push(SlideReport::failed(slide, err.to_string()));
            }
        }
    }

    reports
}

/// Write one slide's exposure table as CSV.
///
/// Header row: empty first cell, then one ordinal per channel column. Data
/// rows: filename, then integer milliseconds per channel; rows with fewer
/// channels than the widest row are padded with empty cells.
fn write_exposure_csv(path: &Path, rows: &[(String, Vec<i64>)]) -> std::io::Result<()> {
    let channels = rows.iter().map(|(_, times)| times.len()).max().unwrap_or(0);

    let mut csv = String::new();
    for channel in 0..channels {
        csv.push(',');
        csv.push_str(&channel.to_string());
    }
    csv.push('\n');

    for (name, times) in rows {
        csv.push_str(&csv_field(name));
        for channel in 0..channels {
            csv.push(',');
            if let Some(ms) = times.get(channel) {
                csv.push_str(&ms.to_string());
            }
        }
        csv.push('\n');
    }

    fs::write(path, csv)
}

/// Quote a CSV field when it carries a delimiter. The filename convention
/// allows neither commas nor quotes, but a stray one must not corrupt the row.
fn csv_field(name: &str) -> Cow<'_, str> {
    if name.contains([',', '"', '\n']) {
        Cow::Owned(format!("\"{}\"", name.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(name)
    }
}

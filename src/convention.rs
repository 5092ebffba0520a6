//! Filename convention parsing.
//!
//! cmIF image files are named along a fixed convention:
//!
//! ```text
//! round_marker2.marker3.marker4.marker5_slide_YYYY_MM_DD__hh_mm__scanid[-rescan]-Scene-n.czi
//! ```
//!
//! - channel 1 is always DAPI, so only the non-DAPI markers are encoded
//! - the slide label may contain dashes but never underscores
//! - stitched exports shift the slide label to a later underscore token
//!
//! [`parse_filenames`] turns a directory of such files into an [`ImageTable`]
//! indexed by filename.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::ExposureError;

/// Filename prefix selecting round images ("R1_...", "R2_...").
pub const CZI_PREFIX: &str = "R";

/// Filename suffix selecting CZI images.
pub const CZI_SUFFIX: &str = ".czi";

/// Literal marking the scene label inside a filename.
pub const SCENE_MARKER: &str = "-Scene-";

/// Which naming convention the files in a directory follow.
///
/// The convention decides which underscore-delimited token carries the slide
/// label: token 2 for regular exports, token 5 for stitched ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convention {
    /// Regular (per-scene) export — slide label at token index 2.
    Regular,
    /// Stitched export — slide label at token index 5.
    Stitched,
}

impl Convention {
    /// Index of the underscore-delimited token holding the slide label.
    pub const fn slide_token(&self) -> usize {
        match self {
            Convention::Regular => 2,
            Convention::Stitched => 5,
        }
    }

    /// Human-readable name.
    pub const fn name(&self) -> &'static str {
        match self {
            Convention::Regular => "regular",
            Convention::Stitched => "stitched",
        }
    }
}

impl FromStr for Convention {
    type Err = ExposureError;

    /// Parse a convention name. Accepts `"regular"`/`"r"` and
    /// `"stitched"`/`"s"`; anything else is an
    /// [`ExposureError::UnsupportedConvention`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "regular" | "r" => Ok(Convention::Regular),
            "stitched" | "s" => Ok(Convention::Stitched),
            other => Err(ExposureError::UnsupportedConvention(other.to_string())),
        }
    }
}

/// Fields derived from one filename, common to both table shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    /// Round label, e.g. "R1" (token 0).
    pub round: String,
    /// Marker-channel string, e.g. "CD74.CD206.CD68.PDL1" (token 1).
    pub markers: String,
    /// Slide label (convention-selected token).
    pub slide: String,
}

/// An [`ImageRecord`] plus the scene fields present when every filename in the
/// set encodes a scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenedRecord {
    pub image: ImageRecord,
    /// Scene label, the text between `-Scene-` and the extension dot.
    pub scene: String,
    /// Scan ID, the last `__`-delimited segment truncated at `-Scene`.
    pub scan_id: String,
}

/// Table of parsed filenames, indexed by filename.
///
/// Scene and scan-ID data is all-or-nothing across a directory: either every
/// filename carries `-Scene-` and the whole table has scene fields, or none of
/// it does. The two shapes are distinct variants so the policy holds by
/// construction rather than by convention over `Option` fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageTable {
    /// Every filename encodes a scene.
    WithScenes(BTreeMap<String, ScenedRecord>),
    /// At least one filename lacks `-Scene-`; no scene data for anyone.
    WithoutScenes(BTreeMap<String, ImageRecord>),
}

impl ImageTable {
    /// Number of image files in the table.
    pub fn len(&self) -> usize {
        match self {
            ImageTable::WithScenes(map) => map.len(),
            ImageTable::WithoutScenes(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Distinct slide labels, sorted.
    pub fn slides(&self) -> BTreeSet<String> {
        match self {
            ImageTable::WithScenes(map) => {
                map.values().map(|r| r.image.slide.clone()).collect()
            }
            ImageTable::WithoutScenes(map) => {
                map.values().map(|r| r.slide.clone()).collect()
            }
        }
    }

    /// Distinct scene labels, sorted; `None` for the scene-less shape.
    pub fn scenes(&self) -> Option<BTreeSet<String>> {
        match self {
            ImageTable::WithScenes(map) => {
                Some(map.values().map(|r| r.scene.clone()).collect())
            }
            ImageTable::WithoutScenes(_) => None,
        }
    }

    /// Filenames belonging to `slide`, restricted to `scene` when the table
    /// has scene data and a scene is requested. Sorted by filename.
    pub fn filenames_for(&self, slide: &str, scene: Option<&str>) -> Vec<String> {
        match self {
            ImageTable::WithScenes(map) => map
                .iter()
                .filter(|(_, r)| r.image.slide == slide)
                .filter(|(_, r)| scene.is_none_or(|s| r.scene == s))
                .map(|(name, _)| name.clone())
                .collect(),
            ImageTable::WithoutScenes(map) => map
                .iter()
                .filter(|(_, r)| r.slide == slide)
                .map(|(name, _)| name.clone())
                .collect(),
        }
    }
}

/// List entries of `dir` whose name starts with `prefix` and ends with
/// `suffix`. Non-recursive; the set deduplicates and iterates sorted.
pub fn collect_filenames(
    dir: &Path,
    prefix: &str,
    suffix: &str,
) -> std::io::Result<BTreeSet<String>> {
    let mut names = BTreeSet::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(prefix) && name.ends_with(suffix) {
            names.insert(name);
        }
    }
    Ok(names)
}

/// Parse every `R*.czi` filename in `dir` into an [`ImageTable`].
///
/// Token 0 is the round label, token 1 the marker string, and the
/// convention-selected token the slide label. A filename with too few tokens
/// fails with [`ExposureError::MalformedFilename`].
///
/// # Example
///
/// ```rust,no_run
/// use czi_exposure::convention::{parse_filenames, Convention, ImageTable};
/// use std::path::Path;
///
/// # fn main() -> anyhow::Result<()> {
/// let table = parse_filenames(Path::new("./slide1/splitscenes"), Convention::Regular)?;
/// match &table {
///     ImageTable::WithScenes(_) => println!("scenes: {:?}", table.scenes()),
///     ImageTable::WithoutScenes(_) => println!("no scene data"),
/// }
/// # Ok(())
/// # }
/// ```
pub fn parse_filenames(dir: &Path, convention: Convention) -> Result<ImageTable, ExposureError> {
    let names = collect_filenames(dir, CZI_PREFIX, CZI_SUFFIX)?;

    // Scene data is all-or-nothing: one filename without the marker drops the
    // scene fields for the whole directory.
    let all_scened = !names.is_empty() && names.iter().all(|n| n.contains(SCENE_MARKER));

    if all_scened {
        let mut map = BTreeMap::new();
        for name in names {
            let image = parse_tokens(&name, convention)?;
            let scene = scene_label(&name);
            let scan_id = scan_id(&name);
            map.insert(name, ScenedRecord { image, scene, scan_id });
        }
        Ok(ImageTable::WithScenes(map))
    } else {
        let mut map = BTreeMap::new();
        for name in names {
            let image = parse_tokens(&name, convention)?;
            map.insert(name, image);
        }
        Ok(ImageTable::WithoutScenes(map))
    }
}

/// Split a filename on `_` and pull out round, markers, and slide.
fn parse_tokens(name: &str, convention: Convention) -> Result<ImageRecord, ExposureError> {
    let tokens: Vec<&str> = name.split('_').collect();
    let slide_token = convention.slide_token();

    if tokens.len() <= slide_token {
        return Err(ExposureError::MalformedFilename {
            name: name.to_string(),
            convention: convention.name(),
            required: slide_token + 1,
            found: tokens.len(),
        });
    }

    Ok(ImageRecord {
        round: tokens[0].to_string(),
        markers: tokens[1].to_string(),
        slide: tokens[slide_token].to_string(),
    })
}

/// Scene label: text between `-Scene-` and the next `.`.
///
/// Callers guarantee the marker is present (all-or-nothing check in
/// [`parse_filenames`]).
fn scene_label(name: &str) -> String {
    let tail = match name.find(SCENE_MARKER) {
        Some(pos) => &name[pos + SCENE_MARKER.len()..],
        None => return String::new(),
    };
    tail.split('.').next().unwrap_or_default().to_string()
}

/// Scan ID: last `__`-delimited segment, truncated at `-Scene`.
fn scan_id(name: &str) -> String {
    let segment = name.rsplit("__").next().unwrap_or(name);
    segment.split("-Scene").next().unwrap_or_default().to_string()
}

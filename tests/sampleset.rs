//! End-to-end batch run over a sample-set directory tree with a mock
//! metadata provider.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tempfile::TempDir;

use czi_exposure::convention::Convention;
use czi_exposure::export::export_sampleset_exposures;
use czi_exposure::exposure::EXPOSURE_TIME_KEY;
use czi_exposure::provider::{MetadataProvider, ProviderError};

/// Provider serving canned OME-XML blobs keyed by filename.
struct MockProvider {
    blobs: HashMap<String, String>,
}

impl MockProvider {
    fn new() -> Self {
        Self {
            blobs: HashMap::new(),
        }
    }

    fn with_times(mut self, file: &str, nanoseconds: &[i64]) -> Self {
        let list = nanoseconds
            .iter()
            .map(|ns| ns.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.blobs.insert(
            file.to_string(),
            format!("<OME><Key>{EXPOSURE_TIME_KEY}[{list}]</Value></OME>"),
        );
        self
    }
}

impl MetadataProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn ome_xml(&self, image: &Path) -> Result<String, ProviderError> {
        let name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.blobs
            .get(&name)
            .cloned()
            .ok_or_else(|| ProviderError::Spawn {
                tool: "mock".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no blob"),
            })
    }
}

fn seed_slide(root: &Path, slide: &str, files: &[&str]) {
    let dir = root.join(slide).join("splitscenes");
    fs::create_dir_all(&dir).unwrap();
    for file in files {
        fs::write(dir.join(file), b"").unwrap();
    }
}

#[test]
fn two_slide_sampleset_writes_one_csv_per_slide() {
    let root = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();

    let a_r1 = "R1_CD74.CD206_JB-21__P1-B3-Scene-01.czi";
    let a_r2 = "R2_PD1.CD8_JB-21__P1-B3-Scene-01.czi";
    let b_r1 = "R1_CD74.CD206_JB-22__P2-B1-Scene-01.czi";

    seed_slide(root.path(), "JB-21", &[a_r1, a_r2]);
    seed_slide(root.path(), "JB-22", &[b_r1]);

    let provider = MockProvider::new()
        .with_times(a_r1, &[5_000_000, 10_000_000, 15_000_000])
        .with_times(a_r2, &[7_000_000, 8_000_000, 9_000_000])
        .with_times(b_r1, &[12_000_000, 3_000_000]);

    let reports = export_sampleset_exposures(
        &["JB-21".to_string(), "JB-22".to_string()],
        root.path(),
        out.path(),
        Convention::Regular,
        &provider,
    );

    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.error.is_none()));

    let csv_a = fs::read_to_string(out.path().join("JB-21_jinxExposureTimes.csv")).unwrap();
    let mut lines = csv_a.lines();
    assert_eq!(lines.next(), Some(",0,1,2"));
    assert_eq!(lines.next(), Some(format!("{a_r1},5,10,15").as_str()));
    assert_eq!(lines.next(), Some(format!("{a_r2},7,8,9").as_str()));
    assert_eq!(lines.next(), None);

    let csv_b = fs::read_to_string(out.path().join("JB-22_jinxExposureTimes.csv")).unwrap();
    assert_eq!(csv_b, format!(",0,1\n{b_r1},12,3\n"));
}

#[test]
fn multi_scene_slide_exports_a_single_scene() {
    let root = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();

    // Second entry of the sorted listing is the Scene-02 file, so the export
    // is restricted to scene 02.
    let s1 = "R1_CD74.CD206_JB-21__P1-B3-Scene-01.czi";
    let s2 = "R1_CD74.CD206_JB-21__P1-B3-Scene-02.czi";
    seed_slide(root.path(), "JB-21", &[s1, s2]);

    let provider = MockProvider::new()
        .with_times(s1, &[5_000_000])
        .with_times(s2, &[7_000_000]);

    let reports = export_sampleset_exposures(
        &["JB-21".to_string()],
        root.path(),
        out.path(),
        Convention::Regular,
        &provider,
    );

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].images_ok, 1);

    let csv = fs::read_to_string(out.path().join("JB-21_jinxExposureTimes.csv")).unwrap();
    assert!(csv.contains(s2));
    assert!(!csv.contains(s1));
}

#[test]
fn empty_slide_list_performs_no_extraction() {
    let root = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let provider = MockProvider::new();

    let reports = export_sampleset_exposures(
        &[],
        root.path(),
        out.path(),
        Convention::Regular,
        &provider,
    );

    assert!(reports.is_empty());
    assert!(out.path().read_dir().unwrap().next().is_none());
}

#[test]
fn failing_slide_does_not_stop_the_batch() {
    let root = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();

    let b_r1 = "R1_CD74.CD206_JB-22__P2-B1-Scene-01.czi";
    seed_slide(root.path(), "JB-22", &[b_r1]);
    // "missing" has no splitscenes directory at all.

    let provider = MockProvider::new().with_times(b_r1, &[4_000_000]);
    let reports = export_sampleset_exposures(
        &["missing".to_string(), "JB-22".to_string()],
        root.path(),
        out.path(),
        Convention::Regular,
        &provider,
    );

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].slide, "missing");
    assert!(reports[0].error.is_some());
    assert!(reports[1].error.is_none());
    assert!(out.path().join("JB-22_jinxExposureTimes.csv").exists());
}

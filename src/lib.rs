//! # czi-exposure
//!
//! Extract per-channel exposure-time metadata from CZI microscopy images and
//! tabulate it per slide.
//!
//! Image files are expected to follow the cmIF naming convention
//! (`round_markers_slide_..._scanid-Scene-n.czi`). For each slide the tool
//! parses the filenames under `{czidir}/{slide}/splitscenes/`, picks one
//! representative scene, asks the Bio-Formats backend for each image's
//! OME-XML metadata, scrapes the per-channel exposure times out of it, and
//! writes `{codedir}/{slide}_jinxExposureTimes.csv` — one row per image, one
//! integer-millisecond column per channel.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use czi_exposure::convention::Convention;
//! use czi_exposure::export::export_sampleset_exposures;
//! use czi_exposure::provider::BioformatsRuntime;
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     // The Bio-Formats engine starts exactly once per process; acquire it
//!     // before the first slide and keep it for the whole batch.
//!     let runtime = BioformatsRuntime::start(None)?;
//!     let provider = runtime.provider();
//!
//!     let reports = export_sampleset_exposures(
//!         &["JB-21".to_string(), "JB-22".to_string()],
//!         Path::new("./czi"),
//!         Path::new("./out"),
//!         Convention::Regular,
//!         &provider,
//!     );
//!
//!     for report in &reports {
//!         match &report.error {
//!             Some(err) => eprintln!("{}: {err}", report.slide),
//!             None => println!("{}: {} image(s) exported", report.slide, report.images_ok),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`convention`] — filename convention parsing (round, markers, slide, scene, scan ID)
//! - [`exposure`] — exposure-time scraping of the OME-XML metadata blob
//! - [`export`] — per-slide and per-sample-set CSV export
//! - [`provider`] — external metadata provider trait and the Bio-Formats backend
//! - [`error`] — error types

pub mod convention;
pub mod error;
pub mod export;
pub mod exposure;
pub mod provider;

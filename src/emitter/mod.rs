//! Serializes one camera record per image.
//!
//! Two output disciplines are supported:
//! - [`OutputMode::Standalone`]: a new `image_NNN.cam` file per image ([`cam_file`]).
//! - [`OutputMode::Merged`]: the `camera` section of the `meta.ini` inside the
//!   i-th existing per-image directory ([`meta_ini`]).

pub mod cam_file;
pub mod meta_ini;

use crate::camera::IntrinsicsModel;
use crate::error::CamParamsError;
use crate::extrinsics::ResolvedView;
use crate::geometry::ExtrinsicsMatrix;
use crate::util::{self, EntryKind};
use clap::ValueEnum;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// One `.cam` text file per image.
    #[default]
    Standalone,
    /// Camera section merged into each existing view's `meta.ini`.
    Merged,
}

/// The numeric content of one output record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CamRecord {
    pub translation: [f64; 3],
    /// Row-major rotation.
    pub rotation: [f64; 9],
    pub intrinsics: IntrinsicsModel,
}

impl CamRecord {
    pub fn new(extrinsics: &ExtrinsicsMatrix, intrinsics: &IntrinsicsModel) -> Self {
        CamRecord {
            translation: extrinsics.translation_values(),
            rotation: extrinsics.rotation_row_major(),
            intrinsics: intrinsics.clone(),
        }
    }

    /// Translation followed by the row-major rotation.
    pub fn extrinsics_values(&self) -> [f64; 12] {
        let mut values = [0.0; 12];
        values[..3].copy_from_slice(&self.translation);
        values[3..].copy_from_slice(&self.rotation);
        values
    }

}

/// One written record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmittedRecord {
    pub index: usize,
    pub source: PathBuf,
    pub output: PathBuf,
}

/// Write a record for every view into `output_dir`.
///
/// In standalone mode `output_dir` is created if needed. In merged mode it must
/// already hold exactly one per-image directory for every view.
///
/// # Errors
///
/// * [`CamParamsError::Configuration`] if, in merged mode, the number of
///   per-image directories differs from the number of views.
/// * [`CamParamsError::Io`] if a directory or file cannot be created, read or written.
///   In merged mode no `meta.ini` is touched unless all of them could be read.
pub fn emit(
    mode: OutputMode,
    output_dir: &Path,
    intrinsics: &IntrinsicsModel,
    views: &[ResolvedView],
) -> Result<Vec<EmittedRecord>, CamParamsError> {
    let records: Vec<_> = views
        .iter()
        .map(|view| CamRecord::new(&view.extrinsics, intrinsics))
        .collect();

    let outputs = match mode {
        OutputMode::Standalone => {
            util::ensure_output_dir(output_dir)?;
            let mut outputs = Vec::with_capacity(views.len());
            for (view, record) in views.iter().zip(&records) {
                let path = output_dir.join(cam_file::file_name(view.index));
                cam_file::write_cam_file(&path, record)?;
                outputs.push(path);
            }
            outputs
        }
        OutputMode::Merged => {
            // Every store is read before the first one is rewritten.
            let stores = merged_targets(output_dir, views.len())?
                .iter()
                .map(|dir| meta_ini::load_view_store(dir))
                .collect::<Result<Vec<_>, _>>()?;
            let mut outputs = Vec::with_capacity(stores.len());
            for ((path, mut store), record) in stores.into_iter().zip(&records) {
                store.replace_section(meta_ini::CAMERA_SECTION, &meta_ini::camera_entries(record));
                store.save(&path)?;
                outputs.push(path);
            }
            outputs
        }
    };

    let emitted: Vec<_> = views
        .iter()
        .zip(outputs)
        .map(|(view, output)| {
            debug!(
                "[{:03}] {} -> {}",
                view.index,
                view.source.display(),
                output.display()
            );
            EmittedRecord {
                index: view.index,
                source: view.source.clone(),
                output,
            }
        })
        .collect();

    info!(
        "Wrote {} camera records ({:?}) to {}",
        emitted.len(),
        mode,
        output_dir.display()
    );
    Ok(emitted)
}

/// Per-image directories of a merged-mode output, checked against the view count.
fn merged_targets(output_dir: &Path, view_count: usize) -> Result<Vec<PathBuf>, CamParamsError> {
    if !output_dir.is_dir() {
        return Err(CamParamsError::io(
            output_dir,
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "per-image directory root does not exist",
            ),
        ));
    }
    let dirs = util::sorted_entries(output_dir, EntryKind::Directory)?;
    if dirs.len() != view_count {
        return Err(CamParamsError::Configuration(format!(
            "{} holds {} per-image directories but {} camera poses were given",
            output_dir.display(),
            dirs.len(),
            view_count
        )));
    }
    Ok(dirs)
}

//! Resolves a directory of per-image pose or extrinsics files into canonical
//! world-to-camera [`ExtrinsicsMatrix`] values, one per file.
//!
//! The image index of every file is its position in the lexicographically
//! sorted directory listing. Every entry counts, hidden files and
//! sub-directories included: an entry that is not a readable matrix file
//! aborts the whole run.

use crate::error::CamParamsError;
use crate::geometry::{ExtrinsicsMatrix, RIGIDITY_TOLERANCE};
use crate::util::{self, EntryKind};
use log::{debug, info, warn};
use nalgebra::DMatrix;
use std::path::{Path, PathBuf};

/// Directory holding one matrix file per image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoseSource {
    /// Camera-to-world poses, inverted on load.
    Poses(PathBuf),
    /// World-to-camera `[R | t]` matrices, used as they are.
    Extrinsics(PathBuf),
}

impl PoseSource {
    pub fn dir(&self) -> &Path {
        match self {
            PoseSource::Poses(dir) | PoseSource::Extrinsics(dir) => dir,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            PoseSource::Poses(_) => "pose",
            PoseSource::Extrinsics(_) => "extrinsics",
        }
    }
}

/// Extrinsics of one image together with the file it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedView {
    pub index: usize,
    pub source: PathBuf,
    pub extrinsics: ExtrinsicsMatrix,
}

/// What to do with rotations that are not orthonormal with determinant one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RigidityPolicy {
    /// Log a warning and keep the matrix.
    #[default]
    Warn,
    /// Fail with [`CamParamsError::Input`].
    Reject,
}

/// Resolve every entry of `source` in sorted filename order.
///
/// # Errors
///
/// * [`CamParamsError::Io`] if the directory cannot be listed.
/// * [`CamParamsError::Input`] for the first entry that is not a file, cannot be parsed, has
///   the wrong shape, or (with [`RigidityPolicy::Reject`]) holds a non-rigid rotation.
pub fn resolve(
    source: &PoseSource,
    policy: RigidityPolicy,
) -> Result<Vec<ResolvedView>, CamParamsError> {
    let files = util::sorted_entries(source.dir(), EntryKind::Any)?;
    info!(
        "Found {} {} entries in {}",
        files.len(),
        source.label(),
        source.dir().display()
    );

    files
        .into_iter()
        .enumerate()
        .map(|(index, path)| {
            let extrinsics = resolve_file(source, &path, policy)?;
            debug!("[{index:03}] {} -> t = {:?}", path.display(), extrinsics.translation_values());
            Ok(ResolvedView {
                index,
                source: path,
                extrinsics,
            })
        })
        .collect()
}

/// Load a single pose or extrinsics file and bring it into `[R | t]` form.
pub fn resolve_file(
    source: &PoseSource,
    path: &Path,
    policy: RigidityPolicy,
) -> Result<ExtrinsicsMatrix, CamParamsError> {
    if !path.is_file() {
        return Err(CamParamsError::input(path, "not a regular matrix file"));
    }
    let matrix = util::load_matrix(path)?;
    check_shape(&matrix, path)?;

    let extrinsics = match source {
        PoseSource::Poses(_) => ExtrinsicsMatrix::from_pose(&matrix),
        PoseSource::Extrinsics(_) => ExtrinsicsMatrix::from_matrix(&matrix),
    }
    .ok_or_else(|| CamParamsError::input(path, "matrix is smaller than 3x4"))?;

    let error = extrinsics.rigidity_error();
    if error > RIGIDITY_TOLERANCE {
        match policy {
            RigidityPolicy::Warn => warn!(
                "{}: rotation is not a proper rotation (error {error:e})",
                path.display()
            ),
            RigidityPolicy::Reject => {
                return Err(CamParamsError::input(
                    path,
                    format!("rotation is not a proper rotation (error {error:e})"),
                ))
            }
        }
    }

    Ok(extrinsics)
}

/// Pose and extrinsics files are 3x4 or 4x4.
fn check_shape(matrix: &DMatrix<f64>, path: &Path) -> Result<(), CamParamsError> {
    let (rows, cols) = matrix.shape();
    if cols != 4 || !(rows == 3 || rows == 4) {
        return Err(CamParamsError::input(
            path,
            format!("expected a 3x4 or 4x4 matrix, found {rows}x{cols}"),
        ));
    }
    Ok(())
}

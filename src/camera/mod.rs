//! Intrinsic calibration of the camera shared by every image of a run.
//!
//! A raw pinhole calibration (focal lengths and principal point in pixels) is
//! normalized into the [`IntrinsicsModel`] expected by the texturing pipelines:
//! focal length expressed in units of sensor width, unit pixel aspect and no
//! radial distortion.

pub mod pinhole;

use crate::error::CamParamsError;
use crate::util;
use log::info;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Sensor width of a standard full-frame 35mm camera, in millimetres.
pub const SENSOR_WIDTH_MM: f64 = 36.0;

/// Pinhole intrinsics in pixel units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl Intrinsics {
    /// Read `fx`, `fy`, `cx`, `cy` from a calibration matrix `K`.
    ///
    /// Returns `None` when `K` is smaller than 2x3.
    pub fn from_calibration_matrix(k: &DMatrix<f64>) -> Option<Self> {
        if k.nrows() < 2 || k.ncols() < 3 {
            return None;
        }
        Some(Intrinsics {
            fx: k[(0, 0)],
            fy: k[(1, 1)],
            cx: k[(0, 2)],
            cy: k[(1, 2)],
        })
    }
}

/// Sensor-normalized camera model written into every output record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntrinsicsModel {
    /// Focal length as a fraction of the sensor width.
    pub focal_length: f64,
    pub radial_distortion: [f64; 2],
    pub pixel_aspect: f64,
    /// Principal point in pixels.
    pub principal_point: [f64; 2],
}

impl IntrinsicsModel {
    /// Normalize pixel intrinsics: `focal_length = fx / SENSOR_WIDTH_MM`.
    ///
    /// `fy` is not used; non-square pixels are not supported.
    pub fn from_intrinsics(intrinsics: &Intrinsics) -> Self {
        IntrinsicsModel {
            focal_length: intrinsics.fx / SENSOR_WIDTH_MM,
            radial_distortion: [0.0, 0.0],
            pixel_aspect: 1.0,
            principal_point: [intrinsics.cx, intrinsics.cy],
        }
    }

    /// The six intrinsics values in `.cam` order:
    /// focal length, two distortion terms, pixel aspect, principal point x and y.
    pub fn cam_values(&self) -> [f64; 6] {
        [
            self.focal_length,
            self.radial_distortion[0],
            self.radial_distortion[1],
            self.pixel_aspect,
            self.principal_point[0],
            self.principal_point[1],
        ]
    }
}

/// Common validation functions for camera parameters
pub mod validation {
    use super::*;

    pub fn validate_intrinsics(intrinsics: &Intrinsics) -> Result<(), String> {
        if !(intrinsics.fx > 0.0 && intrinsics.fx.is_finite()) {
            return Err("Focal length must be positive".to_string());
        }
        if !intrinsics.cx.is_finite() || !intrinsics.cy.is_finite() {
            return Err("Principal point must be finite".to_string());
        }
        Ok(())
    }
}

/// Load the shared intrinsics and normalize them.
///
/// Files ending in `.yaml` or `.yml` are read as a pinhole camera description
/// (see [`pinhole::load_from_yaml`]); anything else is read as a whitespace
/// delimited calibration matrix of at least 2x3 values.
///
/// # Errors
///
/// * [`CamParamsError::Input`] if the file is missing, malformed, too small,
///   or holds a non-positive focal length.
pub fn load_intrinsics(path: &Path) -> Result<IntrinsicsModel, CamParamsError> {
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    let intrinsics = if is_yaml {
        pinhole::load_from_yaml(path)?
    } else {
        let k = util::load_matrix(path)?;
        util::require_shape(&k, 2, 3, path)?;
        Intrinsics::from_calibration_matrix(&k)
            .ok_or_else(|| CamParamsError::input(path, "calibration matrix is smaller than 2x3"))?
    };

    validation::validate_intrinsics(&intrinsics)
        .map_err(|reason| CamParamsError::input(path, reason))?;

    let model = IntrinsicsModel::from_intrinsics(&intrinsics);
    info!(
        "Intrinsics: fx = {}, principal point = ({}, {}), normalized focal length = {}",
        intrinsics.fx, model.principal_point[0], model.principal_point[1], model.focal_length
    );
    Ok(model)
}

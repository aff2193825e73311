//! Reads pinhole intrinsics from a Kalibr-style YAML camera description.
//!
//! ```yaml
//! cam0:
//!   camera_model: pinhole
//!   intrinsics: [461.629, 460.152, 362.680, 246.049]
//!   resolution: [752, 480]
//! ```
//!
//! Only `intrinsics` is required. A `camera_model` entry, when present, must be
//! `pinhole`; distortion entries of other models have no place in the output
//! records and are rejected with it.

use crate::camera::Intrinsics;
use crate::error::CamParamsError;
use std::fs;
use std::path::Path;
use yaml_rust::YamlLoader;

/// Loads pinhole [`Intrinsics`] from a YAML file.
///
/// # Errors
///
/// * [`CamParamsError::Input`]: if the file cannot be read, is not valid YAML,
///   misses the `cam0.intrinsics` array, or names a camera model other than pinhole.
pub fn load_from_yaml(path: &Path) -> Result<Intrinsics, CamParamsError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| CamParamsError::input(path, format!("cannot read file: {e}")))?;
    let docs = YamlLoader::load_from_str(&contents)
        .map_err(|e| CamParamsError::input(path, format!("Failed to load YAML: {e}")))?;
    let doc = docs
        .first()
        .ok_or_else(|| CamParamsError::input(path, "YAML document is empty"))?;
    let cam = &doc["cam0"];

    if let Some(model) = cam["camera_model"].as_str() {
        if model != "pinhole" {
            return Err(CamParamsError::input(
                path,
                format!("unsupported camera model '{model}', expected 'pinhole'"),
            ));
        }
    }

    let intrinsics_yaml = cam["intrinsics"].as_vec().ok_or_else(|| {
        CamParamsError::input(path, "YAML missing 'intrinsics' or not an array")
    })?;
    if intrinsics_yaml.len() != 4 {
        return Err(CamParamsError::input(
            path,
            format!(
                "'intrinsics' must hold [fx, fy, cx, cy], found {} values",
                intrinsics_yaml.len()
            ),
        ));
    }

    let value = |idx: usize, name: &str| -> Result<f64, CamParamsError> {
        let item = &intrinsics_yaml[idx];
        item.as_f64()
            .or_else(|| item.as_i64().map(|v| v as f64))
            .ok_or_else(|| CamParamsError::input(path, format!("Invalid {name}: not a number")))
    };

    Ok(Intrinsics {
        fx: value(0, "fx")?,
        fy: value(1, "fy")?,
        cx: value(2, "cx")?,
        cy: value(3, "cy")?,
    })
}

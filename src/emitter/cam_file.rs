//! Standalone `.cam` files.
//!
//! ```text
//! tx ty tz r00 r01 r02 r10 r11 r12 r20 r21 r22
//! focal_length d0 d1 pixel_aspect ppx ppy
//! ```

use super::CamRecord;
use crate::camera::IntrinsicsModel;
use crate::error::CamParamsError;
use crate::util;
use std::fs;
use std::path::Path;

/// File name of the record for image `index`, e.g. `image_007.cam`.
pub fn file_name(index: usize) -> String {
    format!("image_{index:03}.cam")
}

/// Render the two lines of a `.cam` file.
pub fn render(record: &CamRecord) -> String {
    format!(
        "{}\n{}\n",
        util::join_values(&record.extrinsics_values()),
        util::join_values(&record.intrinsics.cam_values())
    )
}

pub fn write_cam_file(path: &Path, record: &CamRecord) -> Result<(), CamParamsError> {
    util::write_file_atomic(path, &render(record))
}

/// Parse the two lines of a `.cam` file back into a record.
pub fn parse(contents: &str) -> Result<CamRecord, String> {
    let mut lines = contents.lines().filter(|line| !line.trim().is_empty());
    let extrinsics = util::split_values(lines.next().ok_or("missing extrinsics line")?)?;
    let intrinsics = util::split_values(lines.next().ok_or("missing intrinsics line")?)?;

    if extrinsics.len() != 12 {
        return Err(format!(
            "extrinsics line holds {} values, expected 12",
            extrinsics.len()
        ));
    }
    if intrinsics.len() != 6 {
        return Err(format!(
            "intrinsics line holds {} values, expected 6",
            intrinsics.len()
        ));
    }

    let mut translation = [0.0; 3];
    let mut rotation = [0.0; 9];
    translation.copy_from_slice(&extrinsics[..3]);
    rotation.copy_from_slice(&extrinsics[3..]);

    Ok(CamRecord {
        translation,
        rotation,
        intrinsics: IntrinsicsModel {
            focal_length: intrinsics[0],
            radial_distortion: [intrinsics[1], intrinsics[2]],
            pixel_aspect: intrinsics[3],
            principal_point: [intrinsics[4], intrinsics[5]],
        },
    })
}

pub fn read_cam_file(path: &Path) -> Result<CamRecord, CamParamsError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| CamParamsError::input(path, format!("cannot read file: {e}")))?;
    parse(&contents).map_err(|reason| CamParamsError::input(path, reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ExtrinsicsMatrix;
    use nalgebra::{DMatrix, Rotation3, Vector3};

    fn full_hd() -> IntrinsicsModel {
        IntrinsicsModel {
            focal_length: 1000.0 / 36.0,
            radial_distortion: [0.0, 0.0],
            pixel_aspect: 1.0,
            principal_point: [960.0, 540.0],
        }
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name(0), "image_000.cam");
        assert_eq!(file_name(7), "image_007.cam");
        assert_eq!(file_name(123), "image_123.cam");
        assert_eq!(file_name(1234), "image_1234.cam");
    }

    #[test]
    fn test_render_identity_extrinsics() {
        let m = DMatrix::from_row_slice(
            3,
            4,
            &[1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 2.0, 0.0, 0.0, 1.0, 3.0],
        );
        let extrinsics = ExtrinsicsMatrix::from_matrix(&m).unwrap();
        let text = render(&CamRecord::new(&extrinsics, &full_hd()));

        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "1 2 3 1 0 0 0 1 0 0 0 1");
        assert_eq!(lines[1], "27.77777777777778 0 0 1 960 540");
    }

    #[test]
    fn test_identity_pose_has_no_negative_zero() {
        let extrinsics = ExtrinsicsMatrix::from_pose(&DMatrix::identity(4, 4)).unwrap();
        let text = render(&CamRecord::new(&extrinsics, &full_hd()));
        assert!(text.starts_with("0 0 0 1 0 0 0 1 0 0 0 1\n"));
    }

    #[test]
    fn test_written_file_parses_back() {
        let dir = tempfile::tempdir().unwrap();
        let rotation = Rotation3::from_euler_angles(0.25, -0.5, 1.75).into_inner();
        let extrinsics = ExtrinsicsMatrix::new(rotation, Vector3::new(0.1, -2.5e-7, 1234.5678));
        let record = CamRecord::new(&extrinsics, &full_hd());

        let path = dir.path().join(file_name(4));
        write_cam_file(&path, &record).unwrap();

        assert_eq!(read_cam_file(&path).unwrap(), record);
    }

    #[test]
    fn test_parse_rejects_short_lines() {
        assert!(parse("1 2 3\n1 0 0 1 0 0\n").is_err());
        assert!(parse("1 2 3 1 0 0 0 1 0 0 0 1\n").is_err());
        assert!(parse("1 2 3 1 0 0 0 1 0 0 0 1\n1 0 0 1 0\n").is_err());
    }
}

//! End-to-end conversion: intrinsics and pose/extrinsics inputs in, one camera
//! record per image out.

use crate::camera::{self, IntrinsicsModel};
use crate::emitter::{self, EmittedRecord, OutputMode};
use crate::error::CamParamsError;
use crate::extrinsics::{self, PoseSource, RigidityPolicy};
use crate::util;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything one run needs. Exactly one of `pose_dir` and `extrinsics_dir` must be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub intrinsics_file: PathBuf,
    pub pose_dir: Option<PathBuf>,
    pub extrinsics_dir: Option<PathBuf>,
    pub output_dir: PathBuf,
    #[serde(default)]
    pub mode: OutputMode,
    /// Reject non-rigid rotations instead of warning about them.
    #[serde(default)]
    pub strict_rigid: bool,
    /// Where to write a [`RunSummary`], if anywhere.
    #[serde(default)]
    pub manifest: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            intrinsics_file: PathBuf::from("intrinsics.txt"),
            pose_dir: None,
            extrinsics_dir: None,
            output_dir: PathBuf::from("images"),
            mode: OutputMode::Standalone,
            strict_rigid: false,
            manifest: None,
        }
    }
}

impl RunConfig {
    /// The single pose or extrinsics source of this run.
    ///
    /// # Errors
    ///
    /// * [`CamParamsError::Configuration`] if neither or both directories are given.
    pub fn pose_source(&self) -> Result<PoseSource, CamParamsError> {
        match (&self.pose_dir, &self.extrinsics_dir) {
            (Some(dir), None) => Ok(PoseSource::Poses(dir.clone())),
            (None, Some(dir)) => Ok(PoseSource::Extrinsics(dir.clone())),
            (None, None) => Err(CamParamsError::Configuration(
                "Neither pose nor extrinsics directory is specified.".to_string(),
            )),
            (Some(_), Some(_)) => Err(CamParamsError::Configuration(
                "Both pose and extrinsics directories are specified; give only one.".to_string(),
            )),
        }
    }

    pub fn rigidity_policy(&self) -> RigidityPolicy {
        if self.strict_rigid {
            RigidityPolicy::Reject
        } else {
            RigidityPolicy::Warn
        }
    }

    pub fn validate(&self) -> Result<(), CamParamsError> {
        self.pose_source().map(|_| ())
    }
}

/// What a run produced, in image index order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub mode: OutputMode,
    pub intrinsics: IntrinsicsModel,
    pub views: Vec<ViewSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewSummary {
    pub index: usize,
    pub source: PathBuf,
    pub output: PathBuf,
    /// Camera center in world coordinates.
    pub center: [f64; 3],
}

/// Run the whole conversion described by `config`.
///
/// All inputs are loaded and checked before the first output is written.
pub fn run(config: &RunConfig) -> Result<RunSummary, CamParamsError> {
    let source = config.pose_source()?;

    info!("Loading intrinsics from {}", config.intrinsics_file.display());
    let intrinsics = camera::load_intrinsics(&config.intrinsics_file)?;

    let views = extrinsics::resolve(&source, config.rigidity_policy())?;
    let emitted = emitter::emit(config.mode, &config.output_dir, &intrinsics, &views)?;

    let summary = RunSummary {
        mode: config.mode,
        intrinsics,
        views: views
            .iter()
            .zip(emitted)
            .map(|(view, EmittedRecord { index, source, output })| {
                let c = view.extrinsics.camera_center();
                ViewSummary {
                    index,
                    source,
                    output,
                    center: [c.x, c.y, c.z],
                }
            })
            .collect(),
    };

    if let Some(manifest) = &config.manifest {
        write_manifest(manifest, &summary)?;
        info!("Wrote run manifest to {}", manifest.display());
    }

    Ok(summary)
}

/// Write `summary` as YAML (`.yaml`/`.yml`) or JSON (anything else).
pub fn write_manifest(path: &Path, summary: &RunSummary) -> Result<(), CamParamsError> {
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    let contents = if is_yaml {
        serde_yaml::to_string(summary).map_err(|e| {
            CamParamsError::io(path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?
    } else {
        serde_json::to_string_pretty(summary).map_err(|e| CamParamsError::io(path, e.into()))?
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        util::ensure_output_dir(parent)?;
    }
    util::write_file_atomic(path, &contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::cam_file;
    use crate::emitter::meta_ini::MetaStore;
    use approx::assert_relative_eq;
    use std::fs;

    fn config(root: &Path) -> RunConfig {
        fs::write(root.join("intrinsics.txt"), "1000 0 960\n0 1000 540\n0 0 1\n").unwrap();
        RunConfig {
            intrinsics_file: root.join("intrinsics.txt"),
            output_dir: root.join("images"),
            ..RunConfig::default()
        }
    }

    #[test]
    fn test_source_selection() {
        let mut config = RunConfig::default();
        assert!(matches!(
            config.validate(),
            Err(CamParamsError::Configuration(_))
        ));

        config.pose_dir = Some(PathBuf::from("poses"));
        assert_eq!(
            config.pose_source().unwrap(),
            PoseSource::Poses(PathBuf::from("poses"))
        );

        config.extrinsics_dir = Some(PathBuf::from("extrinsics"));
        assert!(matches!(
            config.validate(),
            Err(CamParamsError::Configuration(_))
        ));

        config.pose_dir = None;
        assert_eq!(
            config.pose_source().unwrap(),
            PoseSource::Extrinsics(PathBuf::from("extrinsics"))
        );
    }

    #[test]
    fn test_missing_source_fails_before_any_output() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        assert!(matches!(run(&config), Err(CamParamsError::Configuration(_))));
        assert!(!config.output_dir.exists());
    }

    #[test]
    fn test_extrinsics_to_standalone() {
        let dir = tempfile::tempdir().unwrap();
        let extrinsics_dir = dir.path().join("extrinsics");
        fs::create_dir(&extrinsics_dir).unwrap();
        fs::write(extrinsics_dir.join("0.txt"), "1 0 0 1\n0 1 0 2\n0 0 1 3\n").unwrap();

        let config = RunConfig {
            extrinsics_dir: Some(extrinsics_dir),
            ..config(dir.path())
        };
        let summary = run(&config).unwrap();

        let text = fs::read_to_string(config.output_dir.join("image_000.cam")).unwrap();
        assert_eq!(
            text,
            "1 2 3 1 0 0 0 1 0 0 0 1\n27.77777777777778 0 0 1 960 540\n"
        );
        assert_eq!(summary.views.len(), 1);
        assert_relative_eq!(summary.views[0].center[2], -3.0);
    }

    #[test]
    fn test_poses_to_standalone_round_trip_and_determinism() {
        let dir = tempfile::tempdir().unwrap();
        let pose_dir = dir.path().join("poses");
        fs::create_dir(&pose_dir).unwrap();
        fs::write(pose_dir.join("0.txt"), "1 0 0 0\n0 1 0 0\n0 0 1 0\n0 0 0 1\n").unwrap();
        fs::write(pose_dir.join("1.txt"), "0 -1 0 1\n1 0 0 2\n0 0 1 3\n0 0 0 1\n").unwrap();
        fs::write(pose_dir.join("10.txt"), "1 0 0 5\n0 1 0 0\n0 0 1 0\n0 0 0 1\n").unwrap();

        let config = RunConfig {
            pose_dir: Some(pose_dir),
            ..config(dir.path())
        };
        let first = run(&config).unwrap();
        let first_bytes = fs::read(config.output_dir.join("image_002.cam")).unwrap();
        let second = run(&config).unwrap();
        let second_bytes = fs::read(config.output_dir.join("image_002.cam")).unwrap();

        assert_eq!(first, second);
        assert_eq!(first_bytes, second_bytes);
        assert!(first.views[2].source.ends_with("10.txt"));

        // 1.txt: R_p rotates x onto y, center (1, 2, 3)
        let record = cam_file::read_cam_file(&config.output_dir.join("image_001.cam")).unwrap();
        assert_eq!(record.rotation, [0.0, 1.0, 0.0, -1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(record.translation, [-2.0, 1.0, -3.0]);
        assert_eq!(first.views[1].center, [1.0, 2.0, 3.0]);

        let record = cam_file::read_cam_file(&config.output_dir.join("image_000.cam")).unwrap();
        assert_eq!(record.translation, [0.0, 0.0, 0.0]);
        assert_relative_eq!(record.intrinsics.focal_length, 1000.0 / 36.0);
    }

    #[test]
    fn test_poses_to_merged_views() {
        let dir = tempfile::tempdir().unwrap();
        let pose_dir = dir.path().join("poses");
        let views_dir = dir.path().join("views");
        fs::create_dir(&pose_dir).unwrap();
        for idx in 0..2 {
            fs::write(
                pose_dir.join(format!("{idx:04}.txt")),
                format!("1 0 0 {idx}\n0 1 0 0\n0 0 1 0\n0 0 0 1\n"),
            )
            .unwrap();
            let view = views_dir.join(format!("view_{idx:04}.mve"));
            fs::create_dir_all(&view).unwrap();
            fs::write(view.join("meta.ini"), format!("[view]\nid = {idx}\n")).unwrap();
        }

        let config = RunConfig {
            pose_dir: Some(pose_dir),
            output_dir: views_dir.clone(),
            mode: OutputMode::Merged,
            ..config(dir.path())
        };
        run(&config).unwrap();

        let store = MetaStore::load(&views_dir.join("view_0001.mve").join("meta.ini")).unwrap();
        assert_eq!(store.get("camera", "translation"), Some("-1 0 0"));
        assert_eq!(store.get("camera", "principal_point"), Some("960 540"));
        assert_eq!(store.get("camera", "radial_distortion"), Some("0 0"));
        assert_eq!(store.get("view", "id"), Some("1"));
    }

    #[test]
    fn test_bad_pose_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let pose_dir = dir.path().join("poses");
        fs::create_dir(&pose_dir).unwrap();
        fs::write(pose_dir.join("0.txt"), "1 0 0 0\n0 1 0 0\n0 0 1 0\n0 0 0 1\n").unwrap();
        fs::write(pose_dir.join("1.txt"), "not a matrix\n").unwrap();

        let config = RunConfig {
            pose_dir: Some(pose_dir),
            ..config(dir.path())
        };
        assert!(matches!(run(&config), Err(CamParamsError::Input { .. })));
        assert!(!config.output_dir.join("image_000.cam").exists());
    }

    #[test]
    fn test_manifest_formats() {
        let dir = tempfile::tempdir().unwrap();
        let extrinsics_dir = dir.path().join("extrinsics");
        fs::create_dir(&extrinsics_dir).unwrap();
        fs::write(extrinsics_dir.join("a.txt"), "1 0 0 1\n0 1 0 2\n0 0 1 3\n").unwrap();

        let json_path = dir.path().join("reports").join("summary.json");
        let config = RunConfig {
            extrinsics_dir: Some(extrinsics_dir),
            manifest: Some(json_path.clone()),
            ..config(dir.path())
        };
        let summary = run(&config).unwrap();

        let parsed: RunSummary =
            serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(parsed, summary);

        let yaml_path = dir.path().join("summary.yaml");
        write_manifest(&yaml_path, &summary).unwrap();
        let parsed: RunSummary =
            serde_yaml::from_str(&fs::read_to_string(&yaml_path).unwrap()).unwrap();
        assert_eq!(parsed.views, summary.views);
        assert_eq!(parsed.mode, OutputMode::Standalone);
    }
}

//! Camera Parameter Generation Library
//!
//! Converts a shared pinhole calibration and a directory of per-image camera
//! poses (camera-to-world) or extrinsics (world-to-camera) into the per-image
//! camera files read by multi-view texturing pipelines:
//! - standalone `.cam` files, one per image
//! - the `camera` section of an existing per-image `meta.ini`
//!
//! The pipeline is a single synchronous pass: the intrinsics are normalized
//! once, every pose file is resolved into `[R | t]` in sorted filename order,
//! and one record is written per image.

pub mod camera;
pub mod emitter;
pub mod error;
pub mod extrinsics;
pub mod geometry;
pub mod pipeline;
pub mod util;

// Re-export commonly used types
pub use camera::{Intrinsics, IntrinsicsModel, SENSOR_WIDTH_MM};
pub use emitter::{CamRecord, OutputMode};
pub use error::CamParamsError;
pub use extrinsics::{PoseSource, ResolvedView, RigidityPolicy};
pub use geometry::ExtrinsicsMatrix;
pub use pipeline::{run, RunConfig, RunSummary};

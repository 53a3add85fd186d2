//! # framegrid - frame sequence and grid video builder
//!
//! `framegrid` turns directories of still images into videos and tiles
//! frames or whole videos into 2x2 grids. Encoding is delegated to the
//! system `ffmpeg` binary.
//!
//! ## Features
//!
//! - Encode a directory of `.png` frames as a 20 fps video
//! - Tile same-named frames from four directories into a 2x2 grid video,
//!   optionally labeling each quadrant
//! - Composite four finished videos into a 2x2 grid in one ffmpeg pass
//! - Progress reporting for integration with UI applications
//!
//! ## Example
//!
//! ```no_run
//! use framegrid::{AppConfig, GridParams};
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load(None)?;
//! let params = GridParams {
//!     dirs: ["run_a", "run_b", "run_c", "run_d"].map(PathBuf::from),
//!     output: PathBuf::from("grid.avi"),
//!     annotate: true,
//! };
//! let frames = framegrid::grid::grid_to_file(&params, &config, |_| {})?;
//! println!("wrote {} frames", frames);
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing without ffmpeg
//!
//! The frame builders write into any [`FrameSink`]. [`InMemorySink`] keeps
//! the frames so they can be compared pixel for pixel:
//!
//! ```no_run
//! use framegrid::{InMemorySink, SequenceParams};
//! use std::path::PathBuf;
//!
//! let params = SequenceParams {
//!     image_dir: PathBuf::from("frames"),
//!     output: PathBuf::from("unused.avi"),
//! };
//! let mut sink = InMemorySink::new();
//! framegrid::sequence::build_sequence_video(&params, &mut sink, |p| {
//!     println!("{}", p.message);
//! })
//! .unwrap();
//! assert!(!sink.frames().is_empty());
//! ```

pub mod composite;
pub mod config;
pub mod encode;
pub mod error;
pub mod frames;
pub mod grid;
pub mod label;
pub mod sequence;

pub use composite::{composite_videos, CompositeParams, CompositeReport};
pub use config::{AppConfig, FfmpegConfig, LabelConfig};
pub use encode::{FfmpegSink, FrameSink, InMemorySink, SinkConfig, FOURCC, FPS};
pub use error::{Error, Result};
pub use frames::FrameSet;
pub use grid::{build_grid_video, compose_quad, grid_to_file, GridParams};
pub use label::{Annotator, LabelStyle, Quadrant};
pub use sequence::{build_sequence_video, sequence_to_file, SequenceParams};

/// Represents the current phase of a build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    /// Decoding source frames into memory
    LoadingFrames,
    /// Pushing frames to the encoder
    WritingFrames,
    /// All frames written and the encoder closed
    Complete,
}

/// Progress information for frame builds
#[derive(Debug, Clone)]
pub struct Progress {
    /// Current phase of the build
    pub phase: ProgressPhase,
    /// Number of frames completed in the current phase
    pub completed: usize,
    /// Total number of frames in the current phase
    pub total: usize,
    /// Percentage complete (0.0 to 100.0)
    pub percentage: f64,
    /// Human-readable message describing current status
    pub message: String,
}

fn percentage(completed: usize, total: usize) -> f64 {
    if total > 0 {
        (completed as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

impl Progress {
    pub fn loading_frames(completed: usize, total: usize) -> Self {
        Self {
            phase: ProgressPhase::LoadingFrames,
            completed,
            total,
            percentage: percentage(completed, total),
            message: format!("Loading frame {} of {}", completed, total),
        }
    }

    pub fn writing_frames(completed: usize, total: usize) -> Self {
        Self {
            phase: ProgressPhase::WritingFrames,
            completed,
            total,
            percentage: percentage(completed, total),
            message: format!("Writing frame {} of {}", completed, total),
        }
    }

    pub fn complete(total_frames: usize) -> Self {
        Self {
            phase: ProgressPhase::Complete,
            completed: total_frames,
            total: total_frames,
            percentage: 100.0,
            message: format!("Video complete: {} frames", total_frames),
        }
    }
}

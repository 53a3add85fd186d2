use std::path::PathBuf;
use std::process::ExitStatus;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the frame and video builders.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode frame {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("no .png frames found in {0}")]
    EmptyFrameSet(PathBuf),

    #[error("frame names in {dir} differ from {reference}: missing [{}], extra [{}]", .missing.join(", "), .extra.join(", "))]
    FrameSetMismatch {
        reference: PathBuf,
        dir: PathBuf,
        missing: Vec<String>,
        extra: Vec<String>,
    },

    #[error("frame size mismatch for {what}: got {got_w}x{got_h}, expected {want_w}x{want_h}")]
    DimensionMismatch {
        what: String,
        got_w: u32,
        got_h: u32,
        want_w: u32,
        want_h: u32,
    },

    #[error("no usable font for quadrant labels: {0}")]
    FontUnavailable(String),

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("ffmpeg exited with {status}: {stderr}")]
    Ffmpeg { status: ExitStatus, stderr: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

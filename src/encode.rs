//! Video output.
//!
//! Frames are pushed into a [`FrameSink`]. [`FfmpegSink`] pipes raw RGB into
//! the system `ffmpeg` binary; [`InMemorySink`] keeps them for inspection.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use image::RgbImage;

use crate::config::FfmpegConfig;
use crate::error::{Error, Result};

/// Output frame rate of every encoded video.
pub const FPS: u32 = 20;

/// Four-character codec tag written into the container.
pub const FOURCC: &str = "DIVX";

/// Geometry handed to a sink before the first frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl SinkConfig {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            fps: FPS,
        }
    }

    fn check_frame(&self, frame: &RgbImage, index: usize) -> Result<()> {
        let (w, h) = frame.dimensions();
        if (w, h) != (self.width, self.height) {
            return Err(Error::DimensionMismatch {
                what: format!("output frame {}", index),
                got_w: w,
                got_h: h,
                want_w: self.width,
                want_h: self.height,
            });
        }
        Ok(())
    }
}

/// Consumer of frames in presentation order.
pub trait FrameSink {
    /// Called once before any frame.
    fn begin(&mut self, cfg: SinkConfig) -> Result<()>;
    /// Push the next frame. Its size must match the config given to `begin`.
    fn push_frame(&mut self, frame: &RgbImage) -> Result<()>;
    /// Called once after the last frame.
    fn end(&mut self) -> Result<()>;
}

/// Keeps every frame in memory.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<RgbImage>,
    finished: bool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    pub fn frames(&self) -> &[RgbImage] {
        &self.frames
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> Result<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.finished = false;
        Ok(())
    }

    fn push_frame(&mut self, frame: &RgbImage) -> Result<()> {
        let cfg = self
            .cfg
            .ok_or_else(|| anyhow::anyhow!("push_frame called before begin"))?;
        cfg.check_frame(frame, self.frames.len())?;
        self.frames.push(frame.clone());
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

/// Streams frames into `ffmpeg`, producing an MPEG-4 video tagged `DIVX`.
/// An existing file at the output path is overwritten.
pub struct FfmpegSink {
    ffmpeg: FfmpegConfig,
    out_path: PathBuf,
    cfg: Option<SinkConfig>,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
    pushed: usize,
}

impl FfmpegSink {
    pub fn new(ffmpeg: FfmpegConfig, out_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg,
            out_path: out_path.into(),
            cfg: None,
            child: None,
            stdin: None,
            stderr_drain: None,
            pushed: 0,
        }
    }

    pub fn out_path(&self) -> &Path {
        &self.out_path
    }

    /// Full argument list passed to ffmpeg for a given geometry.
    pub fn command_args(&self, cfg: SinkConfig) -> Vec<String> {
        vec![
            "-y".into(),
            "-loglevel".into(),
            "error".into(),
            "-f".into(),
            "rawvideo".into(),
            "-pix_fmt".into(),
            "rgb24".into(),
            "-s".into(),
            format!("{}x{}", cfg.width, cfg.height),
            "-r".into(),
            cfg.fps.to_string(),
            "-i".into(),
            "pipe:0".into(),
            "-an".into(),
            "-c:v".into(),
            "mpeg4".into(),
            "-vtag".into(),
            FOURCC.into(),
            self.out_path.to_string_lossy().into_owned(),
        ]
    }

    fn program(&self) -> String {
        self.ffmpeg.ffmpeg_cmd().to_string_lossy().into_owned()
    }

    /// Wait for ffmpeg and turn its exit into a result.
    fn finish_child(&mut self) -> Result<()> {
        drop(self.stdin.take());

        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child.wait().map_err(|source| Error::Spawn {
            program: self.program(),
            source,
        })?;

        let stderr = match self.stderr_drain.take() {
            Some(handle) => match handle.join() {
                Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes).trim().to_string(),
                Ok(Err(e)) => format!("<failed to read stderr: {e}>"),
                Err(_) => "<stderr reader panicked>".to_string(),
            },
            None => String::new(),
        };

        if !status.success() {
            return Err(Error::Ffmpeg { status, stderr });
        }
        Ok(())
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> Result<()> {
        if cfg.width == 0 || cfg.height == 0 {
            return Err(anyhow::anyhow!("video width/height must be non-zero").into());
        }
        if let Some(parent) = self.out_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            }
        }

        let args = self.command_args(cfg);
        tracing::debug!(program = %self.program(), args = ?args, "spawning encoder");

        let mut child = Command::new(self.ffmpeg.ffmpeg_cmd())
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| Error::Spawn {
                program: self.program(),
                source,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow::anyhow!("failed to open ffmpeg stdin"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow::anyhow!("failed to open ffmpeg stderr"))?;
        self.stderr_drain = Some(std::thread::spawn(move || {
            let mut buf = Vec::new();
            stderr.read_to_end(&mut buf)?;
            Ok(buf)
        }));

        self.child = Some(child);
        self.stdin = Some(stdin);
        self.cfg = Some(cfg);
        self.pushed = 0;
        Ok(())
    }

    fn push_frame(&mut self, frame: &RgbImage) -> Result<()> {
        let cfg = self
            .cfg
            .ok_or_else(|| anyhow::anyhow!("push_frame called before begin"))?;
        cfg.check_frame(frame, self.pushed)?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(anyhow::anyhow!("encoder is already finished").into());
        };
        if let Err(e) = stdin.write_all(frame.as_raw()) {
            // A broken pipe means ffmpeg quit early; its exit status and
            // stderr say why.
            if e.kind() == std::io::ErrorKind::BrokenPipe {
                self.finish_child()?;
            }
            return Err(Error::io(&self.out_path, e));
        }
        self.pushed += 1;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.finish_child()?;
        tracing::debug!(frames = self.pushed, out = %self.out_path.display(), "encoder finished");
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::test_support::solid;

    #[test]
    fn in_memory_sink_rejects_size_change() {
        let mut sink = InMemorySink::new();
        sink.begin(SinkConfig::new(4, 2)).unwrap();
        sink.push_frame(&solid(4, 2, [1, 1, 1])).unwrap();
        let err = sink.push_frame(&solid(2, 4, [1, 1, 1])).unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                got_w: 2,
                got_h: 4,
                want_w: 4,
                want_h: 2,
                ..
            }
        ));
        assert_eq!(sink.frames().len(), 1);
    }

    #[test]
    fn in_memory_sink_requires_begin() {
        let mut sink = InMemorySink::new();
        assert!(sink.push_frame(&solid(1, 1, [0, 0, 0])).is_err());
    }

    #[test]
    fn sink_config_uses_fixed_rate() {
        assert_eq!(SinkConfig::new(8, 6).fps, 20);
    }

    #[test]
    fn ffmpeg_args_pin_codec_and_rate() {
        let sink = FfmpegSink::new(FfmpegConfig::default(), "out/video.avi");
        let args = sink.command_args(SinkConfig::new(128, 96));
        let joined = args.join(" ");
        assert!(joined.starts_with("-y "));
        assert!(joined.contains("-f rawvideo -pix_fmt rgb24 -s 128x96 -r 20 -i pipe:0"));
        assert!(joined.contains("-c:v mpeg4 -vtag DIVX"));
        assert_eq!(args.last().map(String::as_str), Some("out/video.avi"));
    }

    #[test]
    fn missing_binary_is_a_spawn_error() {
        let ffmpeg = FfmpegConfig {
            path: Some(PathBuf::from("/definitely/not/a/real/ffmpeg")),
        };
        let tmp = tempfile::tempdir().unwrap();
        let mut sink = FfmpegSink::new(ffmpeg, tmp.path().join("out.avi"));
        let err = sink.begin(SinkConfig::new(2, 2)).unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }
}

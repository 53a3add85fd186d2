//! Image sequence to video.

use std::path::PathBuf;

use image::RgbImage;

use crate::config::AppConfig;
use crate::encode::{FfmpegSink, FrameSink, SinkConfig};
use crate::error::{Error, Result};
use crate::frames::{load_frame, FrameSet};
use crate::Progress;

/// Inputs of one sequence build.
#[derive(Debug, Clone)]
pub struct SequenceParams {
    pub image_dir: PathBuf,
    pub output: PathBuf,
}

/// Decode every frame of `params.image_dir`, then write them all into
/// `sink` in file-name order. Returns the number of frames written.
///
/// The whole sequence is held in memory before the first frame is encoded,
/// so an unreadable file fails the run before any output is produced.
pub fn build_sequence_video<F>(
    params: &SequenceParams,
    sink: &mut dyn FrameSink,
    progress: F,
) -> Result<usize>
where
    F: Fn(Progress),
{
    let set = FrameSet::scan(&params.image_dir)?;
    if set.is_empty() {
        return Err(Error::EmptyFrameSet(params.image_dir.clone()));
    }
    let total = set.len();

    progress(Progress::loading_frames(0, total));
    let mut frames: Vec<RgbImage> = Vec::with_capacity(total);
    for (i, path) in set.paths().enumerate() {
        tracing::info!(file = %path.display(), "reading frame");
        frames.push(load_frame(&path)?);
        progress(Progress::loading_frames(i + 1, total));
    }

    let (width, height) = frames[0].dimensions();
    sink.begin(SinkConfig::new(width, height))?;
    progress(Progress::writing_frames(0, total));
    for (i, frame) in frames.iter().enumerate() {
        sink.push_frame(frame)?;
        progress(Progress::writing_frames(i + 1, total));
    }
    sink.end()?;

    progress(Progress::complete(total));
    Ok(total)
}

/// Build the sequence video and encode it to `params.output` with ffmpeg.
pub fn sequence_to_file<F>(params: &SequenceParams, config: &AppConfig, progress: F) -> Result<usize>
where
    F: Fn(Progress),
{
    let mut sink = FfmpegSink::new(config.ffmpeg.clone(), &params.output);
    build_sequence_video(params, &mut sink, progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::InMemorySink;
    use crate::frames::test_support::{gradient, solid, write_png};

    fn params(dir: &std::path::Path) -> SequenceParams {
        SequenceParams {
            image_dir: dir.to_path_buf(),
            output: dir.join("out.avi"),
        }
    }

    #[test]
    fn writes_every_frame_in_name_order() {
        let tmp = tempfile::tempdir().unwrap();
        let names = ["img_03.png", "img_01.png", "img_02.png", "img_10.png"];
        for (i, name) in names.iter().enumerate() {
            write_png(tmp.path(), name, &gradient(6, 4, (i as u8) * 40));
        }

        let mut sink = InMemorySink::new();
        let n = build_sequence_video(&params(tmp.path()), &mut sink, |_| {}).unwrap();
        assert_eq!(n, 4);
        assert_eq!(sink.config(), Some(SinkConfig::new(6, 4)));

        // img_01, img_02, img_03, img_10
        let expected_seeds = [40u8, 80, 0, 120];
        assert_eq!(sink.frames().len(), 4);
        for (frame, seed) in sink.frames().iter().zip(expected_seeds) {
            assert_eq!(frame, &gradient(6, 4, seed));
        }
    }

    #[test]
    fn ignores_non_png_files() {
        let tmp = tempfile::tempdir().unwrap();
        write_png(tmp.path(), "a.png", &solid(2, 2, [9, 9, 9]));
        std::fs::write(tmp.path().join("readme.txt"), "hi").unwrap();
        let mut sink = InMemorySink::new();
        assert_eq!(
            build_sequence_video(&params(tmp.path()), &mut sink, |_| {}).unwrap(),
            1
        );
    }

    #[test]
    fn empty_directory_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let mut sink = InMemorySink::new();
        let err = build_sequence_video(&params(tmp.path()), &mut sink, |_| {}).unwrap_err();
        assert!(matches!(err, Error::EmptyFrameSet(_)));
        assert!(sink.config().is_none());
    }

    #[test]
    fn unreadable_frame_stops_before_encoding() {
        let tmp = tempfile::tempdir().unwrap();
        write_png(tmp.path(), "a.png", &solid(2, 2, [1, 2, 3]));
        std::fs::write(tmp.path().join("b.png"), b"garbage").unwrap();
        let mut sink = InMemorySink::new();
        let err = build_sequence_video(&params(tmp.path()), &mut sink, |_| {}).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
        assert!(sink.config().is_none());
    }

    #[test]
    fn size_change_mid_sequence_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        write_png(tmp.path(), "a.png", &solid(4, 4, [1, 2, 3]));
        write_png(tmp.path(), "b.png", &solid(8, 4, [1, 2, 3]));
        let mut sink = InMemorySink::new();
        let err = build_sequence_video(&params(tmp.path()), &mut sink, |_| {}).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { got_w: 8, .. }));
    }

    #[test]
    fn rerun_is_identical() {
        let tmp = tempfile::tempdir().unwrap();
        for i in 0..3u8 {
            write_png(tmp.path(), &format!("f{i}.png"), &gradient(3, 3, i));
        }
        let mut a = InMemorySink::new();
        let mut b = InMemorySink::new();
        build_sequence_video(&params(tmp.path()), &mut a, |_| {}).unwrap();
        build_sequence_video(&params(tmp.path()), &mut b, |_| {}).unwrap();
        assert_eq!(a.frames(), b.frames());
    }
}

//! Four-way frame grid: same-named images from four directories tiled 2x2.

use std::path::PathBuf;

use image::{GenericImage, RgbImage};

use crate::config::AppConfig;
use crate::encode::{FfmpegSink, FrameSink, SinkConfig};
use crate::error::{Error, Result};
use crate::frames::{check_matching_sets, load_frame, FrameSet};
use crate::label::{Annotator, Quadrant};
use crate::Progress;

/// Inputs of one grid build.
#[derive(Debug, Clone)]
pub struct GridParams {
    /// Top-left, top-right, bottom-left, bottom-right.
    pub dirs: [PathBuf; 4],
    pub output: PathBuf,
    /// Stamp each quadrant with its position name.
    pub annotate: bool,
}

/// Tile four equally sized images: `[0] [1]` over `[2] [3]`.
pub fn compose_quad(images: &[RgbImage; 4]) -> Result<RgbImage> {
    let (w, h) = images[0].dimensions();
    for (quadrant, img) in Quadrant::ALL.iter().zip(images.iter()).skip(1) {
        if img.dimensions() != (w, h) {
            return Err(Error::DimensionMismatch {
                what: format!("{} quadrant", quadrant.label()),
                got_w: img.width(),
                got_h: img.height(),
                want_w: w,
                want_h: h,
            });
        }
    }

    let mut out = RgbImage::new(w * 2, h * 2);
    for (quadrant, img) in Quadrant::ALL.iter().zip(images.iter()) {
        let (x, y) = quadrant.origin(w, h);
        out.copy_from(img, x, y)
            .map_err(|e| anyhow::anyhow!("placing {} quadrant: {}", quadrant.label(), e))?;
    }
    Ok(out)
}

/// Build the grid video into `sink`. Returns the number of frames written.
///
/// Frame names come from the first directory. All four directories must
/// hold the same `.png` names; this is checked before any frame is read.
pub fn build_grid_video<F>(
    params: &GridParams,
    annotator: Option<&Annotator>,
    sink: &mut dyn FrameSink,
    progress: F,
) -> Result<usize>
where
    F: Fn(Progress),
{
    if params.annotate && annotator.is_none() {
        return Err(Error::FontUnavailable(
            "labels requested but no annotator was supplied".to_string(),
        ));
    }

    let sets = params
        .dirs
        .iter()
        .map(|d| FrameSet::scan(d))
        .collect::<Result<Vec<_>>>()?;
    let names = sets[0].names().to_vec();
    if names.is_empty() {
        return Err(Error::EmptyFrameSet(params.dirs[0].clone()));
    }
    check_matching_sets(&sets)?;

    let total = names.len();
    let annotator = if params.annotate { annotator } else { None };
    progress(Progress::writing_frames(0, total));

    for (i, name) in names.iter().enumerate() {
        let mut images = Vec::with_capacity(4);
        for (set, quadrant) in sets.iter().zip(Quadrant::ALL) {
            let mut image = load_frame(&set.path_of(name))?;
            if let Some(a) = annotator {
                a.stamp(&mut image, quadrant);
            }
            images.push(image);
        }
        let images: [RgbImage; 4] = images.try_into().map_err(|_| {
            anyhow::anyhow!("expected four images for frame {}", name.to_string_lossy())
        })?;

        if i == 0 {
            let (w, h) = images[0].dimensions();
            sink.begin(SinkConfig::new(w * 2, h * 2))?;
        }

        let frame = compose_quad(&images)?;
        sink.push_frame(&frame)?;
        tracing::info!(frame = %name.to_string_lossy(), "wrote frame");
        progress(Progress::writing_frames(i + 1, total));
    }

    sink.end()?;
    progress(Progress::complete(total));
    Ok(total)
}

/// Build the grid video and encode it to `params.output` with ffmpeg.
pub fn grid_to_file<F>(params: &GridParams, config: &AppConfig, progress: F) -> Result<usize>
where
    F: Fn(Progress),
{
    let annotator = if params.annotate {
        Some(Annotator::load(
            config.label.font.as_deref(),
            config.label.style(),
        )?)
    } else {
        None
    };
    let mut sink = FfmpegSink::new(config.ffmpeg.clone(), &params.output);
    build_grid_video(params, annotator.as_ref(), &mut sink, progress)
}

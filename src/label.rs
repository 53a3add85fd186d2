//! Quadrant labels stamped onto grid frames.

use std::path::Path;

use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_text_mut;

use crate::error::{Error, Result};

/// Position of one input inside the 2x2 grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quadrant {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Quadrant {
    /// Grid order: the index matches the input directory index.
    pub const ALL: [Quadrant; 4] = [
        Quadrant::TopLeft,
        Quadrant::TopRight,
        Quadrant::BottomLeft,
        Quadrant::BottomRight,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Quadrant::TopLeft => "top-left",
            Quadrant::TopRight => "top-right",
            Quadrant::BottomLeft => "bottom-left",
            Quadrant::BottomRight => "bottom-right",
        }
    }

    /// Pixel offset of this quadrant in a grid of `w`x`h` cells.
    pub fn origin(self, w: u32, h: u32) -> (u32, u32) {
        match self {
            Quadrant::TopLeft => (0, 0),
            Quadrant::TopRight => (w, 0),
            Quadrant::BottomLeft => (0, h),
            Quadrant::BottomRight => (w, h),
        }
    }
}

/// How labels look and where they sit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelStyle {
    pub size_px: f32,
    pub color: [u8; 3],
    /// Distance of the text origin from the left edge.
    pub offset_x: u32,
    /// Distance of the text baseline from the bottom edge.
    pub offset_y: u32,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            size_px: 30.0,
            color: [255, 255, 255],
            offset_x: 50,
            offset_y: 50,
        }
    }
}

/// Pixel rectangle, `x0..x1` by `y0..y1`, clipped to the image.
#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Region {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

#[cfg(test)]
impl Region {
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }

    pub fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }
}

/// Label font used when none is configured: DejaVu Sans.
/// Licence: `assets/LICENSE-DejaVu.txt`.
static DEFAULT_FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

/// Draws quadrant labels with one loaded font.
pub struct Annotator {
    font: FontArc,
    style: LabelStyle,
}

impl Annotator {
    /// Annotator using the bundled DejaVu Sans.
    pub fn bundled(style: LabelStyle) -> Result<Self> {
        let font = FontArc::try_from_slice(DEFAULT_FONT)
            .map_err(|e| Error::FontUnavailable(format!("bundled font: {e}")))?;
        Ok(Self { font, style })
    }

    pub fn from_font_file(path: &Path, style: LabelStyle) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        let font = FontArc::try_from_vec(data)
            .map_err(|e| Error::FontUnavailable(format!("{}: {}", path.display(), e)))?;
        Ok(Self { font, style })
    }

    /// Use `font` when given, otherwise the bundled font.
    pub fn load(font: Option<&Path>, style: LabelStyle) -> Result<Self> {
        match font {
            Some(path) => {
                tracing::debug!(font = %path.display(), "loading label font");
                Self::from_font_file(path, style)
            }
            None => Self::bundled(style),
        }
    }

    fn scale(&self) -> PxScale {
        PxScale::from(self.style.size_px)
    }

    /// Top-left corner handed to the text renderer so that the baseline
    /// lands `offset_y` pixels above the bottom edge.
    fn text_origin(&self, height: u32) -> (i32, i32) {
        let ascent = self.font.as_scaled(self.scale()).ascent();
        let baseline = height as i32 - self.style.offset_y as i32;
        (
            self.style.offset_x as i32,
            baseline - ascent.round() as i32,
        )
    }

    /// Area of a `width`x`height` image the label for `quadrant` may touch.
    #[cfg(test)]
    pub(crate) fn label_region(&self, width: u32, height: u32, quadrant: Quadrant) -> Region {
        let (x, y) = self.text_origin(height);
        let (tw, th) = imageproc::drawing::text_size(self.scale(), &self.font, quadrant.label());
        let scaled = self.font.as_scaled(self.scale());
        let th = th.max((scaled.ascent() - scaled.descent()).ceil() as u32);
        // Anti-aliased edges can spill a pixel past the layout box.
        let pad = 2;
        let clamp_x = |v: i64| v.clamp(0, width as i64) as u32;
        let clamp_y = |v: i64| v.clamp(0, height as i64) as u32;
        Region {
            x0: clamp_x(x as i64 - pad),
            y0: clamp_y(y as i64 - pad),
            x1: clamp_x(x as i64 + tw as i64 + pad),
            y1: clamp_y(y as i64 + th as i64 + pad),
        }
    }

    /// Draw the label of `quadrant` onto `image`.
    pub fn stamp(&self, image: &mut RgbImage, quadrant: Quadrant) {
        let (x, y) = self.text_origin(image.height());
        draw_text_mut(
            image,
            Rgb(self.style.color),
            x,
            y,
            self.scale(),
            &self.font,
            quadrant.label(),
        );
    }
}

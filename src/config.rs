use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::label::LabelStyle;

/// File name looked up in the data directory and the working directory.
pub const CONFIG_FILE_NAME: &str = "framegrid.json";

/// Which `ffmpeg` binary to run.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FfmpegConfig {
    /// Explicit binary path; `ffmpeg` from PATH when unset.
    pub path: Option<PathBuf>,
}

impl FfmpegConfig {
    pub fn ffmpeg_cmd(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| PathBuf::from("ffmpeg"))
    }

    /// Whether the configured binary answers `-version`.
    pub fn is_available(&self) -> bool {
        std::process::Command::new(self.ffmpeg_cmd())
            .arg("-version")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

fn default_label_size() -> f32 {
    30.0
}

fn default_label_color() -> [u8; 3] {
    [255, 255, 255]
}

fn default_label_offset() -> u32 {
    50
}

/// Quadrant label settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LabelConfig {
    /// TrueType/OpenType font file; the bundled DejaVu Sans is used when unset.
    #[serde(default)]
    pub font: Option<PathBuf>,
    #[serde(default = "default_label_size")]
    pub size_px: f32,
    #[serde(default = "default_label_color")]
    pub color: [u8; 3],
    #[serde(default = "default_label_offset")]
    pub offset_x: u32,
    #[serde(default = "default_label_offset")]
    pub offset_y: u32,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            font: None,
            size_px: default_label_size(),
            color: default_label_color(),
            offset_x: default_label_offset(),
            offset_y: default_label_offset(),
        }
    }
}

impl LabelConfig {
    pub fn style(&self) -> LabelStyle {
        LabelStyle {
            size_px: self.size_px,
            color: self.color,
            offset_x: self.offset_x,
            offset_y: self.offset_y,
        }
    }
}

/// Application configuration. Encoding parameters are fixed and have no
/// entry here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ffmpeg: FfmpegConfig,
    pub label: LabelConfig,
}

impl AppConfig {
    /// Parse a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_json(&text)
            .map_err(|e| Error::config(format!("parsing {}: {}", path.display(), e)))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let cfg: AppConfig =
            serde_json::from_str(text).map_err(|e| Error::config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.label.size_px.is_finite() && self.label.size_px > 0.0) {
            return Err(Error::config(format!(
                "label.size_px must be a positive number, got {}",
                self.label.size_px
            )));
        }
        Ok(())
    }

    /// Resolve the configuration: an explicit path wins, then
    /// `<data_dir>/framegrid/framegrid.json`, then `./framegrid.json`, then
    /// the built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(p) = explicit {
            return Self::from_file(p);
        }

        for p in &search_paths() {
            if p.exists() {
                tracing::debug!(path = %p.display(), "loading config");
                return Self::from_file(p);
            }
        }

        Ok(Self::default())
    }
}

fn search_paths() -> Vec<PathBuf> {
    let mut tried: Vec<PathBuf> = Vec::new();
    if let Some(mut d) = dirs::data_dir() {
        d.push("framegrid");
        d.push(CONFIG_FILE_NAME);
        tried.push(d);
    }
    tried.push(PathBuf::from(CONFIG_FILE_NAME));
    tried
}

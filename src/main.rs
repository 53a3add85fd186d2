use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use framegrid::{
    AppConfig, CompositeParams, GridParams, Progress, ProgressPhase, SequenceParams,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode every .png in a directory, in file-name order, as a 20 fps video
    Sequence {
        /// Directory holding the frames
        image_dir: PathBuf,
        /// Video file to write (overwritten if present)
        output: PathBuf,
    },
    /// Tile same-named frames from four directories into a 2x2 grid video
    Grid {
        /// Top-left frames
        dir1: PathBuf,
        /// Top-right frames
        dir2: PathBuf,
        /// Bottom-left frames
        dir3: PathBuf,
        /// Bottom-right frames
        dir4: PathBuf,
        /// Video file to write (overwritten if present)
        output: PathBuf,
        /// Stamp each quadrant with its position name
        #[arg(long, default_value_t = false)]
        labels: bool,
    },
    /// Stack four videos into a 2x2 grid with a single ffmpeg call
    Composite {
        video1: PathBuf,
        video2: PathBuf,
        video3: PathBuf,
        video4: PathBuf,
        /// Video file to write
        output: PathBuf,
        /// Keep going until the longest input ends instead of the shortest
        #[arg(long, default_value_t = false)]
        no_shortest: bool,
    },
}

#[derive(Parser, Debug)]
#[command(version, about = "Build videos from frame directories and tile them into 2x2 grids.")]
struct Args {
    #[command(subcommand)]
    cmd: Command,

    /// Configuration file (defaults to framegrid.json in the data dir or cwd)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {msg:8} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

fn report(pb: &ProgressBar, progress: Progress) {
    match progress.phase {
        ProgressPhase::LoadingFrames => pb.set_message("loading"),
        ProgressPhase::WritingFrames => pb.set_message("writing"),
        ProgressPhase::Complete => {
            pb.finish_with_message("done");
            return;
        }
    }
    pb.set_length(progress.total as u64);
    pb.set_position(progress.completed as u64);
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let cfg = AppConfig::load(args.config.as_deref()).context("loading configuration")?;
    tracing::debug!(?cfg, "configuration");

    match args.cmd {
        Command::Sequence { image_dir, output } => {
            let params = SequenceParams { image_dir, output };
            let pb = progress_bar();
            let frames = framegrid::sequence_to_file(&params, &cfg, |p| report(&pb, p))
                .with_context(|| format!("building {}", params.output.display()))?;
            println!("Wrote {} frames to {}", frames, params.output.display());
        }
        Command::Grid {
            dir1,
            dir2,
            dir3,
            dir4,
            output,
            labels,
        } => {
            let params = GridParams {
                dirs: [dir1, dir2, dir3, dir4],
                output,
                annotate: labels,
            };
            let pb = progress_bar();
            let frames = framegrid::grid_to_file(&params, &cfg, |p| report(&pb, p))
                .with_context(|| format!("building {}", params.output.display()))?;
            println!("Wrote {} grid frames to {}", frames, params.output.display());
        }
        Command::Composite {
            video1,
            video2,
            video3,
            video4,
            output,
            no_shortest,
        } => {
            let mut params = CompositeParams::new([video1, video2, video3, video4], output);
            params.shortest = !no_shortest;
            let report = framegrid::composite_videos(&params, &cfg.ffmpeg)
                .with_context(|| format!("compositing {}", params.output.display()))?;
            tracing::debug!(status = %report.status, stderr = %report.stderr, "ffmpeg finished");
            println!("Composite written to {}", params.output.display());
        }
    }

    Ok(())
}

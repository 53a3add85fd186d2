//! Four-way video compositor.
//!
//! Four encoded videos are tiled 2x2 by a single ffmpeg filter graph. No
//! frame passes through this process.

use std::io::{ErrorKind, Read, Write};
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};

use crate::config::FfmpegConfig;
use crate::error::{Error, Result};

/// Inputs of one composite run.
#[derive(Debug, Clone)]
pub struct CompositeParams {
    /// Top-left, top-right, bottom-left, bottom-right.
    pub inputs: [PathBuf; 4],
    pub output: PathBuf,
    /// Stop each stack at its shortest input. When off, shorter inputs
    /// leave their area frozen on the last frame until the longest ends.
    pub shortest: bool,
}

impl CompositeParams {
    pub fn new(inputs: [PathBuf; 4], output: impl Into<PathBuf>) -> Self {
        Self {
            inputs,
            output: output.into(),
            shortest: true,
        }
    }
}

/// A finished ffmpeg run.
#[derive(Debug)]
pub struct CompositeReport {
    pub status: ExitStatus,
    /// Whatever ffmpeg printed to stderr. It was also shown on our own
    /// stderr while ffmpeg ran.
    pub stderr: String,
}

/// Filter graph stacking inputs 0+1 and 2+3 side by side, then the two
/// rows on top of each other.
pub fn filter_graph(shortest: bool) -> String {
    let s = if shortest { 1 } else { 0 };
    format!(
        "[0:v][1:v]hstack=inputs=2:shortest={s}[top]; \
         [2:v][3:v]hstack=inputs=2:shortest={s}[bottom]; \
         [top][bottom]vstack=inputs=2:shortest={s}[v]"
    )
}

/// The ffmpeg invocation for `params`, ready to run.
pub fn composite_command(params: &CompositeParams, ffmpeg: &FfmpegConfig) -> Command {
    let mut cmd = Command::new(ffmpeg.ffmpeg_cmd());
    for input in &params.inputs {
        cmd.arg("-i").arg(input);
    }
    cmd.arg("-filter_complex")
        .arg(filter_graph(params.shortest))
        .arg("-map")
        .arg("[v]")
        .arg(&params.output);
    cmd
}

/// Copy `reader` into `echo` chunk by chunk as it arrives and return all
/// of it. If `echo` stops accepting data, reading and capturing go on.
fn tee_stream(mut reader: impl Read, mut echo: impl Write) -> std::io::Result<Vec<u8>> {
    let mut captured = Vec::new();
    let mut buf = [0u8; 4096];
    let mut echoing = true;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if echoing {
            echoing = echo.write_all(&buf[..n]).and_then(|_| echo.flush()).is_ok();
        }
        captured.extend_from_slice(&buf[..n]);
    }
    Ok(captured)
}

/// Run ffmpeg and wait for it. ffmpeg talks to the terminal as usual: its
/// stderr, including any overwrite prompt, is echoed live and answered from
/// our stdin. A non-zero exit becomes [`Error::Ffmpeg`] carrying that stderr.
pub fn composite_videos(params: &CompositeParams, ffmpeg: &FfmpegConfig) -> Result<CompositeReport> {
    let program = || ffmpeg.ffmpeg_cmd().to_string_lossy().into_owned();
    let mut cmd = composite_command(params, ffmpeg);
    cmd.stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::piped());
    tracing::debug!(command = ?cmd, "running compositor");

    let mut child = cmd.spawn().map_err(|source| Error::Spawn {
        program: program(),
        source,
    })?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow::anyhow!("failed to open ffmpeg stderr"))?;
    let drain = std::thread::spawn(move || tee_stream(stderr, std::io::stderr()));

    let status = child.wait().map_err(|source| Error::Spawn {
        program: program(),
        source,
    })?;
    let stderr = match drain.join() {
        Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes).trim().to_string(),
        Ok(Err(e)) => format!("<failed to read stderr: {e}>"),
        Err(_) => "<stderr reader panicked>".to_string(),
    };

    if !status.success() {
        return Err(Error::Ffmpeg { status, stderr });
    }
    tracing::info!(out = %params.output.display(), "composite written");
    Ok(CompositeReport { status, stderr })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    fn params() -> CompositeParams {
        CompositeParams::new(
            ["v1.mp4", "v2.mp4", "v3.mp4", "v4.mp4"].map(PathBuf::from),
            "grid.mp4",
        )
    }

    #[test]
    fn graph_text_is_exact() {
        assert_eq!(
            filter_graph(true),
            "[0:v][1:v]hstack=inputs=2:shortest=1[top]; \
             [2:v][3:v]hstack=inputs=2:shortest=1[bottom]; \
             [top][bottom]vstack=inputs=2:shortest=1[v]"
        );
        assert_eq!(
            filter_graph(true),
            concat!(
                "[0:v][1:v]hstack=inputs=2:shortest=1[top]; ",
                "[2:v][3:v]hstack=inputs=2:shortest=1[bottom]; ",
                "[top][bottom]vstack=inputs=2:shortest=1[v]"
            )
        );
    }

    #[test]
    fn graph_without_truncation() {
        let g = filter_graph(false);
        assert!(!g.contains("shortest=1"));
        assert_eq!(g.matches("shortest=0").count(), 3);
    }

    #[test]
    fn command_lists_inputs_in_order() {
        let cmd = composite_command(&params(), &FfmpegConfig::default());
        assert_eq!(cmd.get_program(), OsStr::new("ffmpeg"));
        let args: Vec<&OsStr> = cmd.get_args().collect();
        let expected: Vec<String> = vec![
            "-i".into(),
            "v1.mp4".into(),
            "-i".into(),
            "v2.mp4".into(),
            "-i".into(),
            "v3.mp4".into(),
            "-i".into(),
            "v4.mp4".into(),
            "-filter_complex".into(),
            filter_graph(true),
            "-map".into(),
            "[v]".into(),
            "grid.mp4".into(),
        ];
        assert_eq!(args, expected.iter().map(OsStr::new).collect::<Vec<_>>());
    }

    #[test]
    fn configured_binary_is_used() {
        let ffmpeg = FfmpegConfig {
            path: Some(PathBuf::from("/opt/ff/ffmpeg")),
        };
        let cmd = composite_command(&params(), &ffmpeg);
        assert_eq!(cmd.get_program(), OsStr::new("/opt/ff/ffmpeg"));
    }

    #[test]
    fn missing_binary_is_reported() {
        let ffmpeg = FfmpegConfig {
            path: Some(PathBuf::from("/definitely/not/a/real/ffmpeg")),
        };
        let err = composite_videos(&params(), &ffmpeg).unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn failing_command_carries_stderr() {
        // `ls` chokes on the ffmpeg arguments and explains why on stderr.
        let ffmpeg = FfmpegConfig {
            path: Some(PathBuf::from("ls")),
        };
        match composite_videos(&params(), &ffmpeg).unwrap_err() {
            Error::Ffmpeg { status, stderr } => {
                assert!(!status.success());
                assert!(!stderr.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn successful_command_returns_report() {
        let ffmpeg = FfmpegConfig {
            path: Some(PathBuf::from("true")),
        };
        let report = composite_videos(&params(), &ffmpeg).unwrap();
        assert!(report.status.success());
        assert!(report.stderr.is_empty());
    }
    /// Hands out its data a few bytes per read, like a pipe does.
    struct Trickle<'a> {
        data: &'a [u8],
        chunk: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.chunk.min(self.data.len()).min(buf.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    /// Remembers how much had been echoed each time it was flushed.
    #[derive(Default)]
    struct Terminal {
        shown: Vec<u8>,
        flushed_at: Vec<usize>,
    }

    impl Write for &mut Terminal {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.shown.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed_at.push(self.shown.len());
            Ok(())
        }
    }

    #[test]
    fn stderr_is_echoed_as_it_arrives_and_captured() {
        let prompt = b"File 'grid.mp4' already exists. Overwrite? [y/N] ";
        let mut terminal = Terminal::default();
        let captured = tee_stream(
            Trickle {
                data: prompt,
                chunk: 7,
            },
            &mut terminal,
        )
        .unwrap();

        assert_eq!(captured, prompt);
        assert_eq!(terminal.shown, prompt);
        // The prompt reaches the terminal piece by piece, not at exit.
        assert_eq!(terminal.flushed_at.first(), Some(&7));
        assert_eq!(terminal.flushed_at.last(), Some(&prompt.len()));
    }

    struct ClosedTerminal;

    impl Write for ClosedTerminal {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn capture_survives_a_closed_terminal() {
        let text = b"frame=  2 fps=0.0 q=2.0 Lsize=  12kB";
        let captured = tee_stream(
            Trickle {
                data: text,
                chunk: 5,
            },
            ClosedTerminal,
        )
        .unwrap();
        assert_eq!(captured, text);
    }
}

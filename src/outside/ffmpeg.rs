use std::{ffi::OsStr, path::Path, sync::OnceLock};

use miette::{miette, Context, IntoDiagnostic};
use regex::Regex;

use super::command::{
    assert_success_command, run_command, Capture, FFMPEG, FFPROBE, FFXXX_DEFAULT_ARGS,
};
use crate::{
    index::CLIP_EXTENSION,
    io::{named_tempfile, replace_file},
    result::Result,
    types::TrimWindow,
};

/// Interface for the tool turning a remote audio stream into a local clip file
pub trait StreamEncoder {
    /// Extract the audio of `stream_url` into `output`, seeking to the
    /// window start and capping the duration when given.
    ///
    /// The output file exists if and only if the extraction succeeded.
    fn extract_audio(&self, stream_url: &str, output: &Path, trim: TrimWindow<'_>) -> Result<()>;

    /// Stream duration of a local file, in whole seconds.
    fn probe_duration(&self, path: &Path) -> Result<u64>;
}

/// Interface for the [ffmpeg](https://ffmpeg.org) program
pub struct Ffmpeg;

impl Ffmpeg {
    /// Verify that the `ffmpeg` binary is reachable
    pub fn new() -> Result<Self> {
        assert_success_command(FFMPEG, |cmd| cmd.arg("-version"))?;

        Ok(Self)
    }
}

impl StreamEncoder for Ffmpeg {
    fn extract_audio(&self, stream_url: &str, output: &Path, trim: TrimWindow<'_>) -> Result<()> {
        // Encode into a temporary file so that a failed or interrupted run
        // cannot leave a half-written clip at the output path
        let tmp = named_tempfile(CLIP_EXTENSION)?;

        assert_success_command(FFMPEG, |cmd| {
            let mut cmd = cmd
                .args(FFXXX_DEFAULT_ARGS)
                .arg("-y")
                .args([OsStr::new("-i"), OsStr::new(stream_url)])
                .arg("-vn");

            if let Some(start) = trim.start {
                cmd = cmd.args(["-ss", start]);
            }
            if let Some(duration) = trim.duration {
                cmd = cmd.args(["-t", duration]);
            }

            cmd.args(["-c:a", "libmp3lame"]).arg("--").arg(tmp.path())
        })
        .map_err(|err| err.wrap_err_with(|| "Could not extract the audio stream"))?;

        replace_file(tmp.path(), output)?;
        Ok(())
    }

    fn probe_duration(&self, path: &Path) -> Result<u64> {
        let res = run_command(
            FFPROBE,
            |cmd| {
                cmd.args(FFXXX_DEFAULT_ARGS)
                    .args(["-show_entries", "format=duration"])
                    .arg(path.as_os_str())
            },
            Capture::STDOUT,
        )?;

        let stdout = String::from_utf8_lossy(&res.stdout);

        // The tool reports a float, the decimals are not needed
        let duration = get_duration_re()
            .captures(&stdout)
            .and_then(|cap| cap.get(1))
            .ok_or_else(|| miette!("Did not find the duration in the probe output"))?;

        duration
            .as_str()
            .parse()
            .into_diagnostic()
            .wrap_err("Could not parse the probed duration")
            .map_err(Into::into)
    }
}

static DURATION_RE: OnceLock<Regex> = OnceLock::new();

fn get_duration_re() -> &'static Regex {
    DURATION_RE.get_or_init(|| Regex::new(r"duration=(\d+)").unwrap())
}

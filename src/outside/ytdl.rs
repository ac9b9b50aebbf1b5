use std::{
    process::{Command, Output},
    sync::OnceLock,
};

use miette::{miette, Context, IntoDiagnostic};
use regex::Regex;
use serde::Deserialize;
use time::OffsetDateTime;

use super::command::{assert_success_command, run_command, Capture, YT_DL, YT_DLP};
use crate::{
    result::{Error, Result},
    types::{AudioSource, StreamCandidate, VideoMeta},
};

/// Interface for resolving a record's source URL into a playable audio stream
pub trait StreamResolver {
    /// Resolve the source URL into the video's best audio stream.
    ///
    /// Fails with [`Error::Unresolvable`] when the URL is not a supported
    /// video URL, when the provider says the stream is gone, or when no
    /// listed stream carries audio with a reported sample rate.
    /// Callers treat that as a per-record skip, not a run failure.
    fn resolve(&self, source_url: &str) -> Result<VideoMeta>;
}

/// Interface for the [yt-dlp](https://github.com/yt-dlp/yt-dlp) program
pub struct Ytdl {
    program: &'static str,
}

impl Ytdl {
    /// Verify that the `yt-dlp` or `youtube-dl` binaries are reachable
    pub fn new() -> Result<Self> {
        // Check `yt-dlp`
        if assert_success_command(YT_DLP, |cmd| cmd.arg("--version")).is_ok() {
            Ok(Self { program: YT_DLP })
        } else if assert_success_command(YT_DL, |cmd| cmd.arg("--version")).is_ok() {
            // Check `youtube-dl`
            Ok(Self { program: YT_DL })
        } else {
            Err(miette!("Neither yt-dlp nor youtube-dl found").into())
        }
    }

    /// Run the command and check if it failed with saying the stream is unavailable.
    /// In that case, return [`Error::Unresolvable`].
    ///
    /// In other cases, return the output handle.
    fn run_check_availability<F>(&self, f: F, capture: Capture) -> Result<Output>
    where
        F: FnOnce(&mut Command) -> &mut Command,
    {
        let res = run_command(self.program, f, capture | Capture::STDERR)?;

        let stderr = String::from_utf8_lossy(&res.stderr);
        let is_unavailable = stderr
            .lines()
            .any(|line| line.starts_with("ERROR:") && line.to_lowercase().contains("unavailable"));
        if is_unavailable {
            Err(Error::Unresolvable(
                "the provider reports the stream as unavailable".to_owned(),
            ))
        } else {
            Ok(res)
        }
    }
}

impl StreamResolver for Ytdl {
    fn resolve(&self, source_url: &str) -> Result<VideoMeta> {
        parse_video_id(source_url)?;

        let res = self.run_check_availability(
            |cmd| {
                cmd.arg("-q")
                    .arg("--skip-download")
                    .arg("-j")
                    .arg("--")
                    .arg(source_url)
            },
            Capture::STDOUT,
        )?;

        if !res.status.success() {
            let stderr = String::from_utf8_lossy(&res.stderr);
            let reason = stderr
                .lines()
                .find(|line| line.starts_with("ERROR:"))
                .map(|line| line.trim_start_matches("ERROR:").trim().to_owned())
                .unwrap_or_else(|| "the stream probe did not succeed".to_owned());
            return Err(Error::Unresolvable(reason));
        }

        let stdout = String::from_utf8_lossy(&res.stdout);
        let probe: Probe = serde_json::from_str(&stdout)
            .into_diagnostic()
            .wrap_err_with(|| format!("Could not parse the stream probe of '{source_url}'"))?;

        probe.into_video_meta().ok_or_else(|| {
            Error::Unresolvable(
                "the provider listed no audio stream with a reported sample rate".to_owned(),
            )
        })
    }
}

/// The stream probe JSON, reduced to the fields the resolver reads.
#[derive(Debug, Deserialize)]
struct Probe {
    id: String,
    title: String,
    webpage_url: String,
    #[serde(default)]
    formats: Vec<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    #[serde(default)]
    acodec: Option<String>,
    #[serde(default)]
    asr: Option<u32>,
    #[serde(default)]
    url: Option<String>,
}

impl Probe {
    fn into_video_meta(self) -> Option<VideoMeta> {
        let candidates = self.formats.into_iter().filter_map(ProbeFormat::into_candidate);
        let source = AudioSource::pick_best(candidates)?;

        Some(VideoMeta {
            id: self.id,
            url: self.webpage_url,
            title: self.title,
            source,
            fetched_at: OffsetDateTime::now_utc(),
        })
    }
}

impl ProbeFormat {
    fn into_candidate(self) -> Option<StreamCandidate> {
        let url = self.url?;

        Some(StreamCandidate {
            // The probe marks audio-less streams with a literal "none"
            has_audio: self.acodec.map_or(false, |acodec| acodec != "none"),
            audio_sample_rate: self.asr,
            url,
        })
    }
}

/// The watch page, short link and shorts forms of a video URL
const URL_PATTERNS: [&str; 3] = [
    r"^https?://(?:www\.|m\.)?youtube\.com/watch\?(?:.*&)?v=([A-Za-z0-9_-]{11})",
    r"^https?://youtu\.be/([A-Za-z0-9_-]{11})",
    r"^https?://(?:www\.)?youtube\.com/shorts/([A-Za-z0-9_-]{11})",
];

static URL_RE_LIST: OnceLock<[Regex; 3]> = OnceLock::new();

fn get_url_re_list() -> &'static [Regex] {
    URL_RE_LIST.get_or_init(|| URL_PATTERNS.map(|pattern| Regex::new(pattern).unwrap()))
}

/// Extract the 11 characters video id, or fail with [`Error::Unresolvable`]
/// when the URL is not a supported video URL.
pub fn parse_video_id(url: &str) -> Result<&str> {
    get_url_re_list()
        .iter()
        .find_map(|re| re.captures(url))
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| Error::Unresolvable(format!("'{url}' is not a supported video URL")))
}

use time::OffsetDateTime;

/// One stream listed by the resolution provider for a video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamCandidate {
    pub has_audio: bool,
    /// Audio sample rate in Hz, when the provider reports one.
    pub audio_sample_rate: Option<u32>,
    pub url: String,
}

/// The audio stream chosen for a video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSource {
    /// Audio sample rate in Hz.
    pub asr: u32,
    pub url: String,
}

impl AudioSource {
    /// Pick the audio-carrying candidate with the highest reported sample
    /// rate. `None` when no candidate carries audio, or when none of the
    /// audio-carrying ones reports a sample rate.
    pub fn pick_best<I>(candidates: I) -> Option<Self>
    where
        I: IntoIterator<Item = StreamCandidate>,
    {
        candidates
            .into_iter()
            .filter(|candidate| candidate.has_audio)
            .filter_map(|candidate| {
                candidate
                    .audio_sample_rate
                    .map(|asr| (asr, candidate.url))
            })
            .max_by_key(|(asr, _)| *asr)
            .map(|(asr, url)| Self { asr, url })
    }
}

/// Resolved view of a record's source URL.
///
/// Lives only for the duration of one run, never persisted.
#[derive(Debug, Clone)]
pub struct VideoMeta {
    pub id: String,
    /// Canonical video page URL as reported by the provider.
    pub url: String,
    pub title: String,
    pub source: AudioSource,
    pub fetched_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(has_audio: bool, asr: Option<u32>, url: &str) -> StreamCandidate {
        StreamCandidate {
            has_audio,
            audio_sample_rate: asr,
            url: url.to_owned(),
        }
    }

    #[test]
    fn picks_the_highest_sample_rate_among_audio_streams() {
        let best = AudioSource::pick_best([
            candidate(true, Some(22050), "https://stream/low"),
            candidate(false, Some(96000), "https://stream/video-only"),
            candidate(true, Some(48000), "https://stream/high"),
            candidate(true, Some(44100), "https://stream/mid"),
        ]);

        assert_eq!(
            best,
            Some(AudioSource {
                asr: 48000,
                url: "https://stream/high".to_owned(),
            })
        );
    }

    #[test]
    fn no_audio_carrying_stream_yields_none() {
        let best = AudioSource::pick_best([
            candidate(false, Some(48000), "https://stream/a"),
            candidate(false, None, "https://stream/b"),
        ]);

        assert_eq!(best, None);
    }

    #[test]
    fn audio_streams_without_a_sample_rate_are_ignored() {
        assert_eq!(
            AudioSource::pick_best([candidate(true, None, "https://stream/a")]),
            None
        );

        let best = AudioSource::pick_best([
            candidate(true, None, "https://stream/a"),
            candidate(true, Some(32000), "https://stream/b"),
        ]);
        assert_eq!(best.map(|source| source.asr), Some(32000));
    }
}

use std::fmt::Display;

use serde::Deserialize;

/// One catalog entry describing a wanted audio clip.
///
/// Records are owned by the remote store, this side only reads them.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecord {
    pub id: String,
    pub title: String,
    pub video_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    /// Start offset of the clip inside the video, forwarded verbatim to
    /// the encode tool.
    #[serde(default)]
    pub start_time: Option<String>,
    /// Clip duration cap, forwarded verbatim to the encode tool.
    #[serde(default)]
    pub duration: Option<String>,
}

impl ResourceRecord {
    pub fn trim_window(&self) -> TrimWindow<'_> {
        TrimWindow {
            start: self.start_time.as_deref(),
            duration: self.duration.as_deref(),
        }
    }
}

/// Optional seek/cap pair applied during the encode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrimWindow<'a> {
    pub start: Option<&'a str>,
    pub duration: Option<&'a str>,
}

impl TrimWindow<'_> {
    pub fn is_whole(&self) -> bool {
        self.start.is_none() && self.duration.is_none()
    }
}

impl Display for TrimWindow<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.start, self.duration) {
            (Some(start), Some(duration)) => write!(f, "{start} +{duration}"),
            (Some(start), None) => write!(f, "{start} -> end"),
            (None, Some(duration)) => write!(f, "0 +{duration}"),
            (None, None) => write!(f, "full stream"),
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    #[test]
    fn record_deserializes_from_store_json() {
        let json = indoc! {r#"
            {
                "id": "r1",
                "title": "Test/Clip",
                "videoUrl": "https://host/abc",
                "startTime": "10",
                "duration": "5"
            }
        "#};

        let record: ResourceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, "r1");
        assert_eq!(record.title, "Test/Clip");
        assert_eq!(record.video_url, "https://host/abc");
        assert_eq!(record.start_time.as_deref(), Some("10"));
        assert_eq!(record.duration.as_deref(), Some("5"));
        assert_eq!(record.description, None);
        assert_eq!(record.author, None);
    }

    #[test]
    fn missing_trim_fields_mean_whole_stream() {
        let json = r#"{ "id": "r2", "title": "T", "videoUrl": "https://host/x" }"#;

        let record: ResourceRecord = serde_json::from_str(json).unwrap();
        assert!(record.trim_window().is_whole());
        assert_eq!(record.trim_window().to_string(), "full stream");
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ResourceRecord, VideoMeta};

/// Attribution of a materialized clip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Where a clip came from, as stated by the catalog record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
    pub url: String,
    /// Title of the resolved video, not of the clip.
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
}

/// Facts about the produced file, gathered best-effort after the encode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5: Option<String>,
    /// File size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Clip duration in whole seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
}

impl FileMeta {
    pub fn is_empty(&self) -> bool {
        self.md5.is_none() && self.size.is_none() && self.duration.is_none()
    }
}

/// Persisted metadata of one materialized clip.
///
/// Created once when the encode succeeds, then only read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMeta {
    /// Library-side identity, minted at materialization time.
    pub id: Uuid,
    /// Id of the catalog record this clip was materialized from.
    pub ref_id: String,
    pub title: String,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributor: Option<Contributor>,
    /// Assigned by the curation tooling, never by a sync pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,
    /// Assigned by the curation tooling, never by a sync pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    pub source: SourceRef,
    /// Assigned by the curation tooling, never by a sync pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filemeta: Option<FileMeta>,
}

impl ResourceMeta {
    /// Assemble the metadata of a just-materialized record.
    ///
    /// `ref_id` keeps the link back to the catalog record while `id` is a
    /// fresh library-side identity.
    pub fn materialized(
        record: &ResourceRecord,
        video: &VideoMeta,
        filename: String,
        filemeta: Option<FileMeta>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            ref_id: record.id.clone(),
            title: record.title.clone(),
            filename,
            description: record.description.clone(),
            contributor: record.author.clone().map(|name| Contributor { name, link: None }),
            catalog: None,
            tags: None,
            source: SourceRef {
                url: record.video_url.clone(),
                title: video.title.clone(),
                start_time: record.start_time.clone(),
            },
            language: None,
            filemeta,
        }
    }
}

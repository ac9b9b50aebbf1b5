use std::{
    collections::{btree_map::Entry, BTreeMap},
    path::Path,
};

use miette::{miette, Context, IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};

use crate::types::{ResourceMeta, ResourceRecord};

/// File extension given to every materialized clip.
pub const CLIP_EXTENSION: &str = ".mp3";

/// Characters that cannot appear in a path segment on at least one of the
/// filesystems the library may land on.
const ILLEGAL_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Derive the library filename of a record.
///
/// Deterministic in the record id and title, so re-running the sync maps
/// a record to the same file.
pub fn derive_filename(record: &ResourceRecord) -> String {
    format!(
        "{}-{}{CLIP_EXTENSION}",
        sanitize_segment(&record.id),
        sanitize_segment(&record.title)
    )
}

/// Make the string usable as a single path segment.
fn sanitize_segment(part: &str) -> String {
    part.trim()
        .chars()
        .map(|c| {
            if ILLEGAL_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Persisted mapping from library filename to clip metadata.
///
/// Loaded once at startup, mutated in memory, written back once at the
/// end of the run.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResourceIndex {
    v: u32,
    resources: BTreeMap<String, ResourceMeta>,
}

impl ResourceIndex {
    /// Schema version this build reads and writes.
    pub const VERSION: u32 = 1;

    pub fn new() -> Self {
        Self {
            v: Self::VERSION,
            resources: BTreeMap::new(),
        }
    }

    /// Load the index file, or start a fresh index if there is none yet.
    ///
    /// An unreadable file or an unknown schema version is an error: going
    /// on would overwrite a library index we do not understand.
    pub fn read_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new());
        }

        let raw = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Could not read the index file '{}'", path.display()))?;

        let index: Self = serde_json::from_str(&raw)
            .into_diagnostic()
            .wrap_err_with(|| format!("Index file '{}' is not valid JSON", path.display()))?;

        if index.v != Self::VERSION {
            return Err(miette!(
                "Index file '{}' has schema version {}, expected {}",
                path.display(),
                index.v,
                Self::VERSION
            ));
        }

        Ok(index)
    }

    /// Write the whole index, replacing the previous file.
    pub fn persist<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).into_diagnostic()?;

        std::fs::write(path, json)
            .into_diagnostic()
            .wrap_err_with(|| format!("Could not write the index file '{}'", path.display()))
    }

    /// Register a materialized clip under its filename.
    ///
    /// The index is append-only within a run: registering a filename twice
    /// is an error.
    pub fn put(&mut self, meta: ResourceMeta) -> Result<()> {
        match self.resources.entry(meta.filename.clone()) {
            Entry::Occupied(_) => Err(miette!(
                "Filename '{}' is already present in the index",
                meta.filename
            )),
            Entry::Vacant(entry) => {
                entry.insert(meta);
                Ok(())
            }
        }
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.resources.contains_key(filename)
    }

    pub fn get(&self, filename: &str) -> Option<&ResourceMeta> {
        self.resources.get(filename)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl Default for ResourceIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, title: &str) -> ResourceRecord {
        ResourceRecord {
            id: id.to_owned(),
            title: title.to_owned(),
            video_url: "https://host/x".to_owned(),
            description: None,
            author: None,
            start_time: None,
            duration: None,
        }
    }

    fn meta(filename: &str) -> ResourceMeta {
        serde_json::from_str(&format!(
            r#"{{
                "id": "1f0d6f8c-35a3-4a2f-9138-ea65e1dcdc11",
                "refId": "r1",
                "title": "T",
                "filename": "{filename}",
                "source": {{ "url": "https://host/x", "title": "V" }}
            }}"#
        ))
        .unwrap()
    }

    #[test]
    fn filename_is_id_dash_title_with_extension() {
        assert_eq!(derive_filename(&record("r1", "Test Clip")), "r1-Test Clip.mp3");
    }

    #[test]
    fn illegal_path_characters_are_replaced() {
        assert_eq!(derive_filename(&record("r1", "Test/Clip")), "r1-Test_Clip.mp3");
        assert_eq!(derive_filename(&record("a:b", "c*d?e")), "a_b-c_d_e.mp3");
        assert_eq!(derive_filename(&record("r2", "a\\b\"c<d>e|f")), "r2-a_b_c_d_e_f.mp3");
    }

    #[test]
    fn sanitization_can_make_distinct_records_collide() {
        assert_eq!(
            derive_filename(&record("x?a", "T")),
            derive_filename(&record("x_a", "T"))
        );
    }

    #[test]
    fn registering_the_same_filename_twice_is_an_error() {
        let mut index = ResourceIndex::new();

        index.put(meta("a.mp3")).unwrap();
        assert!(index.contains("a.mp3"));
        assert_eq!(index.len(), 1);

        assert!(index.put(meta("a.mp3")).is_err());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn missing_file_starts_a_fresh_index() {
        let dir = tempfile::tempdir().unwrap();
        let index = ResourceIndex::read_or_create(dir.path().join("index.json")).unwrap();

        assert!(index.is_empty());
    }

    #[test]
    fn persists_and_reloads_the_same_resources() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let mut index = ResourceIndex::new();
        index.put(meta("a.mp3")).unwrap();
        index.persist(&path).unwrap();

        let reloaded = ResourceIndex::read_or_create(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get("a.mp3"), index.get("a.mp3"));
    }

    #[test]
    fn persisted_file_carries_the_schema_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        ResourceIndex::new().persist(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["v"], 1);
        assert!(value["resources"].as_object().unwrap().is_empty());
    }

    #[test]
    fn unknown_schema_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(&path, r#"{ "v": 2, "resources": {} }"#).unwrap();

        assert!(ResourceIndex::read_or_create(&path).is_err());
    }

    #[test]
    fn corrupt_index_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(ResourceIndex::read_or_create(&path).is_err());
    }
}

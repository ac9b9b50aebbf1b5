use std::{
    collections::{hash_map::Entry, HashMap},
    fmt::Display,
    path::Path,
};

use miette::{Context, Result};
use tracing::{debug, error, info, warn};

use crate::{
    index::{derive_filename, ResourceIndex},
    outside::{RecordStore, StreamEncoder, StreamResolver},
    types::{FileMeta, ResourceMeta, ResourceRecord, VideoMeta},
};

/// Totals of one synchronization pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub found: usize,
    pub saved: usize,
    pub already_present: usize,
    pub unresolvable: usize,
    pub failed: usize,
}

impl Display for SyncReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} records: {} saved, {} already present, {} unresolvable, {} failed",
            self.found, self.saved, self.already_present, self.unresolvable, self.failed
        )
    }
}

/// How one record went through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Saved,
    AlreadyPresent,
}

/// Memoized outcome of resolving one source URL.
enum Resolution {
    Resolved(VideoMeta),
    Failed(String),
}

/// Drives one synchronization pass over the whole catalog.
///
/// Fetch the records, resolve and encode the missing ones, then persist
/// the updated index exactly once at the end.
pub struct Synchronizer<'a> {
    store: &'a dyn RecordStore,
    resolver: &'a dyn StreamResolver,
    encoder: &'a dyn StreamEncoder,
    out_dir: &'a Path,
    index_path: &'a Path,
}

impl<'a> Synchronizer<'a> {
    pub fn new(
        store: &'a dyn RecordStore,
        resolver: &'a dyn StreamResolver,
        encoder: &'a dyn StreamEncoder,
        out_dir: &'a Path,
        index_path: &'a Path,
    ) -> Self {
        Self {
            store,
            resolver,
            encoder,
            out_dir,
            index_path,
        }
    }

    /// Run the pass. Per-record problems are logged and skipped: only the
    /// startup steps and the final index write can abort the run.
    pub fn run(&self) -> Result<SyncReport> {
        let mut index = ResourceIndex::read_or_create(self.index_path)
            .wrap_err("Could not load the resource index")?;
        info!("{} resources already in the index", index.len());

        let records = self
            .store
            .fetch_all_records()
            .wrap_err("Could not fetch the resource records")?;
        info!("Found {} records in the catalog", records.len());

        let mut report = SyncReport {
            found: records.len(),
            ..SyncReport::default()
        };
        let mut resolutions = HashMap::new();

        for record in &records {
            debug!("Processing record '{}' ({})", record.id, record.video_url);

            match self.process_record(record, &mut resolutions, &mut index) {
                Ok(Outcome::Saved) => report.saved += 1,
                Ok(Outcome::AlreadyPresent) => report.already_present += 1,
                Err(crate::result::Error::Unresolvable(reason)) => {
                    warn!("Skipping '{}': {reason}", record.title);
                    report.unresolvable += 1;
                }
                Err(crate::result::Error::Miette(err)) => {
                    error!("Could not process '{}': {err:?}", record.title);
                    report.failed += 1;
                }
            }
        }

        index
            .persist(self.index_path)
            .wrap_err("Could not write the resource index")?;
        info!(
            "Index written to '{}' ({} resources)",
            self.index_path.display(),
            index.len()
        );
        info!("Run complete: {report}");

        Ok(report)
    }

    /// Take one record through resolution, the materialization check, the
    /// encode and the index update.
    fn process_record(
        &self,
        record: &ResourceRecord,
        resolutions: &mut HashMap<String, Resolution>,
        index: &mut ResourceIndex,
    ) -> crate::result::Result<Outcome> {
        let video = resolve_with_cache(self.resolver, resolutions, &record.video_url)?;

        let filename = derive_filename(record);
        let output = self.out_dir.join(&filename);

        if is_materialized(index, &filename, &output) {
            info!("'{}' is already materialized as '{filename}'. Skipping it", record.title);
            return Ok(Outcome::AlreadyPresent);
        }

        let trim = record.trim_window();
        info!(
            "Saving '{}' ({trim}) from a {} Hz stream",
            record.title, video.source.asr
        );
        self.encoder
            .extract_audio(&video.source.url, &output, trim)
            .map_err(|err| err.wrap_err_with(|| format!("Could not encode '{filename}'")))?;

        let filemeta = self.collect_filemeta(&output);
        let meta = ResourceMeta::materialized(record, video, filename.clone(), filemeta);
        index.put(meta)?;

        info!("Saved '{}' as '{filename}'", record.title);
        Ok(Outcome::Saved)
    }

    /// Facts about the produced file. Gathering them must not fail the
    /// record: degrade to whatever could be collected.
    fn collect_filemeta(&self, output: &Path) -> Option<FileMeta> {
        let size = match std::fs::metadata(output) {
            Ok(stat) => Some(stat.len()),
            Err(err) => {
                debug!("Could not stat '{}': {err}", output.display());
                None
            }
        };

        let duration = match self.encoder.probe_duration(output) {
            Ok(seconds) => Some(seconds),
            Err(err) => {
                debug!("Could not probe the duration of '{}': {err:?}", output.display());
                None
            }
        };

        let filemeta = FileMeta {
            // Left to the checksumming step of the publication tooling
            md5: None,
            size,
            duration,
        };
        (!filemeta.is_empty()).then_some(filemeta)
    }
}

/// Consult or fill the per-run resolution cache.
///
/// A source URL is resolved at most once per run. Failed resolutions are
/// memoized too: a record sharing its URL with an earlier unresolvable one
/// is skipped without another provider round trip.
fn resolve_with_cache<'c>(
    resolver: &dyn StreamResolver,
    cache: &'c mut HashMap<String, Resolution>,
    source_url: &str,
) -> crate::result::Result<&'c VideoMeta> {
    let resolution = match cache.entry(source_url.to_owned()) {
        Entry::Occupied(entry) => {
            debug!("Resolution cache hit for '{source_url}'");
            entry.into_mut()
        }
        Entry::Vacant(entry) => {
            let resolution = match resolver.resolve(source_url) {
                Ok(video) => {
                    debug!(
                        "Resolved '{source_url}' to a {} Hz audio stream",
                        video.source.asr
                    );
                    Resolution::Resolved(video)
                }
                Err(crate::result::Error::Unresolvable(reason)) => Resolution::Failed(reason),
                Err(err) => return Err(err),
            };
            entry.insert(resolution)
        }
    };

    match resolution {
        Resolution::Resolved(video) => Ok(video),
        Resolution::Failed(reason) => Err(crate::result::Error::Unresolvable(reason.clone())),
    }
}

/// Whether the record's clip already exists in the library: either the
/// index knows the filename, or a file sits at the derived path. The two
/// are not re-verified against each other.
fn is_materialized(index: &ResourceIndex, filename: &str, output: &Path) -> bool {
    index.contains(filename) || output.exists()
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use time::OffsetDateTime;

    use super::*;
    use crate::types::AudioSource;

    struct CountingResolver {
        calls: Cell<usize>,
        fail: bool,
    }

    impl CountingResolver {
        fn new(fail: bool) -> Self {
            Self {
                calls: Cell::new(0),
                fail,
            }
        }
    }

    impl StreamResolver for CountingResolver {
        fn resolve(&self, source_url: &str) -> crate::result::Result<VideoMeta> {
            self.calls.set(self.calls.get() + 1);

            if self.fail {
                return Err(crate::result::Error::Unresolvable("no stream".to_owned()));
            }

            Ok(VideoMeta {
                id: "abc".to_owned(),
                url: source_url.to_owned(),
                title: "A web video".to_owned(),
                source: AudioSource {
                    asr: 48000,
                    url: format!("{source_url}/audio"),
                },
                fetched_at: OffsetDateTime::now_utc(),
            })
        }
    }

    #[test]
    fn successful_resolutions_are_memoized() {
        let resolver = CountingResolver::new(false);
        let mut cache = HashMap::new();

        let first = resolve_with_cache(&resolver, &mut cache, "https://host/a")
            .unwrap()
            .clone();
        let second = resolve_with_cache(&resolver, &mut cache, "https://host/a")
            .unwrap()
            .clone();

        assert_eq!(resolver.calls.get(), 1);
        assert_eq!(first.source, second.source);
    }

    #[test]
    fn failed_resolutions_are_memoized_too() {
        let resolver = CountingResolver::new(true);
        let mut cache = HashMap::new();

        for _ in 0..3 {
            let res = resolve_with_cache(&resolver, &mut cache, "https://host/a");
            assert!(matches!(res, Err(crate::result::Error::Unresolvable(_))));
        }

        assert_eq!(resolver.calls.get(), 1);
    }

    #[test]
    fn distinct_urls_are_resolved_separately() {
        let resolver = CountingResolver::new(false);
        let mut cache = HashMap::new();

        resolve_with_cache(&resolver, &mut cache, "https://host/a").unwrap();
        resolve_with_cache(&resolver, &mut cache, "https://host/b").unwrap();

        assert_eq!(resolver.calls.get(), 2);
    }

    #[test]
    fn materialized_means_indexed_or_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("a.mp3");
        std::fs::write(&existing, b"audio").unwrap();

        let index = ResourceIndex::new();
        assert!(is_materialized(&index, "a.mp3", &existing));
        assert!(!is_materialized(&index, "b.mp3", &dir.path().join("b.mp3")));
    }
}

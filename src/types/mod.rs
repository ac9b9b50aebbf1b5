mod record;
mod resource;
mod video;

pub use record::{ResourceRecord, TrimWindow};
pub use resource::{Contributor, FileMeta, ResourceMeta, SourceRef};
pub use video::{AudioSource, StreamCandidate, VideoMeta};

mod command;
mod ffmpeg;
mod store;
mod ytdl;

pub use ffmpeg::{Ffmpeg, StreamEncoder};
pub use store::{HttpRecordStore, RecordStore, StoreConfig};
pub use ytdl::{StreamResolver, Ytdl};

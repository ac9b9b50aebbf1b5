//! Synchronize a remote clip catalog into a local audio library.
//!
//! One pass fetches the resource records of a collection, resolves each
//! record's web video into its best audio stream, extracts the trimmed
//! clip through the external tools, and records the result in the
//! versioned resource index.

pub mod cli;
pub mod index;
pub mod io;
pub mod logging;
pub mod outside;
pub mod result;
pub mod sync;
pub mod types;

use std::path::PathBuf;

use clap::Parser;

use crate::outside::StoreConfig;

macro_rules! arg_env {
    ($v:literal) => {
        concat!("SKALD_", $v)
    };
}

/// Synchronize a remote clip catalog into a local audio library.
/// Resolve each record's web video, extract its trimmed audio clip,
/// and keep the resource index up to date.
#[derive(Parser, Debug)]
#[clap(version)]
pub struct Args {
    /// The base URL of the record store API
    #[clap(long, env=arg_env!("STORE_URL"))]
    pub store_url: String,

    /// The access token of the record store
    #[clap(long, env=arg_env!("STORE_TOKEN"), hide_env_values = true)]
    pub store_token: String,

    /// The record collection to synchronize
    #[clap(long, env=arg_env!("COLLECTION"))]
    pub collection: String,

    /// The path to the output directory receiving the audio clips
    #[clap(long, env=arg_env!("OUT"))]
    pub out: PathBuf,

    /// The path to the resource index file
    #[clap(long, env=arg_env!("INDEX"))]
    pub index: PathBuf,

    /// Log the details of every record and external command
    #[clap(short, long, env=arg_env!("VERBOSE"))]
    pub verbose: bool,
}

impl Args {
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            base_url: self.store_url.clone(),
            token: self.store_token.clone(),
            collection: self.collection.clone(),
        }
    }
}

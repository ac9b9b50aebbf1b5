use clap::Parser;
use miette::{Context, IntoDiagnostic, Result};
use tracing::{info, Level};

use skald::{
    cli::Args,
    logging::init_logging,
    outside::{Ffmpeg, HttpRecordStore, Ytdl},
    sync::Synchronizer,
};

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(if args.verbose { Level::DEBUG } else { Level::INFO })?;

    // Make sure the needed directories are created
    std::fs::create_dir_all(&args.out)
        .into_diagnostic()
        .wrap_err("Could not create out directory")?;
    if let Some(parent) = args.index.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .into_diagnostic()
            .wrap_err("Could not create index parent directories")?;
    }

    let (resolver, encoder) = load_external_components()?;
    let store = HttpRecordStore::new(args.store_config())?;

    let synchronizer = Synchronizer::new(&store, &resolver, &encoder, &args.out, &args.index);
    synchronizer.run()?;

    info!("All tasks completed");
    Ok(())
}

/// Load the external components
fn load_external_components() -> Result<(Ytdl, Ffmpeg)> {
    // Construct the handles concurrently as executing an external program
    // is not instantaneous. That way we can avoid adding the costs
    let ytdl_thread = std::thread::spawn(Ytdl::new);
    let ffmpeg_thread = std::thread::spawn(Ffmpeg::new);

    let ytdl = ytdl_thread.join().expect("Could not join thread")?;
    let ffmpeg = ffmpeg_thread.join().expect("Could not join thread")?;

    Ok((ytdl, ffmpeg))
}

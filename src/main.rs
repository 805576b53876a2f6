use clap::{Parser, Subcommand};
use slide_album::archive::StagingArchive;
use slide_album::assemble::AlbumAssembler;
use slide_album::collection::ImageCollection;
use slide_album::imaging::{Interpolation, RustBackend};
use slide_album::{config, logging, output};
use std::path::PathBuf;
use std::sync::Arc;

/// Directory below the destination where archive members are staged.
const ARCHIVE_STAGING_DIR: &str = "archive";

#[derive(Parser)]
#[command(name = "slide-album")]
#[command(about = "Assemble multi-resolution photo albums for a slideshow viewer")]
#[command(long_about = "\
Assemble multi-resolution photo albums for a slideshow viewer

Every supported image directly inside SOURCE (jpg, jpeg, png, tif, tiff,
webp) is scaled into the configured pixel boxes and written below DEST:

  DEST/slides/
  ├── directories.json             # Size directories, thumbnail box first
  ├── filenames.json               # Basenames in processing order
  ├── captions.json                # Basename → caption
  ├── resolutions.json             # [code → sizes, basename → code]
  ├── info.json                    # Presentation options
  ├── 160x160/IMG_0042.jpg
  ├── 480x320/IMG_0042.jpg
  └── original_size/IMG_0042.jpg   # With images.include_original

Captions (first available wins):
  sidecar IMG_0042.txt → IPTC caption → JPEG comment

Configuration is read from SOURCE/album.toml unless --config is given.
Run 'slide-album gen-config' to print a documented album.toml.")]
#[command(version)]
struct Cli {
    /// More diagnostics on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scale a directory of images and write the album manifests
    Assemble(AssembleArgs),
    /// Print a stock album.toml with all options documented
    GenConfig,
}

#[derive(clap::Args)]
struct AssembleArgs {
    /// Directory holding the source images
    source: PathBuf,

    /// Album root; renditions and manifests go into DEST/slides
    dest: PathBuf,

    /// Config file to use instead of SOURCE/album.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Resize workers (0 = one per CPU core)
    #[arg(long)]
    workers: Option<usize>,

    /// Use the fast two-step resampling instead of Lanczos3
    #[arg(long)]
    fast: bool,

    /// Stage the originals for a downloadable archive in DEST/archive
    #[arg(long)]
    archive: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Command::Assemble(args) => assemble(args)?,
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn assemble(args: AssembleArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut album_config = match &args.config {
        Some(path) => config::load_config_file(path)?,
        None => config::load_config(&args.source)?,
    };
    if let Some(workers) = args.workers {
        album_config.processing.workers = workers;
    }
    if args.fast {
        album_config.images.interpolation = Interpolation::Fast;
    }
    if args.archive {
        album_config.archive.enabled = true;
    }

    let mut collection = ImageCollection::from_directory(&args.source)?;
    if album_config.collection.sort_by_capture_time {
        collection.sort_by_capture_time();
    }

    let archive_enabled = album_config.archive.enabled;
    let (tx, rx) = std::sync::mpsc::channel();
    let mut assembler = AlbumAssembler::new(album_config, Arc::new(RustBackend::new()))?
        .with_events(tx);
    if archive_enabled {
        let staging = StagingArchive::new(args.dest.join(ARCHIVE_STAGING_DIR));
        assembler = assembler.with_archive(Box::new(staging));
    }

    let printer = std::thread::spawn(move || {
        for event in rx {
            output::print_assembly_event(&event);
        }
    });
    let result = assembler.assemble(&collection, &args.dest);
    // Closes the event channel so the printer finishes
    drop(assembler);
    printer
        .join()
        .map_err(|_| "progress printer thread panicked")?;

    let report = result?;
    output::print_report(&report, collection.len());
    Ok(())
}

use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use redundant_restrictions::osm::{self, FileFormat};
use redundant_restrictions::{find_redundant_restrictions, FactStore};

#[derive(Debug, thiserror::Error)]
#[error("{0}: {1}")]
struct LoadError(PathBuf, #[source] osm::Error);

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Guess based on the file name and content
    Auto,
    Xml,
    XmlGz,
    XmlBz2,
    Pbf,
}

impl From<Format> for FileFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Auto => FileFormat::Unknown,
            Format::Xml => FileFormat::Xml,
            Format::XmlGz => FileFormat::XmlGz,
            Format::XmlBz2 => FileFormat::XmlBz2,
            Format::Pbf => FileFormat::Pbf,
        }
    }
}

/// Checks for turn restrictions made redundant by the direction of one-way streets.
///
/// Prints one "RELATION_ID (FROM_WAY, VIA_NODE, TO_WAY)" line per redundant restriction.
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// The path to the OSM file
    osm_file: PathBuf,

    /// Format of the OSM file
    #[arg(short, long, value_enum, default_value_t = Format::Auto)]
    format: Format,

    /// Log more details (repeat for even more)
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn log_level(&self) -> log::LevelFilter {
        match (self.quiet, self.verbose) {
            (true, _) => log::LevelFilter::Warn,
            (false, 0) => log::LevelFilter::Info,
            (false, 1) => log::LevelFilter::Debug,
            (false, _) => log::LevelFilter::Trace,
        }
    }
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    colog::default_builder()
        .filter_level(cli.log_level())
        .parse_default_env()
        .init();

    let store = load_facts(&cli.osm_file, cli.format.into())?;

    let stats = store.stats();
    log::info!(
        "read {} ways and {} relations",
        stats.ways,
        stats.relations
    );
    if stats.malformed_restrictions > 0 {
        log::debug!(
            "skipped {} turn restrictions not following the from-via-to schema",
            stats.malformed_restrictions
        );
    }

    eprintln!("Restrictions: {}", store.restrictions().len());
    eprintln!("Oneways: {}", store.oneways().len());

    let mut redundant: Vec<_> = find_redundant_restrictions(&store).collect();
    redundant.sort();
    for r in &redundant {
        println!("{}", r);
    }

    log::info!("found {} redundant turn restrictions", redundant.len());
    Ok(())
}

fn load_facts<P: AsRef<Path>>(path: P, format: FileFormat) -> Result<FactStore, LoadError> {
    let mut store = FactStore::new();
    match osm::add_features_from_file(&mut store, format, path.as_ref()) {
        Ok(()) => Ok(store),
        Err(e) => Err(LoadError(PathBuf::from(path.as_ref()), e)),
    }
}

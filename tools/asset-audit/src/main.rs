use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use lehra_domain::{AssetKey, AssetLocator, DirectoryLocator, SessionConfig, TempoBand};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Check which lehra recordings exist for every taal, raag, instrument and tempo band"
)]
struct Args {
    /// YAML session configuration (asset root, extension, custom taals)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Overrides the configured asset root
    #[arg(long)]
    root: Option<PathBuf>,
    /// Raag ids to check
    #[arg(long = "raag", required = true)]
    raags: Vec<String>,
    /// Instrument ids to check
    #[arg(long = "instrument", required = true)]
    instruments: Vec<String>,
    /// Exit with an error when anything is missing
    #[arg(long)]
    strict: bool,
}

#[derive(Debug, Serialize, PartialEq)]
struct Entry {
    file: String,
    meter: String,
    mode: String,
    instrument: String,
    band: TempoBand,
    present: bool,
}

#[derive(Debug, Serialize)]
struct Report {
    root: String,
    expected: usize,
    missing: usize,
    entries: Vec<Entry>,
}

fn audit(
    config: &SessionConfig,
    root: &Path,
    modes: &[String],
    instruments: &[String],
) -> Result<Report> {
    let meters = config.meter_table()?;
    let locator = DirectoryLocator::new(
        root.to_string_lossy().into_owned(),
        config.asset_extension.clone(),
    );
    let mut entries = Vec::new();
    for meter in meters.ids() {
        for mode in modes {
            for instrument in instruments {
                for band in TempoBand::ALL {
                    let key = AssetKey::new(meter, mode.as_str(), instrument.as_str(), band);
                    let location = locator.locate(&key);
                    let present = Path::new(&location).is_file();
                    debug!(%location, present, "checked");
                    entries.push(Entry {
                        file: locator.file_name(&key),
                        meter: meter.to_string(),
                        mode: mode.clone(),
                        instrument: instrument.clone(),
                        band,
                        present,
                    });
                }
            }
        }
    }
    let missing = entries.iter().filter(|entry| !entry.present).count();
    Ok(Report {
        root: root.display().to_string(),
        expected: entries.len(),
        missing,
        entries,
    })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("load session config {}", path.display()))?,
        None => SessionConfig::default(),
    };
    let root = args
        .root
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.asset_root));

    let report = audit(&config, &root, &args.raags, &args.instruments)?;
    info!(
        expected = report.expected,
        missing = report.missing,
        "asset audit finished"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    if args.strict && report.missing > 0 {
        bail!("{} of {} recordings missing", report.missing, report.expected);
    }
    Ok(())
}

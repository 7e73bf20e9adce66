//! rfscope - scan database command line
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin rfscope -- init
//! cargo run --bin rfscope -- ingest scans/2024-02-01_*.json
//! cargo run --bin rfscope -- demo --scans 5 --cavity 1L22-1
//! cargo run --bin rfscope -- query --signal GMES --array power_spectrum --where "mode=CW"
//! ```
//!
//! ## Environment Variables
//!
//! - `RFSCOPE_DB_PATH` - SQLite database path (default: data/rfscope.db)
//! - `RFSCOPE_BUSY_TIMEOUT_MS` - SQLite busy timeout (default: 5000)
//! - `RFSCOPE_WAL` - WAL journal mode (default: true)
//! - `RUST_LOG` - Log level (default: info)

use chrono::{DateTime, Duration, FixedOffset, Utc};
use clap::{Parser, Subcommand};
use rand::Rng;
use rfscope::analysis::WAVEFORM_LEN;
use rfscope::model::TIME_SIGNAL;
use rfscope::store::FilterClause;
use rfscope::{DbConfig, Query, QueryFilter, Scan, ScanDocument, SqliteWaveformDb};
use std::f64::consts::PI;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(author, version, about = "RF-cavity waveform scan database", long_about = None)]
struct Cli {
    /// Database file (overrides RFSCOPE_DB_PATH)
    #[arg(long, global = true, value_name = "FILE")]
    db: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the schema
    Init,

    /// Ingest JSON scan documents, one transaction per document
    Ingest {
        #[arg(required = true, value_name = "SCAN_JSON")]
        files: Vec<PathBuf>,
    },

    /// Generate and ingest synthetic scans (noise over a sinusoid)
    Demo {
        #[arg(long, default_value_t = 3)]
        scans: usize,

        #[arg(long, default_value = "1L22-1")]
        cavity: String,

        #[arg(long, default_value_t = 5000.0)]
        sampling_rate: f64,
    },

    /// Stage a query, print the scan count, then fetch waveforms
    Query {
        /// Signal name (repeatable)
        #[arg(long = "signal", required = true)]
        signals: Vec<String>,

        /// Array name, e.g. raw or power_spectrum (repeatable)
        #[arg(long = "array")]
        arrays: Vec<String>,

        /// Waveform metric name, e.g. rms (repeatable)
        #[arg(long = "metric")]
        metrics: Vec<String>,

        /// Earliest scan start (RFC 3339)
        #[arg(long)]
        begin: Option<DateTime<FixedOffset>>,

        /// Latest scan end (RFC 3339)
        #[arg(long)]
        end: Option<DateTime<FixedOffset>>,

        /// Scan metadata condition, e.g. "mode=CW" or "temp_K<2.1" (repeatable)
        #[arg(long = "where")]
        conditions: Vec<FilterClause>,

        /// Match scans satisfying any condition instead of all
        #[arg(long)]
        any: bool,

        /// Stop after staging
        #[arg(long)]
        count_only: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    let config = match cli.db {
        Some(path) => DbConfig::with_path(path),
        None => DbConfig::from_env(),
    };

    let mut db = SqliteWaveformDb::open(&config)?;

    match cli.command {
        Command::Init => {
            log::info!("🗄️  Schema initialized at {}", config.db_path);
        }
        Command::Ingest { files } => ingest(&mut db, &files)?,
        Command::Demo {
            scans,
            cavity,
            sampling_rate,
        } => demo(&mut db, scans, &cavity, sampling_rate)?,
        Command::Query {
            signals,
            arrays,
            metrics,
            begin,
            end,
            conditions,
            any,
            count_only,
        } => {
            let mut filter = if any { QueryFilter::any() } else { QueryFilter::all() };
            for clause in conditions {
                filter = filter.with(clause);
            }

            let mut query = Query::new(&db, signals)?;
            if !arrays.is_empty() {
                query = query.array_names(arrays);
            }
            if !metrics.is_empty() {
                query = query.wf_metric_names(metrics);
            }
            if let Some(begin) = begin {
                query = query.begin(begin);
            }
            if let Some(end) = end {
                query = query.end(end);
            }
            if !filter.is_empty() {
                query = query.scan_filter(filter);
            }

            let count = query.stage()?;
            println!("Scans matched: {}", count);
            print!("{}", query.scan_meta_table()?.to_text());

            if count_only {
                return Ok(());
            }

            query.run()?;
            println!();
            print!("{}", query.wf_data_table()?.to_text());
            println!();
            print!("{}", query.wf_meta_table()?.to_text());
        }
    }

    Ok(())
}

/// Each file is its own transaction; a bad file is reported and skipped.
fn ingest(db: &mut SqliteWaveformDb, files: &[PathBuf]) -> Result<(), Box<dyn std::error::Error>> {
    let mut inserted = 0usize;
    let mut failed = 0usize;

    for path in files {
        let result = ScanDocument::from_path(path)
            .and_then(|doc| doc.into_scan())
            .map_err(|e| e.to_string())
            .and_then(|mut scan| scan.insert_data(db.connection_mut()).map_err(|e| e.to_string()));

        match result {
            Ok(sid) => {
                inserted += 1;
                log::info!("📥 {} -> sid={}", path.display(), sid);
            }
            Err(e) => {
                failed += 1;
                log::error!("❌ {}: {}", path.display(), e);
            }
        }
    }

    log::info!("✅ Ingest complete: {} inserted, {} failed", inserted, failed);
    if failed > 0 {
        return Err(format!("{} of {} scan documents failed", failed, files.len()).into());
    }
    Ok(())
}

fn demo(
    db: &mut SqliteWaveformDb,
    scans: usize,
    cavity: &str,
    sampling_rate: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = rand::thread_rng();
    let base = Utc::now();

    for i in 0..scans {
        let start = base + Duration::seconds(10 * i as i64);
        let end = start + Duration::seconds(5);
        let mut scan = Scan::new(start, end);

        let tone = rng.gen_range(50.0..500.0);
        let phase = rng.gen_range(0.0..2.0 * PI);

        let time: Vec<f64> = (0..WAVEFORM_LEN).map(|k| k as f64 / sampling_rate).collect();
        let gmes: Vec<f64> = time
            .iter()
            .map(|t| 1.0 + 0.1 * (2.0 * PI * tone * t + phase).sin() + rng.gen_range(-0.01..0.01))
            .collect();
        let pmes: Vec<f64> = time
            .iter()
            .map(|t| 45.0 + 2.0 * (2.0 * PI * tone * t).cos() + rng.gen_range(-0.5..0.5))
            .collect();

        scan.add_cavity_data(
            cavity,
            [
                ("GMES", gmes),
                ("PMES", pmes),
                (TIME_SIGNAL, time),
            ],
            sampling_rate,
        )?;
        scan.add_scan_data(
            [("tone_hz", tone), ("scan_index", i as f64)],
            [("mode", "demo")],
        )?;

        let sid = scan.insert_data(db.connection_mut())?;
        log::info!("🎲 Demo scan {} -> sid={} (tone {:.1} Hz)", i, sid, tone);
    }

    Ok(())
}

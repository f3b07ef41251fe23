//! Bar loading for the runner.
//!
//! Bars come from CSV files with the header `date,open,high,low,close,volume`
//! (dates as `YYYY-MM-DD`). Resolution policy for a symbol:
//! 1. If the path exists → read and validate it
//! 2. If not and synthetic data is allowed → generate a seeded random walk
//! 3. Otherwise → fail with a clear error
//!
//! Synthetic data is for demos and tests only; results built on it are tagged.

use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use momentumlab_core::domain::{validate_bars, Bar, BarError};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no bar file at {path} (use --synthetic for synthetic data)")]
    NotFound { path: PathBuf },

    #[error("read bars from {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path} contains no bars")]
    Empty { path: PathBuf },

    #[error("invalid bars in {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: BarError,
    },

    #[error("{path} line {line}: volume {value} is not a whole non-negative number")]
    Volume { path: PathBuf, line: usize, value: f64 },

    #[error("list directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where a bar sequence came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Csv,
    Synthetic,
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Generate synthetic bars when the file is missing.
    pub synthetic: bool,
    /// Length of a generated series.
    pub synthetic_bars: usize,
    /// First date of a generated series.
    pub synthetic_start: NaiveDate,
}

const SYNTHETIC_START: NaiveDate = match NaiveDate::from_ymd_opt(2023, 1, 2) {
    Some(d) => d,
    None => panic!("invalid synthetic start date"),
};

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            synthetic: false,
            synthetic_bars: 400,
            synthetic_start: SYNTHETIC_START,
        }
    }
}

/// One security's validated bars plus provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub symbol: String,
    pub bars: Vec<Bar>,
    pub source: DataSource,
    /// BLAKE3 over every bar, for fingerprinting results.
    pub dataset_hash: String,
}

impl LoadedData {
    pub fn from_bars(symbol: impl Into<String>, bars: Vec<Bar>, source: DataSource) -> Self {
        let dataset_hash = dataset_hash(&bars);
        Self {
            symbol: symbol.into(),
            bars,
            source,
            dataset_hash,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.source == DataSource::Synthetic
    }
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Load one security. The symbol is the file stem of `path`.
pub fn load_bars(path: &Path, opts: &LoadOptions) -> Result<LoadedData, LoadError> {
    let symbol = symbol_from_path(path);

    if path.exists() {
        let bars = read_csv(path)?;
        return Ok(LoadedData::from_bars(symbol, bars, DataSource::Csv));
    }

    if opts.synthetic {
        warn!(symbol = %symbol, "generating synthetic data, results will be tagged as synthetic");
        let bars = generate_synthetic_bars(&symbol, opts.synthetic_start, opts.synthetic_bars);
        return Ok(LoadedData::from_bars(symbol, bars, DataSource::Synthetic));
    }

    Err(LoadError::NotFound {
        path: path.to_path_buf(),
    })
}

/// Read and validate a CSV bar file.
pub fn read_csv(path: &Path) -> Result<Vec<Bar>, LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;

    let mut bars = Vec::new();
    for (i, row) in reader.deserialize::<CsvRow>().enumerate() {
        let row = row.map_err(csv_err)?;
        let volume = whole_volume(row.volume).ok_or_else(|| LoadError::Volume {
            path: path.to_path_buf(),
            // header is line 1
            line: i + 2,
            value: row.volume,
        })?;
        bars.push(Bar::new(row.date, row.open, row.high, row.low, row.close, volume));
    }

    if bars.is_empty() {
        return Err(LoadError::Empty {
            path: path.to_path_buf(),
        });
    }
    validate_bars(&bars).map_err(|source| LoadError::Invalid {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(bars)
}

/// Volumes may be written as `1200` or `1200.0`; anything else is refused.
fn whole_volume(v: f64) -> Option<u64> {
    (v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v < u64::MAX as f64).then_some(v as u64)
}

/// Load every `*.csv` in a directory, sorted by symbol.
///
/// Files that fail to parse or validate are skipped with a warning so one
/// bad file does not sink a universe scan.
pub fn load_universe(dir: &Path) -> Result<Vec<LoadedData>, LoadError> {
    let entries = std::fs::read_dir(dir).map_err(|source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv")))
        .collect();
    paths.sort();

    let mut universe = Vec::with_capacity(paths.len());
    for path in paths {
        match read_csv(&path) {
            Ok(bars) => {
                universe.push(LoadedData::from_bars(symbol_from_path(&path), bars, DataSource::Csv))
            }
            Err(e) => warn!(error = %e, "skipping bar file"),
        }
    }
    info!(dir = %dir.display(), securities = universe.len(), "universe loaded");
    Ok(universe)
}

fn symbol_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Deterministic BLAKE3 hash over dates and OHLCV values.
pub fn dataset_hash(bars: &[Bar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(bar.date.to_string().as_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Seeded random walk on weekdays, starting at 10,000.
///
/// The seed is the BLAKE3 hash of the symbol, so a symbol always maps to
/// the same series. Prices are whole units, like the venue the engine
/// rounds exit levels for.
pub fn generate_synthetic_bars(symbol: &str, start: NaiveDate, n: usize) -> Vec<Bar> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut bars = Vec::with_capacity(n);
    let mut price = 10_000.0_f64;
    let mut current = start;

    while bars.len() < n {
        let weekday = current.weekday();
        if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
            current += chrono::Duration::days(1);
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.028..0.032);
        let open = price;
        let close = (price * (1.0 + daily_return)).round().max(1.0);
        let high = (open.max(close) * (1.0 + rng.gen_range(0.0..0.015))).round();
        let low = (open.min(close) * (1.0 - rng.gen_range(0.0..0.015))).round().max(1.0);
        let volume = rng.gen_range(200_000..2_000_000u64);

        bars.push(Bar::new(current, open, high, low, close, volume));

        price = close;
        current += chrono::Duration::days(1);
    }

    bars
}

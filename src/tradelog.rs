//! Durable, append-only record of fills.
//!
//! Appends and reads are serialized by a mutex so a log can be shared between
//! engines and threads behind an `Arc`.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::engine::TradeLogEntry;
use crate::errors::{Error, Result};

/// Number of entries returned by [`TradeLogger::last_n`] when asked for zero.
pub const DEFAULT_LAST_N: usize = 10;

const HEADER: [&str; 10] = ["ts", "symbol", "tf", "event", "side", "qty", "price", "pnl", "fee", "comment"];

/// A store of trade log entries.
pub trait TradeLogger: Send + Sync {
    /// Appends one entry.
    fn append(&self, entry: TradeLogEntry) -> Result<()>;

    /// Returns the last `n` entries in append order (`n = 0` means [`DEFAULT_LAST_N`]).
    fn last_n(&self, n: usize) -> Result<Vec<TradeLogEntry>>;
}

/// CSV-file trade log.
///
/// The file starts with the header
/// `ts,symbol,tf,event,side,qty,price,pnl,fee,comment`; timestamps are RFC 3339.
#[derive(Debug)]
pub struct CsvTradeLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CsvTradeLog {
    /// Opens the log at `path`, creating it when missing. A missing or empty file
    /// gets the header.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let log = Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        };
        log.open_for_append()?.flush()?;
        Ok(log)
    }

    /// Location of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.lock.lock().map_err(|e| Error::Mutex(e.to_string()))
    }

    /// Writer positioned at the end of the file; an empty file is headed first so a
    /// truncated log stays readable.
    fn open_for_append(&self) -> Result<csv::Writer<File>> {
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let empty = file.metadata()?.len() == 0;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        if empty {
            writer.write_record(HEADER)?;
        }
        Ok(writer)
    }
}

impl TradeLogger for CsvTradeLog {
    fn append(&self, entry: TradeLogEntry) -> Result<()> {
        let _guard = self.guard()?;
        let mut writer = self.open_for_append()?;
        writer.write_record([
            entry.timestamp.to_rfc3339(),
            entry.symbol,
            entry.timeframe,
            entry.kind.to_string(),
            entry.side.label().to_owned(),
            entry.quantity.to_string(),
            entry.price.to_string(),
            entry.pnl.to_string(),
            entry.fee.to_string(),
            entry.comment,
        ])?;
        writer.flush()?;
        Ok(())
    }

    fn last_n(&self, n: usize) -> Result<Vec<TradeLogEntry>> {
        let n = if n == 0 { DEFAULT_LAST_N } else { n };
        let _guard = self.guard()?;

        let mut reader = csv::Reader::from_reader(File::open(&self.path)?);
        let mut entries = reader
            .records()
            .map(|record| parse_record(&record?))
            .collect::<Result<Vec<_>>>()?;

        let skip = entries.len().saturating_sub(n);
        Ok(entries.split_off(skip))
    }
}

fn parse_record(record: &csv::StringRecord) -> Result<TradeLogEntry> {
    let field = |i: usize| {
        record
            .get(i)
            .ok_or_else(|| Error::TradeLog(format!("missing `{}` column", HEADER[i])))
    };
    let number = |i: usize| -> Result<f64> {
        let raw = field(i)?;
        raw.parse()
            .map_err(|_| Error::TradeLog(format!("invalid `{}` value `{raw}`", HEADER[i])))
    };

    let timestamp = DateTime::parse_from_rfc3339(field(0)?)
        .map_err(|e| Error::TradeLog(format!("invalid timestamp: {e}")))?
        .with_timezone(&Utc);

    Ok(TradeLogEntry {
        timestamp,
        symbol: field(1)?.to_owned(),
        timeframe: field(2)?.to_owned(),
        kind: field(3)?.parse()?,
        side: field(4)?.parse()?,
        quantity: number(5)?,
        price: number(6)?,
        pnl: number(7)?,
        fee: number(8)?,
        comment: field(9)?.to_owned(),
    })
}

/// In-memory trade log, for tests and short-lived sessions.
#[derive(Debug, Default)]
pub struct MemoryTradeLog {
    entries: Mutex<Vec<TradeLogEntry>>,
}

impl MemoryTradeLog {
    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or_default()
    }

    /// Returns `true` when nothing was appended.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TradeLogger for MemoryTradeLog {
    fn append(&self, entry: TradeLogEntry) -> Result<()> {
        self.entries
            .lock()
            .map_err(|e| Error::Mutex(e.to_string()))?
            .push(entry);
        Ok(())
    }

    fn last_n(&self, n: usize) -> Result<Vec<TradeLogEntry>> {
        let n = if n == 0 { DEFAULT_LAST_N } else { n };
        let entries = self.entries.lock().map_err(|e| Error::Mutex(e.to_string()))?;
        let skip = entries.len().saturating_sub(n);
        Ok(entries[skip..].to_vec())
    }
}

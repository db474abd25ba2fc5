// 📤 Ledger Snapshot Export
// Writes the current ledger contents as CSV. Nothing is ever read back.

use crate::ledger::Ledger;
use crate::transaction::Transaction;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Flat CSV row; reasons are joined since CSV has no nested values
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Timestamp")]
    timestamp: String,
    #[serde(rename = "Amount")]
    amount: f64,
    #[serde(rename = "Merchant")]
    merchant: &'a str,
    #[serde(rename = "Location")]
    location: &'a str,
    #[serde(rename = "Category")]
    category: &'a str,
    #[serde(rename = "Risk_Score")]
    risk_score: u8,
    #[serde(rename = "Status")]
    status: &'static str,
    #[serde(rename = "Reasons")]
    reasons: String,
}

impl<'a> From<&'a Transaction> for CsvRow<'a> {
    fn from(tx: &'a Transaction) -> Self {
        CsvRow {
            id: tx.id().to_string(),
            timestamp: tx.timestamp().to_rfc3339(),
            amount: tx.amount(),
            merchant: tx.merchant(),
            location: tx.location(),
            category: tx.category(),
            risk_score: tx.risk_score(),
            status: tx.status().label(),
            reasons: tx.reasons().join("; "),
        }
    }
}

/// Write all ledger rows, newest first
pub fn write_csv<W: Write>(ledger: &Ledger, writer: W) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    let mut count = 0;

    for tx in ledger.iter() {
        wtr.serialize(CsvRow::from(tx))
            .context("Failed to serialize ledger row")?;
        count += 1;
    }

    wtr.flush().context("Failed to flush CSV writer")?;
    Ok(count)
}

pub fn export_csv<P: AsRef<Path>>(ledger: &Ledger, path: P) -> Result<usize> {
    let file = File::create(path.as_ref())
        .with_context(|| format!("Failed to create export file: {:?}", path.as_ref()))?;
    write_csv(ledger, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::live::LiveLoop;

    #[test]
    fn test_export_matches_ledger() {
        let mut live = LiveLoop::seeded(&SimulationConfig::default(), 1).unwrap();
        for _ in 0..4 {
            live.tick();
        }
        live.inject_attack();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.csv");
        let written = export_csv(live.ledger(), &path).unwrap();
        assert_eq!(written, 5);

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(&headers[0], "Id");
        assert_eq!(&headers[8], "Reasons");

        let records: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 5);
        assert_eq!(&records[0][7], "BLOCKED");
        assert_eq!(&records[0][3], "Unknown Merchant");
        assert_eq!(records[0][8].split("; ").count(), 3);
    }
}

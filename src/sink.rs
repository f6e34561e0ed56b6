use crate::models::{enrichment_columns, header_for, TrendRow};
use crate::scrapers::TrendsQuery;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Destination for a finished run
#[async_trait]
pub trait Sink: Send + Sync {
    /// Replace whatever the destination held with `rows`
    async fn replace_all(&self, rows: &[TrendRow]) -> Result<()>;

    fn describe(&self) -> String;
}

/// Pick a sink from the output file extension: `.csv` gets CSV, anything else JSON
pub fn sink_for(path: impl Into<PathBuf>, write_header: bool, query: TrendsQuery) -> Box<dyn Sink> {
    let path = path.into();
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        Box::new(CsvSink::new(path, write_header))
    } else {
        Box::new(JsonSink::new(path, query))
    }
}

async fn write_file(path: &Path, bytes: Vec<u8>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Sheet-shaped CSV, one record per trend
pub struct CsvSink {
    path: PathBuf,
    write_header: bool,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>, write_header: bool) -> Self {
        Self {
            path: path.into(),
            write_header,
        }
    }

    fn render(&self, rows: &[TrendRow]) -> Result<Vec<u8>> {
        let (with_sport, with_league) = enrichment_columns(rows);
        let mut writer = csv::Writer::from_writer(Vec::new());
        if self.write_header {
            writer.write_record(header_for(rows))?;
        }
        for row in rows {
            writer.write_record(row.to_record(with_sport, with_league))?;
        }
        writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush CSV: {}", e.error()))
    }
}

#[async_trait]
impl Sink for CsvSink {
    async fn replace_all(&self, rows: &[TrendRow]) -> Result<()> {
        let bytes = self.render(rows)?;
        write_file(&self.path, bytes).await?;
        info!("💾 Wrote {} rows to {}", rows.len(), self.path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }
}

#[derive(Serialize)]
struct Snapshot<'a> {
    generated_at: DateTime<Utc>,
    query: &'a TrendsQuery,
    rows: &'a [TrendRow],
}

/// Whole-run JSON snapshot with the query it came from
pub struct JsonSink {
    path: PathBuf,
    query: TrendsQuery,
}

impl JsonSink {
    pub fn new(path: impl Into<PathBuf>, query: TrendsQuery) -> Self {
        Self {
            path: path.into(),
            query,
        }
    }
}

#[async_trait]
impl Sink for JsonSink {
    async fn replace_all(&self, rows: &[TrendRow]) -> Result<()> {
        let snapshot = Snapshot {
            generated_at: Utc::now(),
            query: &self.query,
            rows,
        };
        let json = serde_json::to_vec_pretty(&snapshot)?;
        write_file(&self.path, json).await?;
        info!("💾 Wrote {} rows to {}", rows.len(), self.path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }
}

//! A workbook kept as a directory of CSV files, one per table.

use super::{InteractionLog, LOG_TABLE, SheetError, SheetSource, rows_from_values};
use async_trait::async_trait;
use hr_assistant_context::{RawRow, TableKind};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Reads `{Table}.csv` files and appends interactions to `Logs.csv`.
///
/// `Logs.csv` is never created here: a workbook without it behaves like a
/// spreadsheet without a Logs tab, and logging fails.
#[derive(Debug, Clone)]
pub struct LocalWorkbook {
    dir: PathBuf,
}

impl LocalWorkbook {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.csv"))
    }
}

fn parse_grid(content: &str) -> Result<Vec<Vec<String>>, SheetError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record?;
        grid.push(record.iter().map(|cell| cell.to_string()).collect());
    }
    Ok(grid)
}

fn encode_row(row: &[String]) -> Result<Vec<u8>, SheetError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(row)?;
    writer
        .into_inner()
        .map_err(|e| SheetError::Io(e.into_error()))
}

#[async_trait]
impl SheetSource for LocalWorkbook {
    async fn fetch_table(&self, table: TableKind) -> Result<Vec<RawRow>, SheetError> {
        let path = self.table_path(table.sheet_name());
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SheetError::MissingTable {
                    table: table.sheet_name().to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        // Spreadsheet exports often start with a UTF-8 byte order mark
        let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

        let rows = rows_from_values(parse_grid(content)?);
        tracing::info!("Read {} rows from {}", rows.len(), path.display());
        Ok(rows)
    }
}

#[async_trait]
impl InteractionLog for LocalWorkbook {
    async fn append_log(&self, row: &[String]) -> Result<(), SheetError> {
        let path = self.table_path(LOG_TABLE);
        let existing = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SheetError::MissingTable {
                    table: LOG_TABLE.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let mut line = Vec::new();
        if existing.last().is_some_and(|&b| b != b'\n') {
            line.push(b'\n');
        }
        line.extend(encode_row(row)?);

        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        tracing::debug!("Appended a row to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_fetch_table_from_csv() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("Policies.csv"),
            "\u{feff}Title,Section,Content\nWFH,Remote Work,\"Max 2 days/week, with approval\"\n,,\n",
        )
        .unwrap();

        let workbook = LocalWorkbook::new(dir.path());
        let rows = workbook.fetch_table(TableKind::Policies).await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Title"], "WFH");
        assert_eq!(rows[0]["Content"], "Max 2 days/week, with approval");
        // Trailing blank row is kept here and dropped when records are loaded
        assert!(rows[1].values().all(|v| v.is_empty()));
    }

    #[tokio::test]
    async fn test_missing_table() {
        let dir = tempdir().unwrap();
        let workbook = LocalWorkbook::new(dir.path());
        assert!(matches!(
            workbook.fetch_table(TableKind::Benefits).await,
            Err(SheetError::MissingTable { table }) if table == "Benefits"
        ));
    }

    #[tokio::test]
    async fn test_append_requires_existing_log() {
        let dir = tempdir().unwrap();
        let workbook = LocalWorkbook::new(dir.path());
        let row = vec!["t".to_string(), "q".to_string(), "a".to_string()];

        assert!(matches!(
            workbook.append_log(&row).await,
            Err(SheetError::MissingTable { .. })
        ));
        assert!(!dir.path().join("Logs.csv").exists());
    }

    #[tokio::test]
    async fn test_append_quotes_and_terminates_lines() {
        let dir = tempdir().unwrap();
        // No trailing newline after the header
        std::fs::write(dir.path().join("Logs.csv"), "Timestamp,Query,Answer").unwrap();
        let workbook = LocalWorkbook::new(dir.path());

        workbook
            .append_log(&[
                "2024-03-01 09:30:00".to_string(),
                "How many sick days, exactly?".to_string(),
                "You have \"9\" sick days.".to_string(),
            ])
            .await
            .unwrap();

        let content = std::fs::read_to_string(dir.path().join("Logs.csv")).unwrap();
        assert_eq!(
            content,
            "Timestamp,Query,Answer\n2024-03-01 09:30:00,\"How many sick days, exactly?\",\"You have \"\"9\"\" sick days.\"\n"
        );

        let grid = parse_grid(&content).unwrap();
        assert_eq!(grid.len(), 2);
        assert_eq!(grid[1][2], "You have \"9\" sick days.");
    }
}

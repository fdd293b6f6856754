//! Snapshot model and the multi-pass build over the host document.

use std::fmt;

use colmap_common::{CellValue, ColumnRange, IdentifierRegistry};

use crate::clock::Instant;
use crate::config::MAX_DATA_ROWS_PER_COLUMN;
use crate::error::HostError;
use crate::host::{
    Handle, NamedItem, ReadBatch, SheetInfo, TableInfo, UsedRange, Visibility, WorkbookHost,
};

/// One line of the serialized mapping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SnapshotEntry {
    Sheet { name: String, visibility: Visibility },
    Table { name: String },
    PivotSource { name: String },
    NamedRange { name: String },
    Binding { identifier: String, location: String },
}

impl fmt::Display for SnapshotEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotEntry::Sheet { name, visibility } => match visibility.tag() {
                Some(tag) => write!(f, "Sheet: {name} ({tag})"),
                None => write!(f, "Sheet: {name}"),
            },
            SnapshotEntry::Table { name } => write!(f, "Table: {name}"),
            SnapshotEntry::PivotSource { name } => write!(f, "PivotSource: {name}"),
            SnapshotEntry::NamedRange { name } => write!(f, "NamedRange: {name}"),
            SnapshotEntry::Binding {
                identifier,
                location,
            } => write!(f, "{identifier} = {location}"),
        }
    }
}

/// Result of one complete, successful build.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    entries: Vec<SnapshotEntry>,
    text: String,
    built_at: Instant,
}

impl Snapshot {
    pub fn new(entries: Vec<SnapshotEntry>, built_at: Instant) -> Self {
        let text = render(&entries);
        Self {
            entries,
            text,
            built_at,
        }
    }

    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn built_at(&self) -> Instant {
        self.built_at
    }
}

fn render(entries: &[SnapshotEntry]) -> String {
    entries
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Reads staged for one non-empty sheet in the third round-trip.
struct SheetReads {
    used: UsedRange,
    header: Handle<Vec<Vec<CellValue>>>,
    tables: Handle<Vec<TableInfo>>,
    pivots: Handle<Vec<String>>,
}

/// Builds snapshot entries from the host in four round-trips: sheet list,
/// used ranges, header rows with tables and pivots, named items.
#[derive(Clone, Debug)]
pub struct SnapshotBuilder {
    max_data_rows: u32,
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new(MAX_DATA_ROWS_PER_COLUMN)
    }
}

impl SnapshotBuilder {
    pub fn new(max_data_rows: u32) -> Self {
        Self { max_data_rows }
    }

    pub async fn build<H>(&self, host: &H) -> Result<Vec<SnapshotEntry>, HostError>
    where
        H: WorkbookHost + ?Sized,
    {
        let mut registry = IdentifierRegistry::new();
        let mut entries = Vec::new();

        let sheets = self.read_sheets(host).await?;
        let used_ranges = self.read_used_ranges(host, &sheets).await?;

        let mut batch = ReadBatch::new();
        let staged: Vec<Option<SheetReads>> = sheets
            .iter()
            .zip(used_ranges)
            .map(|(sheet, used)| {
                used.filter(|u| u.row_count > 0 && u.column_count > 0)
                    .map(|used| SheetReads {
                        used,
                        header: batch.range_values(
                            &sheet.name,
                            used.row_index,
                            used.column_index,
                            1,
                            used.column_count,
                        ),
                        tables: batch.tables(&sheet.name),
                        pivots: batch.pivot_tables(&sheet.name),
                    })
            })
            .collect();
        let mut results = if batch.is_empty() {
            Default::default()
        } else {
            host.commit(batch).await?
        };

        for (sheet, reads) in sheets.iter().zip(staged) {
            entries.push(SnapshotEntry::Sheet {
                name: sheet.name.clone(),
                visibility: sheet.visibility,
            });
            let Some(reads) = reads else {
                continue;
            };

            let header_rows = results.take(reads.header)?;
            let headers = header_rows.into_iter().next().unwrap_or_default();
            self.push_columns(&mut entries, &mut registry, sheet, &reads.used, &headers)?;

            for table in results.take(reads.tables)? {
                push_table(&mut entries, &mut registry, &table);
            }
            for name in results.take(reads.pivots)? {
                entries.push(SnapshotEntry::PivotSource { name });
            }
        }

        let mut batch = ReadBatch::new();
        let names = batch.named_items();
        let named = host.commit(batch).await?.take(names)?;
        for item in named {
            push_named(&mut entries, &mut registry, item);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            entries = entries.len(),
            identifiers = registry.len(),
            "built workbook structure snapshot"
        );
        Ok(entries)
    }

    async fn read_sheets<H>(&self, host: &H) -> Result<Vec<SheetInfo>, HostError>
    where
        H: WorkbookHost + ?Sized,
    {
        let mut batch = ReadBatch::new();
        let sheets = batch.sheets();
        host.commit(batch).await?.take(sheets)
    }

    async fn read_used_ranges<H>(
        &self,
        host: &H,
        sheets: &[SheetInfo],
    ) -> Result<Vec<Option<UsedRange>>, HostError>
    where
        H: WorkbookHost + ?Sized,
    {
        if sheets.is_empty() {
            return Ok(Vec::new());
        }
        let mut batch = ReadBatch::new();
        let handles: Vec<_> = sheets.iter().map(|s| batch.used_range(&s.name)).collect();
        let mut results = host.commit(batch).await?;
        handles.into_iter().map(|h| results.take(h)).collect()
    }

    /// Header row is always the first row of the used range; data starts on
    /// the row after it and is capped at `max_data_rows` past that start.
    fn push_columns(
        &self,
        entries: &mut Vec<SnapshotEntry>,
        registry: &mut IdentifierRegistry,
        sheet: &SheetInfo,
        used: &UsedRange,
        headers: &[CellValue],
    ) -> Result<(), HostError> {
        let overflow = || HostError::Protocol(format!("used range of `{}` overflows", sheet.name));
        let start_row = used
            .first_row()
            .and_then(|row| row.checked_add(1))
            .ok_or_else(overflow)?;
        let last_row = used
            .last_row()
            .ok_or_else(overflow)?
            .min(start_row.saturating_add(self.max_data_rows));
        if last_row < start_row {
            return Ok(());
        }

        for col in 0..used.column_count {
            let header = headers.get(col as usize).map(CellValue::as_text);
            let header = header.as_deref().unwrap_or("").trim();
            if header.is_empty() {
                continue;
            }
            let identifier = registry.register(header);
            let column = used.column_at(col).ok_or_else(overflow)?;
            let range = ColumnRange::new(sheet.name.as_str(), column, start_row, last_row)
                .map_err(|err| {
                    HostError::Protocol(format!("used range of `{}`: {err}", sheet.name))
                })?;
            entries.push(SnapshotEntry::Binding {
                identifier,
                location: range.to_string(),
            });
        }
        Ok(())
    }
}

/// Table fields bind to structured references so they track table resizes.
fn push_table(entries: &mut Vec<SnapshotEntry>, registry: &mut IdentifierRegistry, table: &TableInfo) {
    entries.push(SnapshotEntry::Table {
        name: table.name.clone(),
    });
    for header in &table.headers {
        if header.is_blank() {
            continue;
        }
        let field = header.as_text();
        let identifier = registry.register(&format!("{}.{}", table.name, field));
        entries.push(SnapshotEntry::Binding {
            identifier,
            location: format!("{}[{}]", table.name, field),
        });
    }
}

fn push_named(entries: &mut Vec<SnapshotEntry>, registry: &mut IdentifierRegistry, item: NamedItem) {
    let Some(address) = item.address else {
        #[cfg(feature = "tracing")]
        tracing::debug!(name = %item.name, "named item has no range address; skipping");
        return;
    };
    let identifier = registry.register(&item.name);
    entries.push(SnapshotEntry::NamedRange { name: item.name });
    entries.push(SnapshotEntry::Binding {
        identifier,
        location: address,
    });
}

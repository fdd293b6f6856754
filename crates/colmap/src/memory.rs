//! In-memory host document.
//!
//! Serves the read protocol from a serde-described workbook and records how
//! it was used, which makes it the host of choice for tests and demos.

use std::cell::{Cell, RefCell, RefMut};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use colmap_common::CellValue;
use serde::{Deserialize, Serialize};

use crate::error::HostError;
use crate::host::{
    BatchResults, NamedItem, ReadBatch, ReadRequest, ReadResult, SheetInfo, TableInfo, UsedRange,
    Visibility, WorkbookHost,
};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryWorkbook {
    #[serde(default)]
    pub sheets: Vec<MemorySheet>,
    #[serde(default)]
    pub names: Vec<NamedItem>,
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(mut self, sheet: MemorySheet) -> Self {
        self.sheets.push(sheet);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>, address: impl Into<String>) -> Self {
        self.names.push(NamedItem::new(name, address));
        self
    }

    pub fn sheet(&self, name: &str) -> Option<&MemorySheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut MemorySheet> {
        self.sheets.iter_mut().find(|s| s.name == name)
    }
}

/// A worksheet whose cell grid starts at `origin` (0-based row, column).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySheet {
    pub name: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub origin: (u32, u32),
    #[serde(default)]
    pub rows: Vec<Vec<CellValue>>,
    /// Extends the reported used range to at least this many rows, for
    /// simulating very tall sheets without materializing them.
    #[serde(default)]
    pub used_rows: Option<u32>,
    #[serde(default)]
    pub tables: Vec<TableInfo>,
    #[serde(default)]
    pub pivots: Vec<String>,
}

impl MemorySheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn at(mut self, row: u32, col: u32) -> Self {
        self.origin = (row, col);
        self
    }

    pub fn with_row<I, V>(mut self, cells: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_used_rows(mut self, rows: u32) -> Self {
        self.used_rows = Some(rows);
        self
    }

    pub fn with_table(mut self, table: TableInfo) -> Self {
        self.tables.push(table);
        self
    }

    pub fn with_pivot(mut self, name: impl Into<String>) -> Self {
        self.pivots.push(name.into());
        self
    }

    /// Bounding rectangle of non-empty cells, `None` for an empty sheet.
    pub fn used_range(&self) -> Option<UsedRange> {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for (r, row) in self.rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if *value == CellValue::Empty {
                    continue;
                }
                let (r, c) = (r as u32, c as u32);
                bounds = Some(match bounds {
                    None => (r, c, r, c),
                    Some((r0, c0, r1, c1)) => (r0.min(r), c0.min(c), r1.max(r), c1.max(c)),
                });
            }
        }
        let (r0, c0, r1, c1) = bounds?;
        let row_count = (r1 - r0 + 1).max(self.used_rows.unwrap_or(0));
        Some(UsedRange {
            row_index: self.origin.0 + r0,
            column_index: self.origin.1 + c0,
            row_count,
            column_count: c1 - c0 + 1,
        })
    }

    /// Value at an absolute 0-based position; empty outside the grid.
    pub fn value_at(&self, row: u32, col: u32) -> CellValue {
        let (Some(r), Some(c)) = (row.checked_sub(self.origin.0), col.checked_sub(self.origin.1))
        else {
            return CellValue::Empty;
        };
        self.rows
            .get(r as usize)
            .and_then(|cells| cells.get(c as usize))
            .cloned()
            .unwrap_or_default()
    }
}

fn find_sheet<'w>(workbook: &'w MemoryWorkbook, name: &str) -> Result<&'w MemorySheet, HostError> {
    workbook
        .sheet(name)
        .ok_or_else(|| HostError::ItemNotFound(format!("worksheet `{name}`")))
}

/// Completes on the second poll, giving other tasks a turn in between.
#[derive(Default)]
struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

/// [`WorkbookHost`] over a [`MemoryWorkbook`].
///
/// Each commit suspends once before answering, like a real host round-trip.
#[derive(Debug, Default)]
pub struct MemoryHost {
    workbook: RefCell<MemoryWorkbook>,
    commits: Cell<usize>,
    reads: Cell<usize>,
    unavailable: Cell<bool>,
    fail_on_commit: Cell<Option<usize>>,
}

impl MemoryHost {
    pub fn new(workbook: MemoryWorkbook) -> Self {
        Self {
            workbook: RefCell::new(workbook),
            ..Default::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json).map(Self::new)
    }

    /// Mutable access to the document, e.g. to simulate an edit between builds.
    pub fn workbook_mut(&self) -> RefMut<'_, MemoryWorkbook> {
        self.workbook.borrow_mut()
    }

    /// Number of batches committed so far, including failed ones.
    pub fn commits(&self) -> usize {
        self.commits.get()
    }

    /// Number of individual reads staged across all commits.
    pub fn reads(&self) -> usize {
        self.reads.get()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.set(unavailable);
    }

    /// Make the `n`th commit from now (1-based) fail with [`HostError::Unavailable`].
    pub fn fail_on_commit(&self, n: usize) {
        self.fail_on_commit.set(Some(self.commits.get() + n));
    }

    fn resolve(&self, request: &ReadRequest) -> Result<ReadResult, HostError> {
        let workbook = self.workbook.borrow();
        Ok(match request {
            ReadRequest::Sheets => ReadResult::Sheets {
                items: workbook
                    .sheets
                    .iter()
                    .map(|s| SheetInfo::new(s.name.clone(), s.visibility))
                    .collect(),
            },
            ReadRequest::UsedRange { sheet: name } => ReadResult::UsedRange {
                range: find_sheet(&workbook, name)?.used_range(),
            },
            ReadRequest::RangeValues {
                sheet: name,
                row_index,
                column_index,
                row_count,
                column_count,
            } => {
                let sheet = find_sheet(&workbook, name)?;
                let values = (*row_index..row_index + row_count)
                    .map(|r| {
                        (*column_index..column_index + column_count)
                            .map(|c| sheet.value_at(r, c))
                            .collect::<Vec<_>>()
                    })
                    .collect();
                ReadResult::RangeValues { values }
            }
            ReadRequest::Tables { sheet: name } => ReadResult::Tables {
                items: find_sheet(&workbook, name)?.tables.clone(),
            },
            ReadRequest::PivotTables { sheet: name } => ReadResult::PivotTables {
                names: find_sheet(&workbook, name)?.pivots.clone(),
            },
            ReadRequest::NamedItems => ReadResult::NamedItems {
                items: workbook.names.clone(),
            },
        })
    }
}

impl WorkbookHost for MemoryHost {
    async fn commit(&self, batch: ReadBatch) -> Result<BatchResults, HostError> {
        let commit = self.commits.get() + 1;
        self.commits.set(commit);
        self.reads.set(self.reads.get() + batch.len());

        YieldNow::default().await;

        if self.unavailable.get() {
            return Err(HostError::Unavailable("workbook host is not reachable".into()));
        }
        if self.fail_on_commit.get() == Some(commit) {
            self.fail_on_commit.set(None);
            return Err(HostError::Unavailable(format!("commit #{commit} was rejected")));
        }

        let results = batch
            .requests()
            .iter()
            .map(|request| self.resolve(request))
            .collect::<Result<Vec<_>, _>>()?;
        BatchResults::for_batch(&batch, results)
    }
}

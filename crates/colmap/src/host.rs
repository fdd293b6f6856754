//! Two-phase read protocol against the host document.
//!
//! Reads are staged into a [`ReadBatch`], flushed in one round-trip through
//! [`WorkbookHost::commit`], and consumed from the returned [`BatchResults`]
//! with the typed [`Handle`]s handed out while staging. Nothing staged is
//! readable until the batch has been committed.

use std::future::Future;
use std::marker::PhantomData;
use std::rc::Rc;

use colmap_common::CellValue;
use serde::{Deserialize, Serialize};

use crate::error::HostError;

/// Worksheet visibility as reported by the host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
    VeryHidden,
}

impl Visibility {
    /// Lowercase tag appended to a sheet header line; `None` when visible.
    pub fn tag(self) -> Option<&'static str> {
        match self {
            Visibility::Visible => None,
            Visibility::Hidden => Some("hidden"),
            Visibility::VeryHidden => Some("veryhidden"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetInfo {
    pub name: String,
    #[serde(default)]
    pub visibility: Visibility,
}

impl SheetInfo {
    pub fn new(name: impl Into<String>, visibility: Visibility) -> Self {
        Self {
            name: name.into(),
            visibility,
        }
    }
}

/// Bounding rectangle of the non-empty cells on a sheet. Indices are 0-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsedRange {
    pub row_index: u32,
    pub column_index: u32,
    pub row_count: u32,
    pub column_count: u32,
}

impl UsedRange {
    /// 1-based number of the first row, or `None` if it does not fit a `u32`.
    pub fn first_row(&self) -> Option<u32> {
        self.row_index.checked_add(1)
    }

    /// 1-based number of the last row, inclusive.
    pub fn last_row(&self) -> Option<u32> {
        self.row_index.checked_add(self.row_count)
    }

    /// 0-based index of the `offset`-th column of the range.
    pub fn column_at(&self, offset: u32) -> Option<u32> {
        self.column_index.checked_add(offset)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    pub name: String,
    /// Values of the table's header row, left to right.
    #[serde(default)]
    pub headers: Vec<CellValue>,
    #[serde(default)]
    pub body_address: Option<String>,
}

impl TableInfo {
    pub fn new<I, V>(name: impl Into<String>, headers: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        Self {
            name: name.into(),
            headers: headers.into_iter().map(Into::into).collect(),
            body_address: None,
        }
    }
}

/// Document-scoped defined name. `address` is absent for names that do not
/// resolve to a range (constants, formulas).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedItem {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
}

impl NamedItem {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: Some(address.into()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ReadRequest {
    Sheets,
    UsedRange {
        sheet: String,
    },
    RangeValues {
        sheet: String,
        row_index: u32,
        column_index: u32,
        row_count: u32,
        column_count: u32,
    },
    Tables {
        sheet: String,
    },
    PivotTables {
        sheet: String,
    },
    NamedItems,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ReadResult {
    Sheets {
        items: Vec<SheetInfo>,
    },
    UsedRange {
        #[serde(default)]
        range: Option<UsedRange>,
    },
    RangeValues {
        values: Vec<Vec<CellValue>>,
    },
    Tables {
        items: Vec<TableInfo>,
    },
    PivotTables {
        names: Vec<String>,
    },
    NamedItems {
        items: Vec<NamedItem>,
    },
}

impl ReadResult {
    pub fn kind(&self) -> &'static str {
        match self {
            ReadResult::Sheets { .. } => "sheets",
            ReadResult::UsedRange { .. } => "usedRange",
            ReadResult::RangeValues { .. } => "rangeValues",
            ReadResult::Tables { .. } => "tables",
            ReadResult::PivotTables { .. } => "pivotTables",
            ReadResult::NamedItems { .. } => "namedItems",
        }
    }
}

/// Payload types that can be extracted from a [`ReadResult`].
pub trait ReadOutput: Sized {
    /// Returns the result back when its kind does not match.
    fn from_result(result: ReadResult) -> Result<Self, ReadResult>;
}

impl ReadOutput for Vec<SheetInfo> {
    fn from_result(result: ReadResult) -> Result<Self, ReadResult> {
        match result {
            ReadResult::Sheets { items } => Ok(items),
            other => Err(other),
        }
    }
}

impl ReadOutput for Option<UsedRange> {
    fn from_result(result: ReadResult) -> Result<Self, ReadResult> {
        match result {
            ReadResult::UsedRange { range } => Ok(range),
            other => Err(other),
        }
    }
}

impl ReadOutput for Vec<Vec<CellValue>> {
    fn from_result(result: ReadResult) -> Result<Self, ReadResult> {
        match result {
            ReadResult::RangeValues { values } => Ok(values),
            other => Err(other),
        }
    }
}

impl ReadOutput for Vec<TableInfo> {
    fn from_result(result: ReadResult) -> Result<Self, ReadResult> {
        match result {
            ReadResult::Tables { items } => Ok(items),
            other => Err(other),
        }
    }
}

impl ReadOutput for Vec<String> {
    fn from_result(result: ReadResult) -> Result<Self, ReadResult> {
        match result {
            ReadResult::PivotTables { names } => Ok(names),
            other => Err(other),
        }
    }
}

impl ReadOutput for Vec<NamedItem> {
    fn from_result(result: ReadResult) -> Result<Self, ReadResult> {
        match result {
            ReadResult::NamedItems { items } => Ok(items),
            other => Err(other),
        }
    }
}

/// Typed ticket for a staged read.
#[derive(Debug)]
pub struct Handle<T> {
    index: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> Handle<T> {
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Reads staged for a single round-trip.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadBatch {
    requests: Vec<ReadRequest>,
}

impl ReadBatch {
    pub fn new() -> Self {
        Self::default()
    }

    fn stage<T: ReadOutput>(&mut self, request: ReadRequest) -> Handle<T> {
        let index = self.requests.len();
        self.requests.push(request);
        Handle {
            index,
            _marker: PhantomData,
        }
    }

    pub fn sheets(&mut self) -> Handle<Vec<SheetInfo>> {
        self.stage(ReadRequest::Sheets)
    }

    pub fn used_range(&mut self, sheet: &str) -> Handle<Option<UsedRange>> {
        self.stage(ReadRequest::UsedRange {
            sheet: sheet.to_owned(),
        })
    }

    pub fn range_values(
        &mut self,
        sheet: &str,
        row_index: u32,
        column_index: u32,
        row_count: u32,
        column_count: u32,
    ) -> Handle<Vec<Vec<CellValue>>> {
        self.stage(ReadRequest::RangeValues {
            sheet: sheet.to_owned(),
            row_index,
            column_index,
            row_count,
            column_count,
        })
    }

    pub fn tables(&mut self, sheet: &str) -> Handle<Vec<TableInfo>> {
        self.stage(ReadRequest::Tables {
            sheet: sheet.to_owned(),
        })
    }

    pub fn pivot_tables(&mut self, sheet: &str) -> Handle<Vec<String>> {
        self.stage(ReadRequest::PivotTables {
            sheet: sheet.to_owned(),
        })
    }

    pub fn named_items(&mut self) -> Handle<Vec<NamedItem>> {
        self.stage(ReadRequest::NamedItems)
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn requests(&self) -> &[ReadRequest] {
        &self.requests
    }
}

/// Results of a committed batch, in staging order.
#[derive(Debug, Default)]
pub struct BatchResults {
    slots: Vec<Option<ReadResult>>,
}

impl BatchResults {
    pub fn new(results: Vec<ReadResult>) -> Self {
        Self {
            slots: results.into_iter().map(Some).collect(),
        }
    }

    /// Pair results with the batch that produced them, rejecting a count mismatch.
    pub fn for_batch(batch: &ReadBatch, results: Vec<ReadResult>) -> Result<Self, HostError> {
        if results.len() != batch.len() {
            return Err(HostError::Protocol(format!(
                "batch staged {} reads but host returned {} results",
                batch.len(),
                results.len()
            )));
        }
        Ok(Self::new(results))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Consume the result for `handle`. Each handle can be taken once.
    pub fn take<T: ReadOutput>(&mut self, handle: Handle<T>) -> Result<T, HostError> {
        let result = self
            .slots
            .get_mut(handle.index)
            .and_then(Option::take)
            .ok_or_else(|| {
                HostError::Protocol(format!("no result for staged read #{}", handle.index))
            })?;
        T::from_result(result).map_err(|other| {
            HostError::Protocol(format!(
                "staged read #{} answered with a `{}` result",
                handle.index,
                other.kind()
            ))
        })
    }
}

/// Host document access: flushes a staged batch in one round-trip.
pub trait WorkbookHost {
    fn commit(&self, batch: ReadBatch) -> impl Future<Output = Result<BatchResults, HostError>>;
}

impl<H: WorkbookHost + ?Sized> WorkbookHost for &H {
    fn commit(&self, batch: ReadBatch) -> impl Future<Output = Result<BatchResults, HostError>> {
        (**self).commit(batch)
    }
}

impl<H: WorkbookHost + ?Sized> WorkbookHost for Rc<H> {
    fn commit(&self, batch: ReadBatch) -> impl Future<Output = Result<BatchResults, HostError>> {
        (**self).commit(batch)
    }
}

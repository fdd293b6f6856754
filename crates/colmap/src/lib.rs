//! Workbook structure snapshot cache.
//!
//! Builds a line-oriented map from human-readable field names to spreadsheet
//! locations (header-delimited columns, table fields, named ranges), keeps it
//! for a TTL, and drops it when the workbook changes structurally:
//!
//! ```text
//! Sheet: Orders
//! region = 'Orders'!A2:A120
//! amount = 'Orders'!B2:B120
//! Table: Sales
//! sales.region = Sales[Region]
//! NamedRange: TaxRate
//! taxrate = Settings!$B$1
//! ```

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod host;
pub mod memory;
pub mod payload;
pub mod snapshot;

pub use cache::{RefreshOutcome, SnapshotCache};
pub use clock::{Clock, Instant, ManualClock, SystemClock};
pub use config::{DEFAULT_TTL, MAX_DATA_ROWS_PER_COLUMN, SnapshotConfig};
pub use error::{HostError, PayloadError};
pub use events::{EventHub, SnapshotEvent, SubscriptionId};
pub use host::{
    BatchResults, Handle, NamedItem, ReadBatch, ReadOutput, ReadRequest, ReadResult, SheetInfo,
    TableInfo, UsedRange, Visibility, WorkbookHost,
};
pub use memory::{MemoryHost, MemorySheet, MemoryWorkbook};
pub use payload::{
    GenerateRequest, GenerateResponse, finalize_formula, resolve_api_base, sanitize_for_display,
    sanitize_formula,
};
pub use snapshot::{Snapshot, SnapshotBuilder, SnapshotEntry};

// Re-export for convenience
pub use colmap_common::{CellValue, IdentifierRegistry, normalize_identifier};

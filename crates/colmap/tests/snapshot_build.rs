use colmap::{
    BatchResults, CellValue, HostError, Instant, MemoryHost, MemorySheet, MemoryWorkbook,
    NamedItem, ReadBatch, ReadRequest, ReadResult, RefreshOutcome, SheetInfo, Snapshot,
    SnapshotBuilder, SnapshotCache, SnapshotEntry, SnapshotEvent, TableInfo, UsedRange,
    Visibility, WorkbookHost,
};
use futures::executor::block_on;

fn build(workbook: MemoryWorkbook) -> (Vec<SnapshotEntry>, MemoryHost) {
    let host = MemoryHost::new(workbook);
    let entries = block_on(SnapshotBuilder::default().build(&host)).unwrap();
    (entries, host)
}

fn text(entries: &[SnapshotEntry]) -> String {
    Snapshot::new(entries.to_vec(), Instant::now()).text().to_owned()
}

fn orders_workbook() -> MemoryWorkbook {
    MemoryWorkbook::new()
        .with_sheet(
            MemorySheet::new("Orders")
                .with_row(["Region", "Amount"])
                .with_row([CellValue::from("North"), CellValue::from(10.0)])
                .with_row([CellValue::from("South"), CellValue::from(20.0)])
                .with_table(TableInfo::new("Sales", ["Region", "Amount"]))
                .with_pivot("OrdersPivot"),
        )
        .with_sheet(MemorySheet::new("Archive").with_visibility(Visibility::Hidden))
        .with_name("TaxRate", "Orders!$D$1")
}

#[test]
fn full_snapshot_layout() {
    let (entries, _) = build(orders_workbook());
    assert_eq!(
        text(&entries),
        "Sheet: Orders\n\
         region = 'Orders'!A2:A3\n\
         amount = 'Orders'!B2:B3\n\
         Table: Sales\n\
         sales.region = Sales[Region]\n\
         sales.amount = Sales[Amount]\n\
         PivotSource: OrdersPivot\n\
         Sheet: Archive (hidden)\n\
         NamedRange: TaxRate\n\
         taxrate = Orders!$D$1"
    );
}

#[test]
fn build_uses_four_round_trips() {
    let workbook = orders_workbook()
        .with_sheet(MemorySheet::new("Q1").with_row(["Total"]).with_row([1.0]))
        .with_sheet(MemorySheet::new("Q2").with_row(["Total"]).with_row([2.0]));
    let (_, host) = build(workbook);
    assert_eq!(host.commits(), 4);
    // sheets + 4 used ranges + 3 non-empty sheets * (header, tables, pivots) + names
    assert_eq!(host.reads(), 1 + 4 + 9 + 1);
}

#[test]
fn empty_document_is_not_an_error() {
    let (entries, host) = build(MemoryWorkbook::new());
    assert!(entries.is_empty());
    assert_eq!(host.commits(), 2);
}

#[test]
fn colliding_headers_across_sheets_get_suffix_two() {
    let workbook = MemoryWorkbook::new()
        .with_sheet(MemorySheet::new("Jan").with_row(["Total"]).with_row([1.0]))
        .with_sheet(MemorySheet::new("Feb").with_row([" total "]).with_row([2.0]));
    let (entries, _) = build(workbook);
    let rendered = text(&entries);
    assert!(rendered.contains("\ntotal = 'Jan'!A2:A2"));
    assert!(rendered.contains("\ntotal__2 = 'Feb'!A2:A2"));
    assert!(!rendered.contains("total__1"));
    assert_eq!(rendered.matches("\ntotal = ").count(), 1);
}

#[test]
fn identifiers_share_one_namespace() {
    let workbook = MemoryWorkbook::new()
        .with_sheet(
            MemorySheet::new("Settings")
                .with_row(["Tax Rate", "Sales.Region"])
                .with_row([0.2, 1.0])
                .with_table(TableInfo::new("Sales", ["Region"])),
        )
        .with_name("Tax Rate", "Settings!$A$2");
    let (entries, _) = build(workbook);
    let idents: Vec<_> = entries
        .iter()
        .filter_map(|e| match e {
            SnapshotEntry::Binding { identifier, .. } => Some(identifier.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(
        idents,
        vec!["tax_rate", "sales.region", "sales.region__2", "tax_rate__2"]
    );
}

#[test]
fn data_starts_on_second_row_of_used_range() {
    let workbook = MemoryWorkbook::new().with_sheet(
        MemorySheet::new("Data")
            .with_row(["Amount"])
            .with_used_rows(10),
    );
    let (entries, _) = build(workbook);
    assert_eq!(text(&entries), "Sheet: Data\namount = 'Data'!A2:A10");
}

#[test]
fn data_rows_are_capped() {
    let workbook = MemoryWorkbook::new().with_sheet(
        MemorySheet::new("Data")
            .with_row(["Amount", "Qty"])
            .with_used_rows(100_050),
    );
    let (entries, _) = build(workbook);
    assert_eq!(
        text(&entries),
        "Sheet: Data\namount = 'Data'!A2:A50002\nqty = 'Data'!B2:B50002"
    );
}

#[test]
fn cap_follows_builder_setting() {
    let host = MemoryHost::new(MemoryWorkbook::new().with_sheet(
        MemorySheet::new("Data")
            .with_row(["Amount"])
            .with_used_rows(500),
    ));
    let entries = block_on(SnapshotBuilder::new(100).build(&host)).unwrap();
    assert_eq!(text(&entries), "Sheet: Data\namount = 'Data'!A2:A102");
}

#[test]
fn used_range_offset_moves_header_and_data() {
    let workbook = MemoryWorkbook::new().with_sheet(
        MemorySheet::new("Report")
            .at(4, 2)
            .with_row(["Name"])
            .with_row(["x"])
            .with_row(["y"]),
    );
    let (entries, _) = build(workbook);
    assert_eq!(text(&entries), "Sheet: Report\nname = 'Report'!C6:C7");
}

#[test]
fn header_only_sheet_has_no_column_bindings() {
    let workbook = MemoryWorkbook::new().with_sheet(
        MemorySheet::new("Template")
            .with_row(["Region", "Amount"])
            .with_table(TableInfo::new("Plan", ["Region"])),
    );
    let (entries, _) = build(workbook);
    assert_eq!(
        text(&entries),
        "Sheet: Template\nTable: Plan\nplan.region = Plan[Region]"
    );
}

#[test]
fn empty_sheet_contributes_only_its_header() {
    let workbook = MemoryWorkbook::new()
        .with_sheet(MemorySheet::new("Blank"))
        .with_sheet(MemorySheet::new("Data").with_row(["Amount"]).with_row([5.0]));
    let (entries, _) = build(workbook);
    assert_eq!(
        text(&entries),
        "Sheet: Blank\nSheet: Data\namount = 'Data'!A2:A2"
    );
}

#[test]
fn blank_headers_are_skipped() {
    let workbook = MemoryWorkbook::new().with_sheet(
        MemorySheet::new("Data")
            .with_row([
                CellValue::from("Region"),
                CellValue::Empty,
                CellValue::from("   "),
                CellValue::from(2023.0),
            ])
            .with_row([1.0, 2.0, 3.0, 4.0])
            .with_table(TableInfo::new("T", ["", "Field"])),
    );
    let (entries, _) = build(workbook);
    assert_eq!(
        text(&entries),
        "Sheet: Data\n\
         region = 'Data'!A2:A2\n\
         2023 = 'Data'!D2:D2\n\
         Table: T\n\
         t.field = T[Field]"
    );
}

#[test]
fn hidden_sheets_are_tagged() {
    let workbook = MemoryWorkbook::new()
        .with_sheet(MemorySheet::new("Open"))
        .with_sheet(MemorySheet::new("Secret").with_visibility(Visibility::Hidden))
        .with_sheet(MemorySheet::new("Deep").with_visibility(Visibility::VeryHidden));
    let (entries, _) = build(workbook);
    assert_eq!(
        text(&entries),
        "Sheet: Open\nSheet: Secret (hidden)\nSheet: Deep (veryhidden)"
    );
}

#[test]
fn sheet_names_are_quote_escaped() {
    let workbook = MemoryWorkbook::new().with_sheet(
        MemorySheet::new("Bob's Data")
            .with_row(["Score"])
            .with_row([1.0]),
    );
    let (entries, _) = build(workbook);
    assert_eq!(
        text(&entries),
        "Sheet: Bob's Data\nscore = 'Bob''s Data'!A2:A2"
    );
}

#[test]
fn table_fields_use_structured_references() {
    let workbook = MemoryWorkbook::new().with_sheet(
        MemorySheet::new("Sheet1")
            .with_row(["x"])
            .with_table(TableInfo::new("Sales", ["Region", "Unit Price"])),
    );
    let (entries, _) = build(workbook);
    let rendered = text(&entries);
    assert!(rendered.contains("\nsales.region = Sales[Region]"));
    assert!(rendered.contains("\nsales.unit_price = Sales[Unit Price]"));
}

#[test]
fn unresolvable_names_are_skipped() {
    let mut workbook = MemoryWorkbook::new().with_name("Start", "Data!$A$1");
    workbook.names.push(NamedItem {
        name: "Pi".into(),
        address: None,
    });
    let (entries, _) = build(workbook);
    assert_eq!(text(&entries), "NamedRange: Start\nstart = Data!$A$1");
}

#[test]
fn consecutive_builds_are_identical() {
    let host = MemoryHost::new(orders_workbook());
    let builder = SnapshotBuilder::default();
    let first = block_on(builder.build(&host)).unwrap();
    let second = block_on(builder.build(&host)).unwrap();
    assert_eq!(text(&first), text(&second));
}

#[test]
fn host_failure_aborts_build() {
    let host = MemoryHost::new(orders_workbook());
    host.fail_on_commit(3);
    let err = block_on(SnapshotBuilder::default().build(&host)).unwrap_err();
    assert!(matches!(err, colmap::HostError::Unavailable(_)));
}

#[test]
fn workbook_from_json() {
    let host = MemoryHost::from_json_str(
        r#"{
            "sheets": [
                {"name": "Data", "visibility": "Hidden", "rows": [["Region", null, "Amount"], ["N", 1, 2]]}
            ],
            "names": [{"name": "Top", "address": "Data!$A$2"}]
        }"#,
    )
    .unwrap();
    let entries = block_on(SnapshotBuilder::default().build(&host)).unwrap();
    assert_eq!(
        text(&entries),
        "Sheet: Data (hidden)\n\
         region = 'Data'!A2:A2\n\
         amount = 'Data'!C2:C2\n\
         NamedRange: Top\n\
         top = Data!$A$2"
    );
}

/// Answers every read with the same single-sheet layout, whatever the used range says.
struct FixedHost {
    used: UsedRange,
}

impl WorkbookHost for FixedHost {
    async fn commit(&self, batch: ReadBatch) -> Result<BatchResults, HostError> {
        let results = batch
            .requests()
            .iter()
            .map(|request| match request {
                ReadRequest::Sheets => ReadResult::Sheets {
                    items: vec![SheetInfo::new("Broken", Visibility::Visible)],
                },
                ReadRequest::UsedRange { .. } => ReadResult::UsedRange {
                    range: Some(self.used),
                },
                ReadRequest::RangeValues { .. } => ReadResult::RangeValues {
                    values: vec![vec![CellValue::from("Total")]],
                },
                ReadRequest::Tables { .. } => ReadResult::Tables { items: vec![] },
                ReadRequest::PivotTables { .. } => ReadResult::PivotTables { names: vec![] },
                ReadRequest::NamedItems => ReadResult::NamedItems { items: vec![] },
            })
            .collect();
        BatchResults::for_batch(&batch, results)
    }
}

#[test]
fn oversized_used_range_is_a_protocol_error() {
    let host = FixedHost {
        used: UsedRange {
            row_index: u32::MAX - 1,
            column_index: 0,
            row_count: 5,
            column_count: 1,
        },
    };
    let err = block_on(SnapshotBuilder::default().build(&host)).unwrap_err();
    assert_eq!(
        err,
        HostError::Protocol("used range of `Broken` overflows".to_string())
    );
}

#[test]
fn oversized_used_range_fails_the_refresh() {
    let cache = SnapshotCache::new(FixedHost {
        used: UsedRange {
            row_index: u32::MAX - 1,
            column_index: 0,
            row_count: 5,
            column_count: 1,
        },
    });
    let failures = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let sink = failures.clone();
    cache.subscribe(move |event| {
        if let SnapshotEvent::BuildFailed { message } = event {
            sink.borrow_mut().push(message.clone());
        }
    });

    assert_eq!(block_on(cache.ensure_fresh(true)), RefreshOutcome::Failed);
    assert_eq!(cache.current_snapshot(), "");
    assert_eq!(
        *failures.borrow(),
        ["host protocol violation: used range of `Broken` overflows"]
    );
}

#[test]
fn column_offset_from_host_is_applied() {
    let host = FixedHost {
        used: UsedRange {
            row_index: 0,
            column_index: 3,
            row_count: 4,
            column_count: 1,
        },
    };
    let entries = block_on(SnapshotBuilder::default().build(&host)).unwrap();
    assert_eq!(text(&entries), "Sheet: Broken\ntotal = 'Broken'!D2:D4");
}

use colmap_wasm::{ColumnMapCache, build_generate_request, finalize_formula, sanitize_formula};
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;

const FAKE_HOST: &str = r#"
    return Promise.resolve(requests.map((r) => {
        switch (r.kind) {
            case "sheets": return { kind: "sheets", items: [{ name: "Data", visibility: "Visible" }] };
            case "usedRange": return { kind: "usedRange", range: { rowIndex: 0, columnIndex: 0, rowCount: 3, columnCount: 1 } };
            case "rangeValues": return { kind: "rangeValues", values: [["Amount"]] };
            case "tables": return { kind: "tables", items: [] };
            case "pivotTables": return { kind: "pivotTables", names: [] };
            case "namedItems": return { kind: "namedItems", items: [] };
        }
    }));
"#;

#[wasm_bindgen_test]
fn test_sanitize_formula() {
    assert_eq!(sanitize_formula("=A1\u{00D7}2"), "=A1*2");
    assert_eq!(finalize_formula(Some("SUM(A:A)".into())), "=SUM(A:A)");
}

#[wasm_bindgen_test]
fn test_build_generate_request() {
    let req = build_generate_request("total", "x = A", None, None).unwrap();
    assert!(req.is_object());
    assert!(build_generate_request(" ", "x = A", None, None).is_err());
}

#[wasm_bindgen_test]
async fn test_cache_round_trip() {
    let commit = js_sys::Function::new_with_args("requests", FAKE_HOST);
    let cache = ColumnMapCache::new(commit, JsValue::UNDEFINED).unwrap();
    assert_eq!(cache.current_snapshot(), "");

    let outcome = JsFuture::from(cache.ensure_fresh(Some(true))).await.unwrap();
    assert_eq!(outcome.as_string().as_deref(), Some("rebuilt"));
    assert_eq!(cache.current_snapshot(), "Sheet: Data\namount = 'Data'!A2:A3");

    let outcome = JsFuture::from(cache.ensure_fresh(None)).await.unwrap();
    assert_eq!(outcome.as_string().as_deref(), Some("fresh"));

    cache.invalidate();
    assert_eq!(cache.current_snapshot(), "");
}

#[wasm_bindgen_test]
async fn test_host_rejection_is_reported_not_thrown() {
    let commit = js_sys::Function::new_with_args("requests", "throw new Error('no excel');");
    let cache = ColumnMapCache::new(commit, JsValue::UNDEFINED).unwrap();
    let outcome = JsFuture::from(cache.ensure_fresh(Some(true))).await.unwrap();
    assert_eq!(outcome.as_string().as_deref(), Some("failed"));
    assert_eq!(cache.current_snapshot(), "");
}

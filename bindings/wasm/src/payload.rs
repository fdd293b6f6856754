use colmap::GenerateRequest;
use wasm_bindgen::prelude::*;

use crate::utils::{js_error, to_js_value};

#[wasm_bindgen(js_name = "sanitizeFormula")]
pub fn sanitize_formula(input: &str) -> String {
    colmap::sanitize_formula(input)
}

#[wasm_bindgen(js_name = "finalizeFormula")]
pub fn finalize_formula(raw: Option<String>) -> String {
    colmap::finalize_formula(raw.as_deref())
}

#[wasm_bindgen(js_name = "sanitizeForDisplay")]
pub fn sanitize_for_display(input: &str) -> String {
    colmap::sanitize_for_display(input)
}

#[wasm_bindgen(js_name = "resolveApiBase")]
pub fn resolve_api_base(query_param: Option<String>, stored: Option<String>) -> String {
    colmap::resolve_api_base(query_param.as_deref(), stored.as_deref())
}

/// Build the `/generate` request body as a plain object.
#[wasm_bindgen(js_name = "buildGenerateRequest")]
pub fn build_generate_request(
    query: &str,
    column_map: &str,
    excel_version: Option<String>,
    main_sheet: Option<String>,
) -> Result<JsValue, JsValue> {
    let request = GenerateRequest::new(
        query,
        column_map,
        excel_version.as_deref(),
        main_sheet.as_deref(),
    )
    .map_err(|e| js_error(e.to_string()))?;
    to_js_value(&request)
}

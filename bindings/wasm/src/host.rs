use colmap::{BatchResults, HostError, ReadBatch, ReadResult, WorkbookHost};
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;

use crate::utils::{describe_js_error, to_js_value};

/// Host that forwards each read batch to a JavaScript callback.
///
/// The callback receives the staged requests (`[{kind: "sheets"}, ...]`),
/// runs them against `Excel.run` with a single `context.sync()`, and returns
/// (or resolves to) the results in the same order, each tagged with `kind`.
pub struct JsHost {
    commit: js_sys::Function,
}

impl JsHost {
    pub fn new(commit: js_sys::Function) -> Self {
        Self { commit }
    }
}

impl WorkbookHost for JsHost {
    async fn commit(&self, batch: ReadBatch) -> Result<BatchResults, HostError> {
        let requests = to_js_value(batch.requests())
            .map_err(|e| HostError::Protocol(describe_js_error(&e)))?;
        let returned = self
            .commit
            .call1(&JsValue::NULL, &requests)
            .map_err(|e| HostError::Unavailable(describe_js_error(&e)))?;
        let resolved = JsFuture::from(js_sys::Promise::resolve(&returned))
            .await
            .map_err(|e| HostError::Unavailable(describe_js_error(&e)))?;
        let results: Vec<ReadResult> = serde_wasm_bindgen::from_value(resolved)
            .map_err(|e| HostError::Protocol(e.to_string()))?;
        BatchResults::for_batch(&batch, results)
    }
}

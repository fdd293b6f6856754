use std::rc::Rc;

use colmap::{SnapshotCache, SnapshotConfig, SnapshotEvent, SubscriptionId};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use crate::host::JsHost;
use crate::utils::{js_error, set};

fn event_to_js(event: &SnapshotEvent) -> Result<JsValue, JsValue> {
    let obj = js_sys::Object::new();
    set(&obj, "type", JsValue::from_str(event.name()))?;
    match event {
        SnapshotEvent::Updated { text } => set(&obj, "columnMap", JsValue::from_str(text))?,
        SnapshotEvent::BuildFailed { message } => {
            set(&obj, "message", JsValue::from_str(message))?
        }
        SnapshotEvent::Invalidated => {}
    }
    Ok(obj.into())
}

/// Browser-facing handle to a workbook structure snapshot cache.
#[wasm_bindgen]
pub struct ColumnMapCache {
    inner: Rc<SnapshotCache<JsHost>>,
}

#[wasm_bindgen]
impl ColumnMapCache {
    /// `commit` is `(requests) => results | Promise<results>`; `config` is an
    /// optional `{ ttlMs, maxDataRows }` object.
    #[wasm_bindgen(constructor)]
    pub fn new(commit: js_sys::Function, config: JsValue) -> Result<ColumnMapCache, JsValue> {
        let config = if config.is_undefined() || config.is_null() {
            SnapshotConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)
                .map_err(|e| js_error(format!("invalid cache config: {e}")))?
        };
        Ok(ColumnMapCache {
            inner: Rc::new(SnapshotCache::with_config(JsHost::new(commit), config)),
        })
    }

    /// Resolves to the refresh outcome: `"fresh"`, `"rebuilt"`, `"inProgress"`,
    /// `"discarded"` or `"failed"`. Never rejects.
    #[wasm_bindgen(js_name = "ensureFresh")]
    pub fn ensure_fresh(&self, force: Option<bool>) -> js_sys::Promise {
        let cache = Rc::clone(&self.inner);
        future_to_promise(async move {
            let outcome = cache.ensure_fresh(force.unwrap_or(false)).await;
            Ok(JsValue::from_str(outcome.as_str()))
        })
    }

    #[wasm_bindgen(js_name = "currentSnapshot")]
    pub fn current_snapshot(&self) -> String {
        self.inner.current_snapshot()
    }

    /// Call from the workbook's structural change handlers.
    pub fn invalidate(&self) {
        self.inner.invalidate();
    }

    #[wasm_bindgen(js_name = "isBuilding")]
    pub fn is_building(&self) -> bool {
        self.inner.is_building()
    }

    /// Register `callback(event)`; returns an id for `unsubscribe`. A callback
    /// that throws is logged and does not stop delivery to the others.
    pub fn subscribe(&self, callback: js_sys::Function) -> f64 {
        let id = self.inner.subscribe(move |event| {
            let delivered = event_to_js(event)
                .and_then(|payload| callback.call1(&JsValue::NULL, &payload));
            if let Err(err) = delivered {
                web_sys::console::warn_2(
                    &JsValue::from_str(&format!("snapshot subscriber for '{}' failed:", event.name())),
                    &err,
                );
            }
        });
        id.as_u64() as f64
    }

    pub fn unsubscribe(&self, id: f64) -> bool {
        self.inner.unsubscribe(SubscriptionId::from(id as u64))
    }
}

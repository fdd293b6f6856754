use wasm_bindgen::prelude::*;

mod cache;
mod host;
mod payload;
mod utils;

pub use cache::*;
pub use host::*;
pub use payload::*;

#[wasm_bindgen(start)]
pub fn init() {
    utils::set_panic_hook();
}

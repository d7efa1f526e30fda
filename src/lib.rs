//! pyfrac - exact rational arithmetic for an interactive shell
//!
//! This crate provides:
//! - Fraction arithmetic on arbitrary-precision integers, always reduced
//! - Positional expansions with repeating digits in bases 2 to 36
//! - Expression compilation (text to bytecode) and a stack evaluator
//! - A C ABI for native hosts and a wasm-bindgen surface for the browser

use wasm_bindgen::prelude::*;

pub mod error;
pub mod integer;
pub mod fraction;
pub mod expansion;
pub mod options;
pub mod bytecode;
pub mod compiler;
pub mod evaluator;
#[macro_use]
mod bridge;
pub mod cabi;

#[cfg(test)]
mod proptests;

// Re-export main types for convenience
pub use bridge::PyfracError;
pub use compiler::{CompiledExpression, ExpressionCompiler};
pub use error::{Error, Result};
pub use evaluator::{Evaluator, Session};
pub use expansion::Expansion;
pub use fraction::Fraction;
pub use options::{DisplayStyle, FormatOptions};

pub(crate) fn to_js_error(e: Error) -> JsValue {
    js_sys::Error::new(&e.to_string()).into()
}

/// Initialize the WASM module
/// Call this once when loading the module to set up panic hooks
#[wasm_bindgen(start)]
pub fn init() {
    // Set up better panic messages
    console_error_panic_hook::set_once();
}

/// Get the version of the pyfrac library
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

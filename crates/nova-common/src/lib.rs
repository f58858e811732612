//! Nova-Common: shared types and helpers for the nova action pipeline.
//!
//! This crate provides functionality used across nova:
//!
//! - **Error Handling**: the unified [`Error`] type and [`Result`] alias
//! - **Typed IDs**: UUID wrappers for operations and suppression tags
//! - **Validation**: condition checks that fail with a specific error kind
//! - **Parsing**: lenient parsers for integers, numbers, booleans, dates and
//!   strings coming from untyped request inputs
//!
//! # Examples
//!
//! ```
//! use nova_common::{validate, parse, Error, Result};
//! use serde_json::{json, Value};
//!
//! fn page_size(raw: &Value) -> Result<i64> {
//!     let size = parse::parse_integer(raw, Some(1), Some(100))?;
//!     validate::inputs(size % 10 == 0, "page size must be a multiple of 10")?;
//!     Ok(size)
//! }
//!
//! assert_eq!(page_size(&json!("20")).unwrap(), 20);
//! assert!(matches!(page_size(&json!(7)), Err(Error::InvalidInputs(_))));
//! ```

pub mod error;
pub mod ids;
pub mod parse;
pub mod validate;

pub use error::{Error, Result};
pub use ids::*;

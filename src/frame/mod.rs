//! Columnar frames and the result decoder
//!
//! - **Column types**: [`Frame`], [`Column`], [`ColumnValues`] and the
//!   notice types for soft diagnostics
//! - **Decoder**: [`decode`] turns the backend's JSON row array into a
//!   typed frame

mod column;
mod decode;
mod error;

pub use column::{
    Column, ColumnKind, ColumnValues, Frame, Notice, NoticeSeverity, TIME_COLUMN,
};
pub use decode::decode;
pub use error::{DecodeError, DecodeResult};

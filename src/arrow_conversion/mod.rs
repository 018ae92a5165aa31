//! Arrow data format conversion utilities.
//!
//! This module converts decoded result pages into Apache Arrow columnar
//! format.

mod builders;
mod converter;

pub use builders::{build_array, ColumnKind};
pub use converter::ArrowConverter;

//! Column extraction, alignment and matrix building.
//!
//! ## Alignment
//!
//! Every extraction call returns [`AlignedColumns`]: parallel arrays of one
//! common length in which position `i` of every array comes from the same
//! source record. In [`ExtractionMode::Filtering`] a record with any invalid
//! requested value is dropped from all arrays at once; in
//! [`ExtractionMode::Strict`] the first invalid cell aborts with its row and
//! column. Binary columns reject anything but 0/1 in both modes.
//!
//! ## Matrices
//!
//! [`MatrixBuilder`] lays aligned columns out as a row-major
//! (sample × feature) or column-major (feature × sample) [`Matrix`]. The
//! orientation is always explicit; the engine boundary checks it against the
//! routine signature.
//!
//! ```text
//! records ──Extractor──▶ AlignedColumns ──MatrixBuilder──▶ Matrix
//!                             │
//!                             └──GroupedValues (split by label)
//! ```

mod extractor;
mod grouping;
mod matrix;

pub use extractor::{
    AlignedColumn, AlignedColumns, ColumnKind, ColumnRequest, ColumnValues, ExtractionMode,
    Extractor,
};
pub use grouping::{levels, GroupedValues};
pub use matrix::{Matrix, MatrixBuilder, Orientation};

//! Transformation module.
//!
//! This module handles the three-file merge and long-to-wide reshape:
//! - Join: left join on the identifier column
//! - Pivot: deduplication, occurrence numbering, wide layout
//! - Reshape: the validated `reshape(base, aux1, aux2, fields)` contract
//! - Pipeline: load, reshape, export with logging

pub mod join;
pub mod pivot;
pub mod reshape;
pub mod pipeline;

pub use reshape::{available_columns, reshape, select_fields, ReshapeOptions, ReshapeOutput, ReshapeReport};
pub use pipeline::*;

//! Microwave link inventory: reads link sheets, turns surveyed DMS positions
//! into decimal degrees and circuit lengths, and exports the result.

#![deny(clippy::all)]
#![forbid(unsafe_code)]

pub mod columns;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod geo;
pub mod map;
pub mod record;
pub mod sql;
pub mod stats;
pub mod table;
pub mod xlsx;
mod zip_util;

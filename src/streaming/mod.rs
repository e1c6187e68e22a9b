//! Stream-type decisions made before any probing happens.
//!
//! `classification` decides playlist vs direct media for a candidate URL.

pub mod classification;

pub use classification::{Classification, SourceType, classify_source};

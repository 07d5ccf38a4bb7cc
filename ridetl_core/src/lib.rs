//! Turns raw GPS ride recordings into segmented, resampled and enriched
//! ride series.

pub mod config;
pub mod cruise;
pub mod enrich;
pub mod excel;
pub mod filter;
pub mod formatting;
pub mod geodesy;
pub mod model;
pub mod partition;
pub mod pipeline;
pub mod read;
pub mod segment;
pub mod series;
pub mod summary;
pub mod training;

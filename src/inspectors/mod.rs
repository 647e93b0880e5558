//! Inspector implementations
//!
//! - `soda_inspector`: feeds every executed instruction and frame boundary
//!   into the monitoring pipeline

pub mod soda_inspector;

pub use soda_inspector::SodaInspector;

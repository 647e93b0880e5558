//! Bundled analyzers

pub mod reentrancy;

pub use reentrancy::{ReentrancyAnalyzer, ReentrancyReport};

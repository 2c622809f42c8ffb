//! # NER Compare
#![forbid(unsafe_code)]

/// Datasets
pub mod datasets;

/// Models and training backends
pub mod models;

/// Entity-level evaluation metrics
pub mod metrics;

/// Model comparison workflow
pub mod comparison;

/// Comparison configuration
pub mod config;

/// Utilities
pub mod utils;

/// CLI indexes and utilities
pub mod cli;

/// Logging macros
#[macro_use]
extern crate log;

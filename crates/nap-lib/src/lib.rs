//! Core library for the network anomaly predictor
//!
//! This crate provides the building blocks of the pipeline:
//! - Monitoring API access (Zabbix-style JSON-RPC)
//! - Telemetry collection with counter-to-rate conversion
//! - Windowed feature extraction (pivot, unit conversion, aggregation)
//! - Labeled dataset loading and stratified index splitting
//! - Convolutional classifier and training harness

pub mod collector;
pub mod dataset;
pub mod features;
pub mod model;
pub mod models;
pub mod storage;
pub mod zabbix;

pub use models::*;

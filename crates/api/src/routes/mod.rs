//! HTTP route handlers

pub mod alerts;
pub mod metrics;
pub mod predictions;
pub mod scenarios;

//! Solva payment webhook ingestion service.
//!
//! Accepts signed deliveries from MultiBaas (on-chain transfers) and thirdweb
//! Pay (on-ramps), gates them on signature and freshness, and records each
//! completed payment between onboarded users exactly once.

pub mod config;
pub mod error;
pub mod memory;
pub mod multibaas;
pub mod pipeline;
pub mod postgres;
pub mod provider;
pub mod routes;
pub mod store;
pub mod telemetry;

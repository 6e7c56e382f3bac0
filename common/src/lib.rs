//! Provider-agnostic core of the Solva payment webhook pipeline.
//!
//! Everything in this crate is pure: no I/O, no clocks, no logging. The
//! service crate feeds it raw bytes, header values and the current time.

pub mod event;
pub mod payment;
pub mod replay;
pub mod signature;

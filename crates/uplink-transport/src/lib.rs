// crates/uplink-transport/src/lib.rs
// ============================================================================
// Module: Uplink Transport
// Description: Upload transports for the ingestion endpoint.
// Purpose: Carry batched telemetry to the backend with strict limits.
// Dependencies: uplink-core, reqwest, serde_json
// ============================================================================

//! ## Overview
//! This crate ships the HTTP implementation of the core upload seam. Requests
//! are bounded: one fixed timeout, redirects disabled, response bodies capped.
//! Authentication failures are kept distinct from transient network errors so
//! the engine can surface a re-enrollment problem instead of retrying it away.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod http;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use http::HttpIngestTransport;
pub use http::HttpTransportConfig;

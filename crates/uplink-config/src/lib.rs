// crates/uplink-config/src/lib.rs
// ============================================================================
// Module: Uplink Config Library
// Description: Canonical configuration model and validation.
// Purpose: Single source of truth for uplink.toml semantics.
// Dependencies: uplink-core, uplink-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `uplink-config` defines the configuration model for the delivery agent.
//! Loading is strict and fail-closed: bounded file size, UTF-8 only, and
//! per-field validation with precise messages. A config that parses but
//! fails validation never reaches the runtime.
//!
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;

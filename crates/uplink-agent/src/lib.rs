// crates/uplink-agent/src/lib.rs
// ============================================================================
// Module: Uplink Agent Library
// Description: Runtime assembly for the uplink delivery agent.
// Purpose: Wire store, transport, and supervision loops from configuration.
// Dependencies: uplink-core, uplink-config, uplink-store-sqlite, uplink-transport
// ============================================================================

//! ## Overview
//! The agent library turns a validated [`uplink_config::UplinkConfig`] into a
//! running delivery engine: a queue store, the HTTP ingest transport, the
//! batch uploader, and the health and permission supervisors, each driven by
//! its own tick worker. The `uplink` binary is a thin CLI over this module;
//! embedding hosts can use [`AgentRuntime`] directly.
//!
//! Security posture: configuration and queue contents are untrusted inputs;
//! every boundary is validated by the crates this library assembles.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod probes;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use probes::StoragePressureProbe;
pub use probes::StoreReadinessProbe;
pub use runtime::AgentError;
pub use runtime::AgentHandles;
pub use runtime::AgentRuntime;
pub use runtime::AgentShutdown;
pub use runtime::open_store;

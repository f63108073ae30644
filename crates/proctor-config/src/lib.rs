// crates/proctor-config/src/lib.rs
// ============================================================================
// Module: Proctor Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for proctor.toml semantics.
// Dependencies: serde, toml
// ============================================================================

//! ## Overview
//! `proctor-config` defines the configuration model for the proctoring
//! backend: HTTP bind settings, record store selection, storage backend
//! selection, and audit logging. Loading fails closed on malformed input.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;

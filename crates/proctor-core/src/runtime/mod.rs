// crates/proctor-core/src/runtime/mod.rs
// ============================================================================
// Module: Proctor Runtime
// Description: In-process record store implementations.
// Purpose: Provide the in-memory store and the shared trait-object wrapper.
// Dependencies: crate::interfaces
// ============================================================================

//! ## Overview
//! Runtime helpers that back [`crate::RecordStore`] without external services.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::InMemoryRecordStore;
pub use store::SharedRecordStore;

//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IAuditStore`] - Read and append access to per-entity audit tables

pub mod audit_store;

pub use audit_store::{EntryQuery, IAuditStore};

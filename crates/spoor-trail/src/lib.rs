//! Spoor Trail - Audit trail services
//!
//! Provides:
//! - `AuditReader`: validated, filterable, paginated queries over the
//!   per-entity audit tables
//! - `AuditRecorder`: records change history (inserts, updates, removals,
//!   association/dissociation) from entity snapshots
//! - `AuditPager`: one page of results plus pagination metadata
//!
//! Both services are constructed from an `AuditConfiguration` and an
//! `IAuditStore` implementation (see `spoor-store` for the SQLite adapter);
//! neither holds storage state between calls.

pub mod pager;
pub mod reader;
pub mod recorder;

pub use pager::AuditPager;
pub use reader::AuditReader;
pub use recorder::{AuditRecorder, ChangeContext};

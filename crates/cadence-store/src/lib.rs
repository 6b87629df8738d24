//! Cadence Store - persistence contracts
//!
//! Trait contracts for the three backing stores the engine consumes:
//! - Sequence store: definitions plus read-time enrollment stats
//! - Lead store: leads joined with their primary contact, stage updates
//! - Enrollment store: atomic conflict-ignoring inserts, due scans
//!
//! `MemoryStore` implements all three over in-process maps and backs the
//! test suites and the demo server. The engine only ever sees the traits;
//! store handles are constructed explicitly and injected, never reached
//! through module globals.

#![warn(unreachable_pub)]

pub mod error;
pub mod memory;
pub mod traits;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use traits::{EnrollmentStore, LeadStore, SequenceStore, SequenceWithStats};

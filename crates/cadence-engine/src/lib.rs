//! Cadence Engine - enrollment and step advancement
//!
//! The workflow core of Cadence:
//! - Enrolls batches of leads into a sequence with conflict-safe,
//!   idempotent semantics and a single shared first-action time
//! - Advances due enrollments through their step lists, honoring the
//!   sending window, weekend skipping, and per-day rate caps
//! - Applies stop conditions (reply/bounce) and manual pause/resume
//!   through a validated status machine
//!
//! # Example
//!
//! ```rust,ignore
//! use cadence_engine::{EnrollRequest, EnrollmentEngine};
//!
//! # async fn example(engine: EnrollmentEngine) -> Result<(), Box<dyn std::error::Error>> {
//! let report = engine
//!     .enroll(&EnrollRequest::new(sequence_id, vec![lead_a, lead_b]))
//!     .await?;
//! println!("enrolled {} leads", report.enrolled);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod advancer;
pub mod engine;
pub mod error;
pub mod transitions;

pub use advancer::{AdvanceReport, ChannelError, ChannelExecutor, StepAdvancer};
pub use engine::{EnrollRequest, EnrollmentEngine, EnrollmentReport};
pub use error::EngineError;
pub use transitions::{allowed_transitions, validate_transition, TransitionError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

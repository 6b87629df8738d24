//! Cadence Model - domain types for outreach automation
//!
//! Defines the vocabulary shared by every Cadence crate:
//! - Sequences: reusable cadence definitions (ordered steps + settings)
//! - Leads and contacts, with a typed enrichment cache
//! - Enrollments: the join of one lead to one sequence
//! - Validation that turns raw ingestion records into populated leads
//!
//! All records are immutable value types; lifecycle and persistence live
//! in `cadence-store` and `cadence-engine`.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod enrichment;
pub mod enrollment;
pub mod error;
pub mod ids;
pub mod lead;
pub mod sequence;

pub use enrichment::{EnrichmentCache, EnrichmentEntry, EnrichmentKey};
pub use enrollment::{Enrollment, EnrollmentStats, EnrollmentStatus};
pub use error::{LeadValidationError, SequenceValidationError};
pub use ids::{ContactId, EnrollmentId, LeadId, SequenceId, StepId};
pub use lead::{Contact, Lead, LeadDraft, LeadWithContact, PipelineStage};
pub use sequence::{Sequence, SequenceDraft, SequenceSettings, Step, StepChannel};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the Cadence model
    pub use crate::{
        Contact, Enrollment, EnrollmentStatus, Lead, LeadId, LeadWithContact, PipelineStage,
        Sequence, SequenceId, SequenceSettings, Step, StepChannel,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

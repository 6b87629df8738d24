//! Outreach sequences
//!
//! A sequence is a reusable cadence definition: an ordered list of steps
//! (channel + business-day delay from enrollment start) plus the global
//! settings that govern scheduling. Sequences are immutable once created;
//! validation happens at the only point one can be born.

use crate::error::SequenceValidationError;
use crate::ids::{SequenceId, StepId};
use cadence_calendar::SendingWindow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outreach channel for a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepChannel {
    /// Cold or follow-up email
    Email,
    /// LinkedIn connection request
    LinkedinConnect,
    /// LinkedIn direct message
    LinkedinMessage,
    /// Phone call
    Call,
}

/// One action in a sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Step identifier
    pub id: StepId,
    /// Outreach channel
    pub channel: StepChannel,
    /// Offset from enrollment start, in business days
    pub delay_days: u32,
}

impl Step {
    /// Create new step
    #[inline]
    #[must_use]
    pub fn new(channel: StepChannel, delay_days: u32) -> Self {
        Self {
            id: StepId::new(),
            channel,
            delay_days,
        }
    }
}

/// Cadence settings applied to every enrollment of a sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceSettings {
    /// Daily local-time range during which actions may execute
    pub sending_window: SendingWindow,
    /// Skip Saturday/Sunday when scheduling the next action
    pub skip_weekends: bool,
    /// Maximum actions per sequence per local day
    pub max_per_day: u32,
    /// Pause an enrollment when its lead replies
    pub stop_on_reply: bool,
    /// Pause an enrollment when its contact address bounces
    pub stop_on_bounce: bool,
}

impl SequenceSettings {
    /// Check the settings invariants.
    pub fn validate(&self) -> Result<(), SequenceValidationError> {
        self.sending_window.validate()?;
        if self.max_per_day == 0 {
            return Err(SequenceValidationError::ZeroDailyCap);
        }
        Ok(())
    }
}

impl Default for SequenceSettings {
    fn default() -> Self {
        Self {
            sending_window: SendingWindow::default(),
            skip_weekends: true,
            max_per_day: 50,
            stop_on_reply: true,
            stop_on_bounce: false,
        }
    }
}

/// A reusable outreach cadence definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    /// Sequence identifier
    pub id: SequenceId,
    /// Display name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Optional targeting tag
    pub sector: Option<String>,
    /// Ordered steps; delays are non-decreasing
    pub steps: Vec<Step>,
    /// Cadence settings
    pub settings: SequenceSettings,
    /// Whether the sequence is live
    pub is_active: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Sequence {
    /// The standard five-touch cadence used when a draft omits steps.
    #[must_use]
    pub fn default_steps() -> Vec<Step> {
        vec![
            Step::new(StepChannel::Email, 0),
            Step::new(StepChannel::LinkedinConnect, 3),
            Step::new(StepChannel::Email, 4),
            Step::new(StepChannel::LinkedinMessage, 5),
            Step::new(StepChannel::Email, 6),
        ]
    }

    /// Business-day gap between a step and its successor.
    ///
    /// Returns `None` past the last step. The creation-time monotonicity
    /// check guarantees the subtraction cannot underflow.
    #[must_use]
    pub fn delay_to_next(&self, step_index: usize) -> Option<u32> {
        let current = self.steps.get(step_index)?;
        let next = self.steps.get(step_index + 1)?;
        Some(next.delay_days - current.delay_days)
    }
}

/// Caller-supplied sequence fields; missing steps/settings take defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SequenceDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sector: Option<String>,
    /// Omitted: the standard five-touch cadence
    #[serde(default)]
    pub steps: Option<Vec<Step>>,
    /// Omitted: default settings
    #[serde(default)]
    pub settings: Option<SequenceSettings>,
}

impl SequenceDraft {
    /// Create a draft with just a name
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// With description
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// With sector tag
    #[inline]
    #[must_use]
    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }

    /// With explicit steps
    #[inline]
    #[must_use]
    pub fn with_steps(mut self, steps: Vec<Step>) -> Self {
        self.steps = Some(steps);
        self
    }

    /// With explicit settings
    #[inline]
    #[must_use]
    pub fn with_settings(mut self, settings: SequenceSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Validate the draft and build a sequence created at `now`.
    pub fn build_at(self, now: DateTime<Utc>) -> Result<Sequence, SequenceValidationError> {
        if self.name.trim().is_empty() {
            return Err(SequenceValidationError::EmptyName);
        }

        let steps = self.steps.unwrap_or_else(Sequence::default_steps);
        if steps.is_empty() {
            return Err(SequenceValidationError::EmptySteps);
        }
        for (index, pair) in steps.windows(2).enumerate() {
            if pair[1].delay_days < pair[0].delay_days {
                return Err(SequenceValidationError::NonMonotonicDelays {
                    index: index + 1,
                    delay_days: pair[1].delay_days,
                    prev_index: index,
                    prev_delay_days: pair[0].delay_days,
                });
            }
        }

        let settings = self.settings.unwrap_or_default();
        settings.validate()?;

        Ok(Sequence {
            id: SequenceId::new(),
            name: self.name,
            description: self.description,
            sector: self.sector,
            steps,
            settings,
            is_active: true,
            created_at: now,
        })
    }

    /// Validate the draft and build a sequence created now.
    pub fn build(self) -> Result<Sequence, SequenceValidationError> {
        self.build_at(Utc::now())
    }
}

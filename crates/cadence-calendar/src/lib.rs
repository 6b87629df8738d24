//! Cadence Calendar - temporal arithmetic for outreach scheduling
//!
//! Pure functions, no state:
//! - Business-day offsets (weekends skipped while counting)
//! - Calendar-day offsets for sequences that send on weekends
//! - Sending-window clamping in fixed-offset local time
//!
//! # Example
//!
//! ```rust
//! use cadence_calendar::{add_business_days, SendingWindow};
//! use chrono::{TimeZone, Utc};
//!
//! // A Friday afternoon; one business day later is Monday.
//! let friday = Utc.with_ymd_and_hms(2025, 6, 6, 15, 30, 0).unwrap();
//! let monday = add_business_days(friday, 1);
//! assert_eq!(monday.date_naive().to_string(), "2025-06-09");
//!
//! let window = SendingWindow::default();
//! let first_send = window.clamp_to_start(monday);
//! ```

#![warn(unreachable_pub)]

pub mod business_days;
pub mod window;

pub use business_days::{add_business_days, add_calendar_days, is_business_day};
pub use window::{SendingWindow, WindowError};

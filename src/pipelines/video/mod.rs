// SPDX-License-Identifier: GPL-3.0-only

//! Video recording pipeline
//!
//! - Picks the richest container the device can produce
//! - Collects encoded chunks until a manual stop, the deadline or the end of
//!   the source, whichever comes first
//! - Concatenates the chunks into one artifact

pub mod format_selection;
pub mod recorder;

pub use format_selection::{FormatChoice, select_recording_format};
pub use recorder::{RecordingOutcome, StopReason, finalize, record};

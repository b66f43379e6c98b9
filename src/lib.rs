// SPDX-License-Identifier: GPL-3.0-only

//! detect-camera: capture or pick media, submit it to a detection service and
//! show the annotated result
//!
//! # Architecture
//!
//! - [`backends`]: camera abstraction plus the virtual and V4L2 backends
//! - [`media`]: media artifacts, their sources and preview handles
//! - [`pipelines`]: still encoding and video recording
//! - [`app`]: camera session, staging slot, result presenter and the page model
//! - [`submission`]: upload transport and the submission state machine
//! - [`config`]: user configuration handling
//! - [`storage`]: saving annotated results
//!
//! ```text
//! MediaSource ──▶ CaptureStaging ──▶ SubmissionPipeline ──▶ ResultPresenter
//!  (file/camera)   (one artifact)      (upload, progress)     (view)
//! ```

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod media;
pub mod pipelines;
pub mod storage;
pub mod submission;

// Re-export commonly used types
pub use app::{AppModel, Message, ResultView, SubmissionState};
pub use config::Config;
pub use errors::{AppError, AppResult};
pub use media::{MediaArtifact, MediaKind, MediaSource};

// SPDX-License-Identifier: GPL-3.0-only

//! Turning live camera output into media artifacts
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │ Camera Frame │ ──▶ │  Photo Pipeline   │ ──▶ │ JPEG/PNG     │
//! │   (RGBA)     │     │  - raster resize  │     │ artifact     │
//! │              │     │  - encoding       │     │              │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//!
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │ Chunk stream │ ──▶ │  Video Pipeline   │ ──▶ │ mp4/webm/... │
//! │ (backend)    │     │  - format choice  │     │ artifact     │
//! │              │     │  - deadline stop  │     │              │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//! ```
//!
//! - [`photo`]: still encoding on the blocking pool
//! - [`video`]: recording format selection and the chunk recorder

pub mod photo;
pub mod video;

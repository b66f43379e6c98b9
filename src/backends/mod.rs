// SPDX-License-Identifier: GPL-3.0-only

//! Device access layer
//!
//! - [`camera`]: the backend trait, shared types and the V4L2 webcam backend
//! - [`virtual_camera`]: a file-backed camera used for demos and tests

pub mod camera;
pub mod virtual_camera;

// SPDX-License-Identifier: GPL-3.0-only

//! Still capture encoding
//!
//! ```text
//! current frame → offscreen raster (native or fallback size) → JPEG/PNG
//! ```

pub mod encoding;

pub use encoding::StillEncoder;

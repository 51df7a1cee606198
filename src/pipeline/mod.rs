//! Pipeline stages for PDF-to-image conversion.
//!
//! Each submodule implements exactly one step and knows nothing about
//! threads; the [`crate::pool`] module decides where the steps run.
//!
//! ## Data Flow
//!
//! ```text
//! pages ──▶ partition ──▶ render ──▶ encode
//! (resolve)  (chunks)     (engine)   (png/jpeg)
//! ```
//!
//! 1. [`pages`]     : canonicalise the requested page list
//! 2. [`partition`] : pick the worker count and split pages round-robin
//! 3. [`render`]    : rasterise one page, encode it, write it to disk
//! 4. [`encode`]    : PNG/JPEG encoding of raw pixels
//! 5. [`sequential`] : the in-process, pausable loop used without workers

pub mod encode;
pub mod pages;
pub mod partition;
pub mod render;
pub mod sequential;

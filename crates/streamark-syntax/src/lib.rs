//! Syntax highlighting backends for streamark.
//!
//! Backends implement [`streamark_core::text::CodeHighlighter`] and advertise the languages they
//! have loaded, which lets the Markdown renderer substitute its fallback language for anything
//! unknown.
//!
//! - `syntect` (feature: `syntect`)
//!
//! The facade crate `streamark` re-exports this crate behind the same feature, so most apps can
//! just enable `streamark/syntect`.
#[cfg(feature = "syntect")]
pub mod syntect;

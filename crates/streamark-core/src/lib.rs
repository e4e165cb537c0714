//! `streamark-core` provides the small, reusable building blocks shared by the streamark crates.
//!
//! Heavier functionality (Markdown segmentation and rendering, syntax highlighting backends)
//! lives in separate crates.
//!
//! ## Design goals
//!
//! - Event-loop agnostic: the host drives updates and scrolling.
//! - No async runtime: everything runs on the host's thread. Deferred work is expressed as
//!   one-shot callbacks fired from host calls (see [`observer::ScrollObserver`]).
//!
//! Useful entry points:
//! - [`text::CodeHighlighter`]: the highlighter contract, including the loaded-language set.
//! - [`viewport::Region`] and [`viewport::intersects_padded`]: visibility geometry.
//! - [`observer::ViewportObserver`]: one-shot "region became visible" subscriptions.
pub mod observer;
pub mod text;
pub mod theme;
pub mod viewport;

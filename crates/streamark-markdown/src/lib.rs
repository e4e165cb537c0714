//! Incremental Markdown rendering for streaming sources.
//!
//! The source of a chat answer or a log grows a few tokens at a time and is re-rendered after
//! every update. This crate keeps that cheap:
//!
//! - [`segment`] splits the source into blocks; finished ("closed") blocks never change again.
//! - [`cache`] remembers the rendered output of closed blocks by content [`hash`].
//! - [`stabilize`] trims the unstable tail of a still-streaming code block (a half-typed
//!   closing fence) before it reaches the highlighter.
//! - [`gate`] defers highlighting of code blocks until they come near the viewport.
//!
//! [`session::MarkdownSession`] ties these together; [`layout::layout_pass`] turns its output
//! into ratatui [`Text`](ratatui::text::Text).
//!
//! ## Embedded blocks
//!
//! Code blocks tagged `component-json` or `echarts` are rewritten by the [`transform`] chain
//! into component and chart nodes and rendered through the renderers in
//! [`context::RenderContext`].
pub mod cache;
pub mod context;
pub mod document;
pub mod error;
pub mod gate;
pub mod hash;
pub mod layout;
pub mod registry;
pub mod segment;
pub mod session;
pub mod stabilize;
pub mod transform;

pub use context::MarkdownOptions;
pub use context::RenderContext;
pub use error::RenderError;
pub use error::TransformError;
pub use session::MarkdownSession;
pub use session::RenderPass;

//! `streamark` renders Markdown that arrives a few tokens at a time.
//!
//! This is the facade crate. The building blocks live in:
//! - `streamark-core`: theme, viewport geometry, the highlighter contract and viewport observers.
//! - `streamark-markdown` (feature: `markdown`): segmentation, caching, transforms and layout.
//! - `streamark-syntax` (feature: `syntect`): the syntect highlighting backend.
//!
//! Most apps only need [`view::StreamingMarkdownView`]:
//!
//! ```ignore
//! let ctx = RenderContext::default().with_highlighter(Arc::new(SyntectHighlighter::new()));
//! let mut view = StreamingMarkdownView::new(Arc::new(ctx));
//! view.push_str(chunk);
//! view.render(area, frame.buffer_mut());
//! ```
pub use streamark_core::observer;
pub use streamark_core::text;
pub use streamark_core::theme;
pub use streamark_core::viewport;

pub mod render;

#[cfg(feature = "markdown")]
pub use streamark_markdown as markdown;
#[cfg(feature = "markdown")]
pub mod view;

#[cfg(feature = "syntect")]
pub use streamark_syntax as syntax;

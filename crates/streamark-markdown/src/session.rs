//! Incremental rendering of a growing Markdown source.
//!
//! A [`MarkdownSession`] is fed the full source on every update. Closed segments that were
//! rendered before are reused from the [`SegmentCache`]; everything else is parsed and run
//! through the [`TransformChain`]. Code blocks are then materialized through their
//! [`VisibilityGate`]s: blocks that have not been near the viewport yet stay plain text.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use streamark_markdown::context::RenderContext;
//! # use streamark_markdown::session::MarkdownSession;
//! let mut session = MarkdownSession::new(Arc::new(RenderContext::default()), None);
//! let mut source = String::new();
//! for token in ["# Title\n", "\nSome ", "text.\n"] {
//!     source.push_str(token);
//!     let pass = session.render_incremental(&source);
//!     println!("{} segments", pass.segments.len());
//! }
//! ```

use crate::cache::CacheStats;
use crate::cache::SegmentCache;
use crate::context::RenderContext;
use crate::document::ChartState;
use crate::document::ComponentState;
use crate::document::Document;
use crate::document::Node;
use crate::error::RenderError;
use crate::error::TransformError;
use crate::gate::GateKey;
use crate::gate::GateRegistry;
use crate::gate::GateState;
use crate::gate::VisibilityGate;
use crate::hash::SegmentHash;
use crate::segment::SegmentKind;
use crate::segment::segment;
use crate::stabilize::HighlightLanguage;
use crate::stabilize::stabilize_code;
use crate::transform::DocumentTransform;
use crate::transform::TransformChain;
use ratatui::text::Span;
use ratatui::text::Text;
use std::collections::HashMap;
use std::collections::HashSet;
use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;
use std::rc::Rc;
use std::sync::Arc;
use streamark_core::observer::ViewportObserver;
use streamark_core::viewport::Region;

pub type HighlightedLines = Arc<Vec<Vec<Span<'static>>>>;

#[derive(Clone, Debug, PartialEq)]
pub enum CodeBody {
    /// Nothing is safe to show yet.
    Empty,
    /// The stabilized text, unhighlighted, until the block is near the viewport.
    Plain,
    Highlighted(HighlightedLines),
}

#[derive(Clone, Debug, PartialEq)]
pub struct CodeBlockView {
    pub key: GateKey,
    /// The language as declared in the source.
    pub language: Option<String>,
    /// The language handed to the highlighter.
    pub highlight_language: String,
    pub stabilized_text: String,
    pub visible: bool,
    pub body: CodeBody,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SegmentView {
    pub document: Arc<Document>,
    /// In the document's code block order.
    pub code_blocks: Vec<CodeBlockView>,
    /// Rendered component and chart blocks, in the document's embed order.
    pub embeds: Vec<Text<'static>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderedSegment {
    pub index: usize,
    pub hash: SegmentHash,
    pub closed: bool,
    pub kind: SegmentKind,
    pub from_cache: bool,
    pub view: Result<SegmentView, RenderError>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderPass {
    pub segments: Vec<RenderedSegment>,
    pub stats: CacheStats,
    /// `true` when this pass started by dropping the cache because the source was replaced.
    pub reset: bool,
}

impl RenderPass {
    pub fn code_blocks(&self) -> impl Iterator<Item = &CodeBlockView> {
        self.segments
            .iter()
            .filter_map(|s| s.view.as_ref().ok())
            .flat_map(|v| v.code_blocks.iter())
    }
}

struct Parsed {
    index: usize,
    hash: SegmentHash,
    closed: bool,
    kind: SegmentKind,
    from_cache: bool,
    document: Result<Arc<Document>, TransformError>,
}

pub struct MarkdownSession {
    context: Arc<RenderContext>,
    chain: TransformChain,
    cache: SegmentCache<Arc<Document>>,
    gates: GateRegistry,
    highlights: HashMap<u64, HighlightedLines>,
    parsed: Vec<Parsed>,
    reset: bool,
}

impl MarkdownSession {
    /// `observer` is the host's viewport; `None` renders every block highlighted right away.
    pub fn new(context: Arc<RenderContext>, observer: Option<Rc<dyn ViewportObserver>>) -> Self {
        let chain = TransformChain::new(context.options.parse_options());
        let gates = GateRegistry::new(observer, context.options.observe);
        Self {
            context,
            chain,
            cache: SegmentCache::new(),
            gates,
            highlights: HashMap::new(),
            parsed: Vec::new(),
            reset: false,
        }
    }

    pub fn with_transform(mut self, transform: impl DocumentTransform + 'static) -> Self {
        self.chain.push(Arc::new(transform));
        self
    }

    pub fn context(&self) -> &Arc<RenderContext> {
        &self.context
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn cached_segments(&self) -> usize {
        self.cache.len()
    }

    pub fn gate_state(&self, key: GateKey) -> Option<GateState> {
        self.gates.get(key).map(VisibilityGate::state)
    }

    /// Renders the full current `source`, reusing whatever earlier passes left in the cache.
    pub fn render_incremental(&mut self, source: &str) -> RenderPass {
        let reset = self.cache.reset_if_not_extension(source);
        if reset {
            self.gates.clear();
            self.highlights.clear();
        }
        self.reset = reset;

        let mut parsed = Vec::new();
        for (index, seg) in segment(source).into_iter().enumerate() {
            let cached = self.cache.lookup(&seg).cloned();
            let from_cache = cached.is_some();
            let document = match cached {
                Some(doc) => Ok(doc),
                None => match self.chain.run(&seg.content) {
                    Ok(doc) => {
                        let doc = Arc::new(doc);
                        if self.cache.store(&seg, doc.clone()) {
                            tracing::debug!(index, hash = %seg.hash, "cached closed segment");
                        }
                        Ok(doc)
                    }
                    Err(err) => Err(err),
                },
            };
            parsed.push(Parsed {
                index,
                hash: seg.hash,
                closed: seg.closed,
                kind: seg.kind,
                from_cache,
                document,
            });
        }
        self.parsed = parsed;

        let live: HashSet<GateKey> = self
            .parsed
            .iter()
            .filter_map(|p| p.document.as_ref().ok().map(|doc| (p.index, doc)))
            .flat_map(|(index, doc)| {
                doc.code_blocks().into_iter().map(move |c| GateKey {
                    segment: index,
                    ordinal: c.ordinal,
                })
            })
            .collect();
        self.gates.retain(|key| live.contains(key));

        self.materialize()
    }

    /// Re-materializes the last pass without re-parsing, e.g. after gates opened.
    pub fn refresh(&mut self) -> RenderPass {
        self.materialize()
    }

    /// Feeds laid-out code block positions to their gates.
    ///
    /// Returns `true` when at least one gate opened, meaning [`Self::refresh`] will produce
    /// highlighted output that the previous pass lacked.
    pub fn attach_regions(&mut self, regions: &[(GateKey, Region)]) -> bool {
        let mut opened = false;
        for (key, region) in regions {
            let was_visible = self.gates.gate(*key).is_visible();
            if !was_visible && self.gates.attach(*key, *region) == GateState::Visible {
                tracing::debug!(?key, "code block gate opened on attach");
                opened = true;
            }
        }
        opened
    }

    /// `true` when any gate opened since the given pass was produced, e.g. by scrolling.
    pub fn needs_refresh(&self, pass: &RenderPass) -> bool {
        pass.code_blocks()
            .any(|c| !c.visible && self.gates.get(c.key).is_some_and(VisibilityGate::is_visible))
    }

    /// Drops all cached output, gates and highlights.
    pub fn reset(&mut self) {
        self.cache.clear();
        self.gates.clear();
        self.highlights.clear();
        self.parsed.clear();
    }

    fn materialize(&mut self) -> RenderPass {
        let mut used = HashSet::new();
        let mut segments = Vec::with_capacity(self.parsed.len());
        for p in &self.parsed {
            let view = match &p.document {
                Ok(doc) => segment_view(
                    &self.context,
                    &mut self.gates,
                    &mut self.highlights,
                    &mut used,
                    p.index,
                    doc,
                ),
                Err(err) => Err(RenderError::from(err.clone())),
            };
            segments.push(RenderedSegment {
                index: p.index,
                hash: p.hash,
                closed: p.closed,
                kind: p.kind,
                from_cache: p.from_cache,
                view,
            });
        }
        self.highlights.retain(|key, _| used.contains(key));

        RenderPass {
            segments,
            stats: self.cache.stats(),
            reset: self.reset,
        }
    }
}

fn segment_view(
    ctx: &RenderContext,
    gates: &mut GateRegistry,
    highlights: &mut HashMap<u64, HighlightedLines>,
    used: &mut HashSet<u64>,
    index: usize,
    doc: &Arc<Document>,
) -> Result<SegmentView, RenderError> {
    let code_blocks = doc
        .code_blocks()
        .into_iter()
        .map(|code| {
            let key = GateKey {
                segment: index,
                ordinal: code.ordinal,
            };
            let lang = HighlightLanguage::resolve(
                code.language.as_deref(),
                ctx.highlighter.as_ref(),
                &ctx.options.fallback_language,
            );
            let stabilized = stabilize_code(&code.text, code.language.as_deref());
            let visible = gates.gate(key).is_visible();
            let body = if stabilized.is_empty() {
                CodeBody::Empty
            } else if !visible {
                CodeBody::Plain
            } else {
                let hkey = highlight_cache_key(&lang.highlight, stabilized);
                used.insert(hkey);
                let lines = highlights
                    .entry(hkey)
                    .or_insert_with(|| {
                        Arc::new(
                            ctx.highlighter
                                .highlight_text(Some(&lang.highlight), stabilized),
                        )
                    })
                    .clone();
                CodeBody::Highlighted(lines)
            };
            CodeBlockView {
                key,
                language: lang.declared,
                highlight_language: lang.highlight,
                stabilized_text: stabilized.to_string(),
                visible,
                body,
            }
        })
        .collect();

    let mut embeds = Vec::new();
    let mut failure = None;
    doc.visit(&mut |node| {
        if failure.is_some() {
            return;
        }
        let rendered = match node {
            Node::Component { state, .. } => match state {
                ComponentState::Ready { kind, props } => {
                    ctx.components.component(kind, props, &ctx.theme)
                }
                ComponentState::Placeholder { key } => {
                    Ok(ctx.components.placeholder(key, &ctx.theme))
                }
            },
            Node::Chart { state, .. } => match state {
                ChartState::Ready { option } => match &ctx.chart_renderer {
                    Some(r) => Ok(r.render(option, &ctx.theme)),
                    None => Err(RenderError::MissingChartRenderer),
                },
                ChartState::Placeholder => Ok(ctx.chart_placeholder_text()),
            },
            _ => return,
        };
        match rendered {
            Ok(text) => embeds.push(text),
            Err(err) => failure = Some(err),
        }
    });
    if let Some(err) = failure {
        tracing::error!(segment = index, %err, "failed to render embedded block");
        return Err(err);
    }

    Ok(SegmentView {
        document: doc.clone(),
        code_blocks,
        embeds,
    })
}

fn highlight_cache_key(language: &str, text: &str) -> u64 {
    let mut h = DefaultHasher::new();
    language.hash(&mut h);
    text.hash(&mut h);
    h.finish()
}

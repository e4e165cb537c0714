//! Parse-then-rewrite pipeline applied to each segment.
//!
//! The built-in rewrites turn `component-json` and `echarts` code blocks into embed nodes.
//! Callers can append their own [`DocumentTransform`]s; they run after the built-ins, in
//! registration order.

use crate::document::ChartState;
use crate::document::CodeNode;
use crate::document::ComponentState;
use crate::document::DEFAULT_COMPONENT_PLACEHOLDER;
use crate::document::Document;
use crate::document::Node;
use crate::document::ParseOptions;
use crate::error::TransformError;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

pub const COMPONENT_LANGUAGE: &str = "component-json";
pub const CHART_LANGUAGE: &str = "echarts";

pub trait DocumentTransform: Send + Sync {
    /// Used in error messages and logs.
    fn name(&self) -> &str;

    fn transform(&self, document: &mut Document) -> Result<(), TransformError>;
}

impl<F> DocumentTransform for (&'static str, F)
where
    F: Fn(&mut Document) -> Result<(), TransformError> + Send + Sync,
{
    fn name(&self) -> &str {
        self.0
    }

    fn transform(&self, document: &mut Document) -> Result<(), TransformError> {
        (self.1)(document)
    }
}

#[derive(Debug, Default, Deserialize)]
struct EmbedMeta {
    placeholder: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ComponentData {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    props: Value,
}

/// `None` when meta is present but not valid JSON metadata.
fn embed_meta(code: &CodeNode) -> Option<EmbedMeta> {
    match code.meta.as_deref() {
        None => Some(EmbedMeta::default()),
        Some(raw) => serde_json::from_str(raw).ok(),
    }
}

fn placeholder_key(meta: Option<EmbedMeta>) -> String {
    meta.and_then(|m| m.placeholder)
        .unwrap_or_else(|| DEFAULT_COMPONENT_PLACEHOLDER.to_string())
}

fn is_code_in(node: &Node, language: &str) -> bool {
    matches!(node, Node::Code(code) if code.language.as_deref() == Some(language))
}

pub struct ComponentBlocks;

impl DocumentTransform for ComponentBlocks {
    fn name(&self) -> &str {
        "component-blocks"
    }

    fn transform(&self, document: &mut Document) -> Result<(), TransformError> {
        document.visit_mut(&mut |node| {
            if !is_code_in(node, COMPONENT_LANGUAGE) {
                return;
            }
            let Node::Code(code) = node else { return };
            let meta = embed_meta(code);
            let state = match (&meta, serde_json::from_str::<ComponentData>(&code.text)) {
                (Some(_), Ok(data)) => ComponentState::Ready {
                    kind: data.kind,
                    props: data.props,
                },
                _ => ComponentState::Placeholder {
                    key: placeholder_key(meta),
                },
            };
            *node = Node::Component { ordinal: 0, state };
        });
        Ok(())
    }
}

pub struct ChartBlocks;

impl DocumentTransform for ChartBlocks {
    fn name(&self) -> &str {
        "chart-blocks"
    }

    fn transform(&self, document: &mut Document) -> Result<(), TransformError> {
        document.visit_mut(&mut |node| {
            if !is_code_in(node, CHART_LANGUAGE) {
                return;
            }
            let Node::Code(code) = node else { return };
            let meta = embed_meta(code);
            let state = match (&meta, serde_json::from_str::<Value>(&code.text)) {
                (Some(_), Ok(option @ Value::Object(_))) => ChartState::Ready { option },
                _ => ChartState::Placeholder,
            };
            *node = Node::Chart { ordinal: 0, state };
        });
        Ok(())
    }
}

#[derive(Clone)]
pub struct TransformChain {
    parse: ParseOptions,
    transforms: Vec<Arc<dyn DocumentTransform>>,
}

impl Default for TransformChain {
    fn default() -> Self {
        Self::new(ParseOptions::default())
    }
}

impl TransformChain {
    pub fn new(parse: ParseOptions) -> Self {
        Self {
            parse,
            transforms: vec![Arc::new(ComponentBlocks), Arc::new(ChartBlocks)],
        }
    }

    pub fn with(mut self, transform: impl DocumentTransform + 'static) -> Self {
        self.push(Arc::new(transform));
        self
    }

    pub fn push(&mut self, transform: Arc<dyn DocumentTransform>) {
        self.transforms.push(transform);
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Parses `source` and runs every transform over the result.
    ///
    /// Code block and embed ordinals are reassigned afterwards, so transforms may freely insert
    /// or remove nodes.
    pub fn run(&self, source: &str) -> Result<Document, TransformError> {
        let mut document = Document::parse(source, self.parse);
        for t in &self.transforms {
            t.transform(&mut document).inspect_err(|err| {
                tracing::error!(transform = t.name(), %err, "markdown transform failed");
            })?;
        }
        document.assign_ordinals();
        Ok(document)
    }
}

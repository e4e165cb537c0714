use crate::document::ParseOptions;
use crate::registry::ChartRenderer;
use crate::registry::CodeBlockRenderer;
use crate::registry::ComponentRegistry;
use crate::registry::default_placeholder;
use ratatui::text::Text;
use std::sync::Arc;
use streamark_core::observer::ObserveOptions;
use streamark_core::text::CodeHighlighter;
use streamark_core::text::NoHighlight;
use streamark_core::theme::Theme;

#[derive(Clone, Debug, PartialEq)]
pub struct MarkdownOptions {
    /// Highlighting language for blocks whose declared language the highlighter lacks.
    pub fallback_language: String,
    pub observe: ObserveOptions,
    pub math: bool,
    pub footnotes: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            fallback_language: "js".to_string(),
            observe: ObserveOptions::default(),
            math: true,
            footnotes: true,
        }
    }
}

impl MarkdownOptions {
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            math: self.math,
            footnotes: self.footnotes,
        }
    }
}

/// Everything a render pass needs besides the source, shared read-only by every block.
#[derive(Clone)]
pub struct RenderContext {
    pub theme: Theme,
    pub options: MarkdownOptions,
    pub highlighter: Arc<dyn CodeHighlighter + Send + Sync>,
    pub components: ComponentRegistry,
    pub chart_renderer: Option<Arc<dyn ChartRenderer>>,
    pub chart_placeholder: Option<Arc<dyn ChartRenderer>>,
    pub code_block_renderer: Option<Arc<dyn CodeBlockRenderer>>,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new(Theme::default())
    }
}

impl RenderContext {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            options: MarkdownOptions::default(),
            highlighter: Arc::new(NoHighlight),
            components: ComponentRegistry::new(),
            chart_renderer: None,
            chart_placeholder: None,
            code_block_renderer: None,
        }
    }

    pub fn with_options(mut self, options: MarkdownOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_highlighter(mut self, highlighter: Arc<dyn CodeHighlighter + Send + Sync>) -> Self {
        self.highlighter = highlighter;
        self
    }

    pub fn with_components(mut self, components: ComponentRegistry) -> Self {
        self.components = components;
        self
    }

    pub fn with_chart_renderer(mut self, renderer: impl ChartRenderer + 'static) -> Self {
        self.chart_renderer = Some(Arc::new(renderer));
        self
    }

    pub fn with_chart_placeholder(mut self, renderer: impl ChartRenderer + 'static) -> Self {
        self.chart_placeholder = Some(Arc::new(renderer));
        self
    }

    pub fn with_code_block_renderer(mut self, renderer: impl CodeBlockRenderer + 'static) -> Self {
        self.code_block_renderer = Some(Arc::new(renderer));
        self
    }

    pub fn chart_placeholder_text(&self) -> Text<'static> {
        match &self.chart_placeholder {
            Some(r) => r.render(&serde_json::Value::Null, &self.theme),
            None => default_placeholder(&self.theme),
        }
    }
}

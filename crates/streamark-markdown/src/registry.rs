//! Caller-supplied renderers for embedded blocks.

use crate::error::RenderError;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::text::Text;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use streamark_core::theme::Theme;

pub trait ComponentRenderer: Send + Sync {
    fn render(&self, props: &Value, theme: &Theme) -> Text<'static>;
}

impl<F> ComponentRenderer for F
where
    F: Fn(&Value, &Theme) -> Text<'static> + Send + Sync,
{
    fn render(&self, props: &Value, theme: &Theme) -> Text<'static> {
        self(props, theme)
    }
}

pub trait ChartRenderer: Send + Sync {
    fn render(&self, option: &Value, theme: &Theme) -> Text<'static>;
}

impl<F> ChartRenderer for F
where
    F: Fn(&Value, &Theme) -> Text<'static> + Send + Sync,
{
    fn render(&self, option: &Value, theme: &Theme) -> Text<'static> {
        self(option, theme)
    }
}

/// Wraps the body of every ordinary code block, e.g. to add a title bar or a copy hint.
pub trait CodeBlockRenderer: Send + Sync {
    fn render(&self, language: Option<&str>, body: Text<'static>, theme: &Theme) -> Text<'static>;
}

impl<F> CodeBlockRenderer for F
where
    F: Fn(Option<&str>, Text<'static>, &Theme) -> Text<'static> + Send + Sync,
{
    fn render(&self, language: Option<&str>, body: Text<'static>, theme: &Theme) -> Text<'static> {
        self(language, body, theme)
    }
}

/// Built-in stand-in for embeds that are not ready to render.
pub fn default_placeholder(theme: &Theme) -> Text<'static> {
    Text::from(Line::from(Span::styled("⋯", theme.placeholder)))
}

/// Renderers looked up by key: component types and placeholder names share one namespace.
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    renderers: BTreeMap<String, Arc<dyn ComponentRenderer>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(
        mut self,
        key: impl Into<String>,
        renderer: impl ComponentRenderer + 'static,
    ) -> Self {
        self.insert(key, renderer);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, renderer: impl ComponentRenderer + 'static) {
        self.renderers.insert(key.into(), Arc::new(renderer));
    }

    pub fn keys(&self) -> Vec<String> {
        self.renderers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }

    /// Renders the placeholder registered under `key`, or the built-in one.
    pub fn placeholder(&self, key: &str, theme: &Theme) -> Text<'static> {
        match self.renderers.get(key) {
            Some(r) => r.render(&Value::Null, theme),
            None => {
                tracing::warn!(
                    key,
                    "placeholder is not registered, using the built-in placeholder"
                );
                default_placeholder(theme)
            }
        }
    }

    /// Renders the component registered under `key`. There is no fallback for structured data.
    pub fn component(
        &self,
        key: &str,
        props: &Value,
        theme: &Theme,
    ) -> Result<Text<'static>, RenderError> {
        let renderer = self
            .renderers
            .get(key)
            .ok_or_else(|| RenderError::MissingComponent {
                key: key.to_string(),
                available: self.keys(),
            })?;
        Ok(renderer.render(props, theme))
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("keys", &self.keys())
            .finish()
    }
}

use ratatui::style::Color;
use ratatui::style::Modifier;
use ratatui::style::Style;
use ratatui::text::Span;
use std::collections::BTreeSet;
use streamark_core::text::CodeHighlighter;
use streamark_core::theme::ThemeMode;
use syntect::easy::HighlightLines;
use syntect::highlighting::FontStyle;
use syntect::highlighting::Style as SynStyle;
use syntect::highlighting::Theme;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxReference;
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

const DARK_THEME: &str = "base16-ocean.dark";
const LIGHT_THEME: &str = "InspiredGitHub";

pub struct SyntectHighlighter {
    syntax_set: SyntaxSet,
    theme: Theme,
    languages: Vec<String>,
}

impl SyntectHighlighter {
    pub fn new() -> Self {
        Self::for_mode(ThemeMode::Dark)
    }

    /// Uses a bundled syntect theme matching the terminal's light or dark background.
    pub fn for_mode(mode: ThemeMode) -> Self {
        let name = match mode {
            ThemeMode::Dark => DARK_THEME,
            ThemeMode::Light => LIGHT_THEME,
        };
        let theme_set = ThemeSet::load_defaults();
        let theme = theme_set
            .themes
            .get(name)
            .cloned()
            .or_else(|| theme_set.themes.values().next().cloned())
            .unwrap_or_default();
        Self::with_theme(SyntaxSet::load_defaults_newlines(), theme)
    }

    pub fn with_theme(syntax_set: SyntaxSet, theme: Theme) -> Self {
        let languages = language_names(&syntax_set);
        Self {
            syntax_set,
            theme,
            languages,
        }
    }

    fn find_syntax(&self, lang: &str) -> Option<&SyntaxReference> {
        self.syntax_set
            .find_syntax_by_extension(lang)
            .or_else(|| self.syntax_set.find_syntax_by_token(lang))
    }

    fn syntax_for(&self, language: Option<&str>) -> &SyntaxReference {
        if let Some(lang) = language
            && let Some(syntax) = self.find_syntax(lang)
        {
            return syntax;
        }
        tracing::trace!(?language, "no syntect syntax, highlighting as plain text");
        self.syntax_set.find_syntax_plain_text()
    }
}

impl Default for SyntectHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

/// Lowercased syntax names plus every file extension, sorted and deduplicated.
fn language_names(syntax_set: &SyntaxSet) -> Vec<String> {
    let mut names = BTreeSet::new();
    for syntax in syntax_set.syntaxes() {
        if syntax.name == "Plain Text" {
            continue;
        }
        names.insert(syntax.name.to_ascii_lowercase());
        for ext in &syntax.file_extensions {
            names.insert(ext.to_ascii_lowercase());
        }
    }
    names.into_iter().collect()
}

impl CodeHighlighter for SyntectHighlighter {
    fn highlight_lines(&self, language: Option<&str>, lines: &[&str]) -> Vec<Vec<Span<'static>>> {
        let syntax = self.syntax_for(language);
        let mut highlighter = HighlightLines::new(syntax, &self.theme);

        let mut out: Vec<Vec<Span<'static>>> = Vec::with_capacity(lines.len());
        for line in lines {
            let mut spans: Vec<Span<'static>> = Vec::new();
            for l in LinesWithEndings::from(line) {
                let regions = highlighter
                    .highlight_line(l, &self.syntax_set)
                    .unwrap_or_default();
                for (style, s) in regions {
                    if s.is_empty() {
                        continue;
                    }
                    spans.push(Span::styled(s.to_string(), syn_style_to_ratatui(style)));
                }
            }
            if spans.is_empty() {
                spans.push(Span::raw((*line).to_string()));
            }
            out.push(spans);
        }
        out
    }

    fn loaded_languages(&self) -> Vec<String> {
        self.languages.clone()
    }

    fn supports_language(&self, language: &str) -> bool {
        self.find_syntax(language).is_some()
    }

    fn background_color(&self) -> Option<Color> {
        self.theme
            .settings
            .background
            .map(|c| Color::Rgb(c.r, c.g, c.b))
    }
}

fn syn_style_to_ratatui(s: SynStyle) -> Style {
    let mut out = Style::default().fg(Color::Rgb(s.foreground.r, s.foreground.g, s.foreground.b));

    if s.font_style.contains(FontStyle::BOLD) {
        out = out.add_modifier(Modifier::BOLD);
    }
    if s.font_style.contains(FontStyle::ITALIC) {
        out = out.add_modifier(Modifier::ITALIC);
    }
    if s.font_style.contains(FontStyle::UNDERLINE) {
        out = out.add_modifier(Modifier::UNDERLINED);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highlights_one_row_per_line() {
        let h = SyntectHighlighter::new();
        let spans = h.highlight_line(Some("rs"), "fn main() {}\n");
        assert!(!spans.is_empty());

        let many = h.highlight_lines(Some("rs"), &["fn main() {", "}", ""]);
        assert_eq!(many.len(), 3);
    }

    #[test]
    fn advertises_names_and_extensions() {
        let h = SyntectHighlighter::new();
        let langs = h.loaded_languages();
        assert!(langs.iter().any(|l| l == "rust"));
        assert!(langs.iter().any(|l| l == "rs"));
        assert!(langs.iter().any(|l| l == "js"));
        assert!(!langs.iter().any(|l| l == "plain text"));
    }

    #[test]
    fn supports_tokens_and_rejects_unknown_languages() {
        let h = SyntectHighlighter::new();
        assert!(h.supports_language("python"));
        assert!(h.supports_language("js"));
        assert!(!h.supports_language("definitely-not-a-language"));
    }

    #[test]
    fn light_and_dark_themes_differ() {
        let dark = SyntectHighlighter::for_mode(ThemeMode::Dark);
        let light = SyntectHighlighter::for_mode(ThemeMode::Light);
        assert_ne!(dark.background_color(), light.background_color());
    }
}

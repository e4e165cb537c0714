//! Decides how much of a still-streaming code block is safe to highlight.
//!
//! While a fenced block streams in, its last line is frequently the beginning of the closing
//! fence (a lone backtick, then two, then three). Highlighting that line as code causes a visible
//! flash, so it is held back until the fence resolves.

use streamark_core::text::CodeHighlighter;

/// Returns the prefix of `text` that can be highlighted now. An empty result means "nothing yet".
///
/// - One trailing `\n` is dropped.
/// - Markdown blocks are all-or-nothing: they are returned only when the last line is a
///   triple-backtick fence and the number of such fence lines is even (no inner fence is open).
/// - Any other language drops a last line that starts with a backtick.
pub fn stabilize_code<'a>(text: &'a str, language: Option<&str>) -> &'a str {
    let code = text.strip_suffix('\n').unwrap_or(text);
    let (head, last_line) = match code.rfind('\n') {
        Some(idx) => (&code[..idx], &code[idx + 1..]),
        None => ("", code),
    };

    if language.is_some_and(is_markdown_language) {
        let fences = code
            .split('\n')
            .filter(|l| l.trim_start().starts_with("```"))
            .count();
        let last_is_fence = last_line.trim_start().starts_with("```");
        return if last_is_fence && fences % 2 == 0 {
            code
        } else {
            ""
        };
    }

    if last_line.trim_start().starts_with('`') {
        head
    } else {
        code
    }
}

pub fn is_markdown_language(language: &str) -> bool {
    language.eq_ignore_ascii_case("markdown") || language.eq_ignore_ascii_case("md")
}

/// The declared language of a code block and the language actually used for highlighting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HighlightLanguage {
    /// What the document declared; reported to consumers unchanged.
    pub declared: Option<String>,
    /// What the highlighter is asked for; `fallback` when `declared` is not loaded.
    pub highlight: String,
}

impl HighlightLanguage {
    pub fn resolve(
        declared: Option<&str>,
        highlighter: &dyn CodeHighlighter,
        fallback: &str,
    ) -> Self {
        let highlight = match declared {
            Some(lang) if highlighter.supports_language(lang) => lang.to_string(),
            _ => fallback.to_string(),
        };
        Self {
            declared: declared.map(str::to_string),
            highlight,
        }
    }
}

/// Splits a fenced code info string into `(language, meta)`.
///
/// The first whitespace-separated token is the language (a `language-`/`lang-` prefix and
/// surrounding braces are stripped); the rest of the string, trimmed, is the meta.
pub fn parse_info_string(info: &str) -> (Option<String>, Option<String>) {
    let info = info.trim();
    let (first, rest) = match info.find(char::is_whitespace) {
        Some(idx) => (&info[..idx], info[idx..].trim()),
        None => (info, ""),
    };

    let lang = first.split(',').next().unwrap_or("").trim();
    let lang = lang.strip_prefix('{').unwrap_or(lang);
    let lang = lang.strip_suffix('}').unwrap_or(lang);
    let lang = lang
        .strip_prefix("language-")
        .or_else(|| lang.strip_prefix("lang-"))
        .unwrap_or(lang)
        .trim();

    let lang = (!lang.is_empty()).then(|| lang.to_string());
    let meta = (!rest.is_empty()).then(|| rest.to_string());
    (lang, meta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::text::Span;

    #[test]
    fn balanced_markdown_fences_are_stable() {
        let text = "```\ninner\n```";
        assert_eq!(stabilize_code(text, Some("markdown")), text);
        assert_eq!(stabilize_code("```\ninner\n```\n", Some("md")), text);
    }

    #[test]
    fn unclosed_inner_markdown_fence_is_held_back() {
        assert_eq!(stabilize_code("```\ninner", Some("markdown")), "");
        assert_eq!(stabilize_code("```\ninner\n```\n```js", Some("markdown")), "");
    }

    #[test]
    fn markdown_without_fences_waits_for_one() {
        assert_eq!(stabilize_code("# title\nbody", Some("markdown")), "");
        assert_eq!(stabilize_code("", Some("markdown")), "");
    }

    #[test]
    fn trailing_backtick_line_is_dropped() {
        assert_eq!(stabilize_code("const x = 1;\n`", Some("js")), "const x = 1;");
        assert_eq!(stabilize_code("const x = 1;\n  ``\n", Some("js")), "const x = 1;");
        assert_eq!(stabilize_code("`", None), "");
    }

    #[test]
    fn other_text_passes_through_minus_one_newline() {
        assert_eq!(stabilize_code("a\nb\n", Some("rs")), "a\nb");
        assert_eq!(stabilize_code("a\nb\n\n", Some("rs")), "a\nb\n");
        assert_eq!(stabilize_code("let s = `x`;", Some("js")), "let s = `x`;");
        assert_eq!(stabilize_code("a\n`x` + 1", Some("js")), "a");
    }

    #[test]
    fn parses_info_strings() {
        assert_eq!(parse_info_string("rs"), (Some("rs".into()), None));
        assert_eq!(
            parse_info_string("component-json {\"placeholder\":\"p\"}"),
            (
                Some("component-json".into()),
                Some("{\"placeholder\":\"p\"}".into())
            )
        );
        assert_eq!(parse_info_string("language-python"), (Some("python".into()), None));
        assert_eq!(parse_info_string("{lang-ts}"), (Some("ts".into()), None));
        assert_eq!(parse_info_string("  "), (None, None));
    }

    struct Loaded;

    impl CodeHighlighter for Loaded {
        fn highlight_lines(&self, _: Option<&str>, lines: &[&str]) -> Vec<Vec<Span<'static>>> {
            lines.iter().map(|l| vec![Span::raw(l.to_string())]).collect()
        }

        fn loaded_languages(&self) -> Vec<String> {
            vec!["rust".into(), "js".into()]
        }
    }

    #[test]
    fn unknown_language_falls_back_for_highlighting_only() {
        let lang = HighlightLanguage::resolve(Some("cobol"), &Loaded, "js");
        assert_eq!(lang.declared.as_deref(), Some("cobol"));
        assert_eq!(lang.highlight, "js");

        let lang = HighlightLanguage::resolve(Some("rust"), &Loaded, "js");
        assert_eq!(lang.highlight, "rust");

        let lang = HighlightLanguage::resolve(None, &Loaded, "js");
        assert_eq!(lang.declared, None);
        assert_eq!(lang.highlight, "js");
    }
}

#![allow(dead_code)]

use ratatui::text::Span;
use std::sync::Mutex;
use std::sync::Once;
use streamark_core::text::CodeHighlighter;

/// Initialize the global tracing subscriber once (used by tests that run with `RUST_LOG`).
pub fn init_tracing_from_env() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer();
        let _ = subscriber.try_init();
    });
}

/// Highlighter double that records every request it receives.
pub struct RecordingHighlighter {
    languages: Vec<String>,
    calls: Mutex<Vec<(Option<String>, String)>>,
}

impl RecordingHighlighter {
    pub fn new(languages: &[&str]) -> Self {
        Self {
            languages: languages.iter().map(|l| l.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `(language, text)` for every highlight request so far.
    pub fn calls(&self) -> Vec<(Option<String>, String)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl CodeHighlighter for RecordingHighlighter {
    fn highlight_lines(&self, language: Option<&str>, lines: &[&str]) -> Vec<Vec<Span<'static>>> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((language.map(str::to_string), lines.join("\n")));
        }
        lines
            .iter()
            .map(|l| vec![Span::raw(l.to_string())])
            .collect()
    }

    fn loaded_languages(&self) -> Vec<String> {
        self.languages.clone()
    }
}

//! Turns a [`RenderPass`] into terminal lines and records where each code block landed.
//!
//! Prose is word-wrapped to the target width; code is never wrapped. The returned
//! `code_regions` are what a host feeds back through
//! [`MarkdownSession::attach_regions`](crate::session::MarkdownSession::attach_regions).

use crate::context::RenderContext;
use crate::document::InlineSpan;
use crate::document::ListItem;
use crate::document::Node;
use crate::gate::GateKey;
use crate::session::CodeBlockView;
use crate::session::CodeBody;
use crate::session::RenderPass;
use crate::session::SegmentView;
use ratatui::style::Modifier;
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::text::Text;
use streamark_core::theme::Theme;
use streamark_core::viewport::Region;
use unicode_width::UnicodeWidthChar;
use unicode_width::UnicodeWidthStr;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LaidOut {
    pub text: Text<'static>,
    /// Row range of every non-empty code block, in document coordinates.
    pub code_regions: Vec<(GateKey, Region)>,
}

impl LaidOut {
    pub fn height(&self) -> u32 {
        self.text.lines.len() as u32
    }
}

pub fn layout_pass(pass: &RenderPass, ctx: &RenderContext, width: u16) -> LaidOut {
    let mut w = Writer {
        ctx,
        theme: &ctx.theme,
        width: width.max(1) as usize,
        lines: Vec::new(),
        regions: Vec::new(),
        wants_blank: false,
    };
    for seg in &pass.segments {
        match &seg.view {
            Ok(view) => {
                for node in &view.document.nodes {
                    w.block(node, view, &[], &[]);
                }
            }
            Err(err) => {
                w.separate();
                w.lines.push(Line::from(Span::styled(
                    format!("⚠ {err}"),
                    ctx.theme.danger,
                )));
                w.wants_blank = true;
            }
        }
    }
    LaidOut {
        text: Text::from(w.lines),
        code_regions: w.regions,
    }
}

#[derive(Clone, Debug)]
struct Piece {
    text: String,
    style: Style,
}

struct Writer<'a> {
    ctx: &'a RenderContext,
    theme: &'a Theme,
    width: usize,
    lines: Vec<Line<'static>>,
    regions: Vec<(GateKey, Region)>,
    wants_blank: bool,
}

impl Writer<'_> {
    fn separate(&mut self) {
        if self.wants_blank && !self.lines.is_empty() {
            self.lines.push(Line::default());
        }
        self.wants_blank = false;
    }

    fn block(&mut self, node: &Node, view: &SegmentView, first: &[Piece], rest: &[Piece]) {
        match node {
            Node::Heading { level, content } => {
                self.separate();
                let mut style = self.theme.heading.add_modifier(Modifier::BOLD);
                if *level == 1 {
                    style = style.add_modifier(Modifier::UNDERLINED);
                }
                let pieces = inline_pieces(content, style, self.theme);
                self.wrap(first, rest, &pieces);
                self.wants_blank = true;
            }
            Node::Paragraph(content) => {
                self.separate();
                let pieces = inline_pieces(content, self.theme.text_primary, self.theme);
                self.wrap(first, rest, &pieces);
                self.wants_blank = true;
            }
            Node::BlockQuote(children) => {
                let bar = piece("│ ", self.theme.text_muted);
                let first = with(first, &bar);
                let rest = with(rest, &bar);
                self.children(children, view, &first, &rest);
            }
            Node::List { start, items } => self.list(*start, items, view, first, rest),
            Node::Table { head, rows } => {
                self.separate();
                self.table(head, rows, first, rest);
                self.wants_blank = true;
            }
            Node::Code(code) => {
                if let Some(block) = view.code_blocks.get(code.ordinal) {
                    self.separate();
                    self.code(block, first, rest);
                    self.wants_blank = true;
                }
            }
            Node::Component { ordinal, .. } | Node::Chart { ordinal, .. } => {
                if let Some(embed) = view.embeds.get(*ordinal) {
                    self.separate();
                    self.push_lines(first, rest, embed.lines.iter().map(|l| l.spans.clone()));
                    self.wants_blank = true;
                }
            }
            Node::FootnoteDefinition { label, children } => {
                let marker = piece(format!("[^{label}]: "), self.theme.text_muted);
                let indent = piece(" ".repeat(marker.text.width()), Style::default());
                let first = with(first, &marker);
                let rest = with(rest, &indent);
                self.children(children, view, &first, &rest);
            }
            Node::Html(html) => {
                self.separate();
                let muted = self.theme.text_muted;
                let lines = html
                    .trim_end()
                    .lines()
                    .map(|l| vec![Span::styled(l.to_string(), muted)]);
                self.push_lines(first, rest, lines);
                self.wants_blank = true;
            }
            Node::Rule => {
                self.separate();
                let cols = self.width.saturating_sub(prefix_width(first)).max(1);
                let rule = Span::styled("─".repeat(cols), self.theme.text_muted);
                self.push_prefixed(first, vec![rule]);
                self.wants_blank = true;
            }
        }
    }

    /// Children share `rest` after the first line of the first child.
    fn children(&mut self, children: &[Node], view: &SegmentView, first: &[Piece], rest: &[Piece]) {
        for (i, child) in children.iter().enumerate() {
            let lead = if i == 0 { first } else { rest };
            self.block(child, view, lead, rest);
        }
    }

    fn list(
        &mut self,
        start: Option<u64>,
        items: &[ListItem],
        view: &SegmentView,
        first: &[Piece],
        rest: &[Piece],
    ) {
        self.separate();
        for (i, item) in items.iter().enumerate() {
            let mut marker = match start {
                Some(n) => format!("{}. ", n + i as u64),
                None => "• ".to_string(),
            };
            match item.checked {
                Some(true) => marker.push_str("[x] "),
                Some(false) => marker.push_str("[ ] "),
                None => {}
            }
            let indent = " ".repeat(marker.width());
            let lead = if i == 0 { first } else { rest };
            let item_first = with(lead, &piece(marker, self.theme.text_muted));
            let item_rest = with(rest, &piece(indent, Style::default()));
            // Items stay tight: no blank line between an item's marker line and the previous item.
            self.wants_blank = false;
            self.children(&item.children, view, &item_first, &item_rest);
        }
        self.wants_blank = true;
    }

    fn code(&mut self, block: &CodeBlockView, first: &[Piece], rest: &[Piece]) {
        let body: Vec<Line<'static>> = match &block.body {
            CodeBody::Empty => return,
            CodeBody::Plain => block
                .stabilized_text
                .split('\n')
                .map(|l| Line::from(Span::styled(l.to_string(), self.theme.code_block)))
                .collect(),
            CodeBody::Highlighted(lines) => {
                lines.iter().map(|spans| Line::from(spans.clone())).collect()
            }
        };
        let body = match &self.ctx.code_block_renderer {
            Some(r) => r.render(block.language.as_deref(), Text::from(body), self.theme).lines,
            None => body,
        };

        let top = self.lines.len() as u32;
        self.push_lines(first, rest, body.into_iter().map(|l| l.spans));
        let height = self.lines.len() as u32 - top;
        if height > 0 {
            self.regions
                .push((block.key, Region::new(0, top, self.width as u32, height)));
        }
    }

    fn table(
        &mut self,
        head: &[Vec<InlineSpan>],
        rows: &[Vec<Vec<InlineSpan>>],
        first: &[Piece],
        rest: &[Piece],
    ) {
        let theme = self.theme;
        let cell_text =
            |cell: &Vec<InlineSpan>| cell.iter().map(|s| s.text.as_str()).collect::<String>();
        let cols = std::iter::once(head)
            .chain(rows.iter().map(Vec::as_slice))
            .map(<[_]>::len)
            .max()
            .unwrap_or(0);
        let mut widths = vec![0usize; cols];
        for row in std::iter::once(head).chain(rows.iter().map(Vec::as_slice)) {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell_text(cell).width());
            }
        }

        let render_row = |row: &[Vec<InlineSpan>], style: Style| -> Vec<Span<'static>> {
            let mut spans = Vec::new();
            for (i, w) in widths.iter().enumerate() {
                if i > 0 {
                    spans.push(Span::styled(" │ ", theme.text_muted));
                }
                let text = row.get(i).map(cell_text).unwrap_or_default();
                let pad = w.saturating_sub(text.width());
                spans.push(Span::styled(format!("{text}{}", " ".repeat(pad)), style));
            }
            spans
        };

        let mut lines = Vec::new();
        if !head.is_empty() {
            lines.push(render_row(head, theme.text_primary.add_modifier(Modifier::BOLD)));
            let rule = widths
                .iter()
                .map(|w| "─".repeat(*w))
                .collect::<Vec<_>>()
                .join("─┼─");
            lines.push(vec![Span::styled(rule, theme.text_muted)]);
        }
        for row in rows {
            lines.push(render_row(row, theme.text_primary));
        }
        self.push_lines(first, rest, lines);
    }

    /// `first` prefixes the first line only, `rest` every following one.
    fn push_lines(
        &mut self,
        first: &[Piece],
        rest: &[Piece],
        lines: impl IntoIterator<Item = Vec<Span<'static>>>,
    ) {
        for (i, spans) in lines.into_iter().enumerate() {
            self.push_prefixed(if i == 0 { first } else { rest }, spans);
        }
    }

    fn push_prefixed(&mut self, prefix: &[Piece], spans: Vec<Span<'static>>) {
        let mut out = pieces_to_spans(prefix);
        out.extend(spans);
        self.lines.push(Line::from(out));
    }

    /// Greedy word wrap. Words wider than a line are split by display width.
    fn wrap(&mut self, first: &[Piece], rest: &[Piece], pieces: &[Piece]) {
        let width = self.width;
        let tokens: Vec<Piece> = pieces.iter().flat_map(split_piece_ws).collect();

        let mut prefix = first;
        let mut cur: Vec<Piece> = Vec::new();
        let mut cur_cols = prefix_width(prefix);

        for tok in tokens {
            if tok.text == "\n" {
                self.flush_wrapped(prefix, &mut cur);
                prefix = rest;
                cur_cols = prefix_width(prefix);
                continue;
            }
            if cur.is_empty() && is_all_ws(&tok.text) {
                continue;
            }
            let tok_cols = tok.text.width();
            if cur_cols + tok_cols <= width {
                cur_cols += tok_cols;
                cur.push(tok);
                continue;
            }
            if !cur.is_empty() {
                self.flush_wrapped(prefix, &mut cur);
                prefix = rest;
                cur_cols = prefix_width(prefix);
                if is_all_ws(&tok.text) {
                    continue;
                }
            }
            let mut remaining = tok;
            loop {
                let remaining_cols = remaining.text.width();
                if cur_cols + remaining_cols <= width {
                    cur_cols += remaining_cols;
                    cur.push(remaining);
                    break;
                }
                let max = width.saturating_sub(cur_cols).max(1);
                let (head, tail) = split_to_width(&remaining, max);
                cur.push(head);
                self.flush_wrapped(prefix, &mut cur);
                prefix = rest;
                cur_cols = prefix_width(prefix);
                if tail.text.is_empty() {
                    break;
                }
                remaining = tail;
            }
        }
        if !cur.is_empty() {
            self.flush_wrapped(prefix, &mut cur);
        }
    }

    fn flush_wrapped(&mut self, prefix: &[Piece], cur: &mut Vec<Piece>) {
        while cur.last().is_some_and(|p| is_all_ws(&p.text)) {
            cur.pop();
        }
        let spans = pieces_to_spans(cur);
        self.push_prefixed(prefix, spans);
        cur.clear();
    }
}

fn piece(text: impl Into<String>, style: Style) -> Piece {
    Piece {
        text: text.into(),
        style,
    }
}

fn with(prefix: &[Piece], extra: &Piece) -> Vec<Piece> {
    let mut out = prefix.to_vec();
    out.push(extra.clone());
    out
}

fn prefix_width(prefix: &[Piece]) -> usize {
    prefix.iter().map(|p| p.text.width()).sum()
}

fn pieces_to_spans(pieces: &[Piece]) -> Vec<Span<'static>> {
    pieces
        .iter()
        .filter(|p| !p.text.is_empty())
        .map(|p| Span::styled(p.text.clone(), p.style))
        .collect()
}

fn inline_pieces(spans: &[InlineSpan], base: Style, theme: &Theme) -> Vec<Piece> {
    spans
        .iter()
        .map(|s| piece(s.text.clone(), style_for_span(base, theme, s)))
        .collect()
}

fn style_for_span(base: Style, theme: &Theme, span: &InlineSpan) -> Style {
    let mut style = base;
    if span.flags.code {
        style = theme.code_inline;
    }
    if span.link.is_some() {
        style = theme.link.add_modifier(Modifier::UNDERLINED);
    }
    if span.flags.emphasis {
        style = style.add_modifier(Modifier::ITALIC);
    }
    if span.flags.strong {
        style = style.add_modifier(Modifier::BOLD);
    }
    if span.flags.strike {
        style = style.add_modifier(Modifier::CROSSED_OUT);
    }
    style
}

/// Splits into alternating runs of whitespace and non-whitespace; hard breaks become `"\n"`.
fn split_piece_ws(p: &Piece) -> Vec<Piece> {
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut last_was_ws: Option<bool> = None;
    for ch in p.text.chars() {
        if ch == '\n' {
            if !buf.is_empty() {
                out.push(piece(std::mem::take(&mut buf), p.style));
            }
            out.push(piece("\n", p.style));
            last_was_ws = None;
            continue;
        }
        let is_ws = ch.is_whitespace();
        if last_was_ws.is_some_and(|prev| prev != is_ws) {
            out.push(piece(std::mem::take(&mut buf), p.style));
        }
        buf.push(ch);
        last_was_ws = Some(is_ws);
    }
    if !buf.is_empty() {
        out.push(piece(buf, p.style));
    }
    out
}

fn split_to_width(p: &Piece, max_cols: usize) -> (Piece, Piece) {
    let mut cols = 0usize;
    let mut idx = 0usize;
    for (byte_idx, ch) in p.text.char_indices() {
        let w = ch.width().unwrap_or(0);
        if cols + w > max_cols {
            break;
        }
        cols += w;
        idx = byte_idx + ch.len_utf8();
    }
    // Always make progress, even when a single wide char exceeds the line.
    if idx == 0 {
        idx = p.text.chars().next().map_or(0, char::len_utf8);
    }
    let (a, b) = p.text.split_at(idx);
    (piece(a, p.style), piece(b, p.style))
}

fn is_all_ws(s: &str) -> bool {
    s.chars().all(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MarkdownSession;
    use std::rc::Rc;
    use std::sync::Arc;
    use streamark_core::observer::ScrollObserver;
    use streamark_core::observer::ViewportObserver;

    fn plain(text: &Text<'_>) -> Vec<String> {
        text.lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    fn lay(md: &str, width: u16) -> (LaidOut, Vec<String>) {
        let ctx = Arc::new(RenderContext::default());
        let mut s = MarkdownSession::new(ctx.clone(), None);
        let pass = s.render_incremental(md);
        let out = layout_pass(&pass, &ctx, width);
        let lines = plain(&out.text);
        (out, lines)
    }

    #[test]
    fn wraps_prose_on_word_boundaries() {
        let (_, lines) = lay("one two three four", 9);
        assert_eq!(lines, vec!["one two", "three", "four"]);
    }

    #[test]
    fn splits_words_longer_than_the_line() {
        let (_, lines) = lay("abcdefghij", 4);
        assert_eq!(lines, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn lists_and_quotes_carry_prefixes() {
        let (_, lines) = lay("- alpha beta\n- [x] gamma\n\n> quoted text", 12);
        assert_eq!(
            lines,
            vec!["• alpha beta", "• [x] gamma", "", "│ quoted", "│ text"]
        );
    }

    #[test]
    fn code_is_not_wrapped_and_its_region_is_recorded() {
        let (out, lines) = lay("intro\n\n```js\nlet a = 1; let b = 2;\nb\n```\n", 10);
        assert_eq!(lines, vec!["intro", "", "let a = 1; let b = 2;", "b"]);
        assert_eq!(out.code_regions.len(), 1);
        assert_eq!(out.code_regions[0].1, Region::new(0, 2, 10, 2));
    }

    #[test]
    fn regions_feed_back_into_gates() {
        let obs = Rc::new(ScrollObserver::new(Region::rows(0, 3)));
        let dyn_obs: Rc<dyn ViewportObserver> = obs.clone();
        let ctx = Arc::new(RenderContext::default());
        let mut s = MarkdownSession::new(ctx.clone(), Some(dyn_obs));
        let md = "a\n\n\nb\n\n\nc\n\n\nd\n\n\ne\n\n\nf\n\n\n```js\nx\n```\n";
        let pass = s.render_incremental(md);
        let out = layout_pass(&pass, &ctx, 20);
        assert!(!s.attach_regions(&out.code_regions));
        obs.set_window(Region::rows(out.height().saturating_sub(3), 3));
        let pass = s.refresh();
        assert!(pass.code_blocks().all(|c| c.visible));
    }

    #[test]
    fn errors_render_as_a_marker_line() {
        let (_, lines) = lay("```echarts\n{}\n```\n", 40);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("⚠ "));
    }

    #[test]
    fn tables_align_columns() {
        let (_, lines) = lay("| a | long |\n|---|---|\n| 1 | 2 |\n", 40);
        assert_eq!(lines, vec!["a │ long", "──┼─────", "1 │ 2   "]);
    }
}

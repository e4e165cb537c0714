//! The owned document tree produced for each segment.
//!
//! Parsing is delegated to `pulldown-cmark`; this module only folds its event stream into a
//! small tree that can be cached, shared across passes, and walked by the transform chain.

use crate::stabilize::parse_info_string;
use pulldown_cmark::CodeBlockKind;
use pulldown_cmark::Event;
use pulldown_cmark::Options;
use pulldown_cmark::Parser;
use pulldown_cmark::Tag;
use pulldown_cmark::TagEnd;
use serde_json::Value;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InlineFlags {
    pub emphasis: bool,
    pub strong: bool,
    pub strike: bool,
    pub code: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineSpan {
    pub text: String,
    pub flags: InlineFlags,
    pub link: Option<String>,
}

impl InlineSpan {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            flags: InlineFlags::default(),
            link: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeNode {
    pub language: Option<String>,
    pub meta: Option<String>,
    pub text: String,
    /// Position among the code blocks of this document, in document order.
    pub ordinal: usize,
}

pub const DEFAULT_COMPONENT_PLACEHOLDER: &str = "streamark-default-component-placeholder";

#[derive(Clone, Debug, PartialEq)]
pub enum ComponentState {
    Placeholder { key: String },
    Ready { kind: String, props: Value },
}

#[derive(Clone, Debug, PartialEq)]
pub enum ChartState {
    Placeholder,
    Ready { option: Value },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListItem {
    pub checked: Option<bool>,
    pub children: Vec<Node>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Heading {
        level: u8,
        content: Vec<InlineSpan>,
    },
    Paragraph(Vec<InlineSpan>),
    BlockQuote(Vec<Node>),
    List {
        start: Option<u64>,
        items: Vec<ListItem>,
    },
    Table {
        head: Vec<Vec<InlineSpan>>,
        rows: Vec<Vec<Vec<InlineSpan>>>,
    },
    Code(CodeNode),
    /// Embedded component; `ordinal` indexes the document's embeds.
    Component {
        ordinal: usize,
        state: ComponentState,
    },
    Chart {
        ordinal: usize,
        state: ChartState,
    },
    FootnoteDefinition {
        label: String,
        children: Vec<Node>,
    },
    Html(String),
    Rule,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    pub nodes: Vec<Node>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParseOptions {
    pub math: bool,
    pub footnotes: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            math: true,
            footnotes: true,
        }
    }
}

impl Document {
    pub fn parse(source: &str, options: ParseOptions) -> Self {
        let mut opts = Options::empty();
        opts.insert(Options::ENABLE_TABLES);
        opts.insert(Options::ENABLE_STRIKETHROUGH);
        opts.insert(Options::ENABLE_TASKLISTS);
        if options.footnotes {
            opts.insert(Options::ENABLE_FOOTNOTES);
        }
        if options.math {
            opts.insert(Options::ENABLE_MATH);
        }

        let mut b = Builder::default();
        for event in Parser::new_ext(source, opts) {
            b.event(event);
        }
        b.finish()
    }

    /// Visits every node depth-first, in document order.
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a Node)) {
        visit_nodes(&self.nodes, f);
    }

    pub fn visit_mut(&mut self, f: &mut impl FnMut(&mut Node)) {
        visit_nodes_mut(&mut self.nodes, f);
    }

    pub fn code_blocks(&self) -> Vec<&CodeNode> {
        let mut out = Vec::new();
        self.visit(&mut |n| {
            if let Node::Code(code) = n {
                out.push(code);
            }
        });
        out
    }

    /// Renumbers code blocks and embeds in document order.
    pub fn assign_ordinals(&mut self) {
        let mut code = 0usize;
        let mut embed = 0usize;
        self.visit_mut(&mut |n| match n {
            Node::Code(c) => {
                c.ordinal = code;
                code += 1;
            }
            Node::Component { ordinal, .. } | Node::Chart { ordinal, .. } => {
                *ordinal = embed;
                embed += 1;
            }
            _ => {}
        });
    }
}

fn visit_nodes<'a>(nodes: &'a [Node], f: &mut impl FnMut(&'a Node)) {
    for node in nodes {
        f(node);
        match node {
            Node::BlockQuote(children) | Node::FootnoteDefinition { children, .. } => {
                visit_nodes(children, f)
            }
            Node::List { items, .. } => {
                for item in items {
                    visit_nodes(&item.children, f);
                }
            }
            _ => {}
        }
    }
}

fn visit_nodes_mut(nodes: &mut [Node], f: &mut impl FnMut(&mut Node)) {
    for node in nodes {
        f(node);
        match node {
            Node::BlockQuote(children) | Node::FootnoteDefinition { children, .. } => {
                visit_nodes_mut(children, f)
            }
            Node::List { items, .. } => {
                for item in items {
                    visit_nodes_mut(&mut item.children, f);
                }
            }
            _ => {}
        }
    }
}

enum Container {
    Root(Vec<Node>),
    Quote(Vec<Node>),
    List {
        start: Option<u64>,
        items: Vec<ListItem>,
    },
    Item(ListItem),
    Footnote {
        label: String,
        children: Vec<Node>,
    },
    Table {
        head: Vec<Vec<InlineSpan>>,
        rows: Vec<Vec<Vec<InlineSpan>>>,
        row: Vec<Vec<InlineSpan>>,
    },
}

enum InlineTarget {
    Paragraph(Vec<InlineSpan>),
    Heading(u8, Vec<InlineSpan>),
    Cell(Vec<InlineSpan>),
}

impl InlineTarget {
    fn spans_mut(&mut self) -> &mut Vec<InlineSpan> {
        match self {
            Self::Paragraph(s) | Self::Heading(_, s) | Self::Cell(s) => s,
        }
    }
}

struct Builder {
    stack: Vec<Container>,
    inline: Option<InlineTarget>,
    flags: InlineFlags,
    links: Vec<String>,
    code: Option<(Option<String>, Option<String>, String)>,
    html: Option<String>,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            stack: vec![Container::Root(Vec::new())],
            inline: None,
            flags: InlineFlags::default(),
            links: Vec::new(),
            code: None,
            html: None,
        }
    }
}

impl Builder {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                if let Some((_, _, code)) = &mut self.code {
                    code.push_str(&text);
                } else if let Some(html) = &mut self.html {
                    html.push_str(&text);
                } else {
                    self.push_text(&text, self.flags);
                }
            }
            Event::Code(text) => self.push_text(&text, InlineFlags { code: true, ..self.flags }),
            Event::InlineMath(text) => {
                self.push_text(&format!("${text}$"), InlineFlags { code: true, ..self.flags })
            }
            Event::DisplayMath(text) => {
                self.push_text(&format!("$${text}$$"), InlineFlags { code: true, ..self.flags })
            }
            Event::Html(html) => {
                if let Some(buf) = &mut self.html {
                    buf.push_str(&html);
                } else {
                    self.push_block(Node::Html(html.to_string()));
                }
            }
            Event::InlineHtml(html) => self.push_text(&html, self.flags),
            Event::FootnoteReference(label) => {
                self.push_text(&format!("[^{label}]"), self.flags)
            }
            Event::SoftBreak => self.push_text(" ", self.flags),
            Event::HardBreak => self.push_text("\n", self.flags),
            Event::Rule => self.push_block(Node::Rule),
            Event::TaskListMarker(checked) => {
                if let Some(Container::Item(item)) = self.stack.last_mut() {
                    item.checked = Some(checked);
                }
            }
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                self.flush_inline();
                self.inline = Some(InlineTarget::Paragraph(Vec::new()));
            }
            Tag::Heading { level, .. } => {
                self.flush_inline();
                self.inline = Some(InlineTarget::Heading(level as u8, Vec::new()));
            }
            Tag::BlockQuote(_) => {
                self.flush_inline();
                self.stack.push(Container::Quote(Vec::new()));
            }
            Tag::CodeBlock(kind) => {
                self.flush_inline();
                let (language, meta) = match kind {
                    CodeBlockKind::Fenced(info) => parse_info_string(&info),
                    CodeBlockKind::Indented => (None, None),
                };
                self.code = Some((language, meta, String::new()));
            }
            Tag::HtmlBlock => {
                self.flush_inline();
                self.html = Some(String::new());
            }
            Tag::List(start) => {
                self.flush_inline();
                self.stack.push(Container::List {
                    start,
                    items: Vec::new(),
                });
            }
            Tag::Item => {
                self.stack.push(Container::Item(ListItem {
                    checked: None,
                    children: Vec::new(),
                }));
            }
            Tag::FootnoteDefinition(label) => {
                self.flush_inline();
                self.stack.push(Container::Footnote {
                    label: label.to_string(),
                    children: Vec::new(),
                });
            }
            Tag::Table(_) => {
                self.flush_inline();
                self.stack.push(Container::Table {
                    head: Vec::new(),
                    rows: Vec::new(),
                    row: Vec::new(),
                });
            }
            Tag::TableCell => self.inline = Some(InlineTarget::Cell(Vec::new())),
            Tag::Emphasis => self.flags.emphasis = true,
            Tag::Strong => self.flags.strong = true,
            Tag::Strikethrough => self.flags.strike = true,
            Tag::Link { dest_url, .. } | Tag::Image { dest_url, .. } => {
                self.links.push(dest_url.to_string())
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph | TagEnd::Heading(_) => self.flush_inline(),
            TagEnd::CodeBlock => {
                if let Some((language, meta, text)) = self.code.take() {
                    self.push_block(Node::Code(CodeNode {
                        language,
                        meta,
                        text,
                        ordinal: 0,
                    }));
                }
            }
            TagEnd::HtmlBlock => {
                if let Some(html) = self.html.take() {
                    self.push_block(Node::Html(html));
                }
            }
            TagEnd::BlockQuote(_) => {
                self.flush_inline();
                if let Some(Container::Quote(children)) = self.pop_container() {
                    self.push_block(Node::BlockQuote(children));
                }
            }
            TagEnd::List(_) => {
                if let Some(Container::List { start, items }) = self.pop_container() {
                    self.push_block(Node::List { start, items });
                }
            }
            TagEnd::Item => {
                self.flush_inline();
                if let Some(Container::Item(item)) = self.pop_container()
                    && let Some(Container::List { items, .. }) = self.stack.last_mut()
                {
                    items.push(item);
                }
            }
            TagEnd::FootnoteDefinition => {
                self.flush_inline();
                if let Some(Container::Footnote { label, children }) = self.pop_container() {
                    self.push_block(Node::FootnoteDefinition { label, children });
                }
            }
            TagEnd::TableCell => {
                if let Some(InlineTarget::Cell(cell)) = self.inline.take()
                    && let Some(Container::Table { row, .. }) = self.stack.last_mut()
                {
                    row.push(cell);
                }
            }
            TagEnd::TableHead => {
                if let Some(Container::Table { head, row, .. }) = self.stack.last_mut() {
                    *head = std::mem::take(row);
                }
            }
            TagEnd::TableRow => {
                if let Some(Container::Table { rows, row, .. }) = self.stack.last_mut() {
                    rows.push(std::mem::take(row));
                }
            }
            TagEnd::Table => {
                if let Some(Container::Table { head, rows, .. }) = self.pop_container() {
                    self.push_block(Node::Table { head, rows });
                }
            }
            TagEnd::Emphasis => self.flags.emphasis = false,
            TagEnd::Strong => self.flags.strong = false,
            TagEnd::Strikethrough => self.flags.strike = false,
            TagEnd::Link | TagEnd::Image => {
                self.links.pop();
            }
            _ => {}
        }
    }

    fn push_text(&mut self, text: &str, flags: InlineFlags) {
        if text.is_empty() {
            return;
        }
        // Tight list items carry text without a paragraph.
        let target = self
            .inline
            .get_or_insert_with(|| InlineTarget::Paragraph(Vec::new()));
        target.spans_mut().push(InlineSpan {
            text: text.to_string(),
            flags,
            link: self.links.last().cloned(),
        });
    }

    fn flush_inline(&mut self) {
        match self.inline.take() {
            Some(InlineTarget::Paragraph(spans)) if !spans.is_empty() => {
                self.push_block(Node::Paragraph(spans))
            }
            Some(InlineTarget::Heading(level, content)) => {
                self.push_block(Node::Heading { level, content })
            }
            Some(InlineTarget::Cell(cell)) => {
                if let Some(Container::Table { row, .. }) = self.stack.last_mut() {
                    row.push(cell);
                }
            }
            _ => {}
        }
    }

    fn pop_container(&mut self) -> Option<Container> {
        // The root container always stays.
        if self.stack.len() > 1 {
            self.stack.pop()
        } else {
            None
        }
    }

    fn push_block(&mut self, node: Node) {
        if self.inline.is_some() && !matches!(node, Node::Heading { .. } | Node::Paragraph(_)) {
            self.flush_inline();
        }
        match self.stack.last_mut() {
            Some(
                Container::Root(children)
                | Container::Quote(children)
                | Container::Footnote { children, .. },
            ) => children.push(node),
            Some(Container::Item(item)) => item.children.push(node),
            Some(Container::List { items, .. }) => items.push(ListItem {
                checked: None,
                children: vec![node],
            }),
            Some(Container::Table { .. }) | None => {}
        }
    }

    fn finish(mut self) -> Document {
        self.flush_inline();
        if let Some((language, meta, text)) = self.code.take() {
            self.push_block(Node::Code(CodeNode {
                language,
                meta,
                text,
                ordinal: 0,
            }));
        }
        while self.stack.len() > 1 {
            self.end(match self.stack.last() {
                Some(Container::Quote(_)) => TagEnd::BlockQuote(None),
                Some(Container::List { .. }) => TagEnd::List(false),
                Some(Container::Item(_)) => TagEnd::Item,
                Some(Container::Footnote { .. }) => TagEnd::FootnoteDefinition,
                Some(Container::Table { .. }) => TagEnd::Table,
                Some(Container::Root(_)) | None => break,
            });
        }
        let nodes = match self.stack.pop() {
            Some(Container::Root(nodes)) => nodes,
            _ => Vec::new(),
        };
        let mut doc = Document { nodes };
        doc.assign_ordinals();
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(md: &str) -> Document {
        Document::parse(md, ParseOptions::default())
    }

    fn plain(spans: &[InlineSpan]) -> String {
        spans.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn parses_code_block_language_meta_and_text() {
        let doc = parse("```rs title=\"main\"\nfn main() {}\n```\n");
        let code = doc.code_blocks();
        assert_eq!(code.len(), 1);
        assert_eq!(code[0].language.as_deref(), Some("rs"));
        assert_eq!(code[0].meta.as_deref(), Some("title=\"main\""));
        assert_eq!(code[0].text, "fn main() {}\n");
    }

    #[test]
    fn unterminated_fence_still_yields_code() {
        let doc = parse("```py\nprint(1)\n`");
        let code = doc.code_blocks();
        assert_eq!(code.len(), 1);
        assert_eq!(code[0].language.as_deref(), Some("py"));
        assert!(code[0].text.starts_with("print(1)\n"));
    }

    #[test]
    fn inline_flags_follow_markup() {
        let doc = parse("a **b** *c* `d` ~~e~~ [f](https://x.y)");
        let Node::Paragraph(spans) = &doc.nodes[0] else {
            panic!("expected paragraph, got {:?}", doc.nodes);
        };
        assert!(spans.iter().any(|s| s.text == "b" && s.flags.strong));
        assert!(spans.iter().any(|s| s.text == "c" && s.flags.emphasis));
        assert!(spans.iter().any(|s| s.text == "d" && s.flags.code));
        assert!(spans.iter().any(|s| s.text == "e" && s.flags.strike));
        assert!(
            spans
                .iter()
                .any(|s| s.text == "f" && s.link.as_deref() == Some("https://x.y"))
        );
    }

    #[test]
    fn tight_lists_and_task_markers() {
        let doc = parse("- [x] done\n- todo\n");
        let Node::List { start, items } = &doc.nodes[0] else {
            panic!("expected list, got {:?}", doc.nodes);
        };
        assert_eq!(*start, None);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].checked, Some(true));
        let Node::Paragraph(spans) = &items[1].children[0] else {
            panic!("expected paragraph in item");
        };
        assert_eq!(plain(spans), "todo");
    }

    #[test]
    fn nested_code_blocks_are_numbered_in_order() {
        let doc = parse("```a\n1\n```\n\n> ```b\n> 2\n> ```\n\n- ```c\n  3\n  ```\n");
        let langs: Vec<_> = doc
            .code_blocks()
            .iter()
            .map(|c| (c.language.clone().unwrap_or_default(), c.ordinal))
            .collect();
        assert_eq!(
            langs,
            vec![("a".into(), 0), ("b".into(), 1), ("c".into(), 2)]
        );
    }

    #[test]
    fn tables_keep_head_and_rows() {
        let doc = parse("| a | b |\n|---|---|\n| 1 | 2 |\n");
        let Node::Table { head, rows } = &doc.nodes[0] else {
            panic!("expected table, got {:?}", doc.nodes);
        };
        assert_eq!(head.len(), 2);
        assert_eq!(rows.len(), 1);
        assert_eq!(plain(&rows[0][1]), "2");
    }

    #[test]
    fn headings_and_rules() {
        let doc = parse("## Title\n\n---\n");
        assert!(matches!(&doc.nodes[0], Node::Heading { level: 2, .. }));
        assert_eq!(doc.nodes[1], Node::Rule);
    }
}

//! Splits a growing Markdown source into independently cacheable segments.
//!
//! Segmentation is line oriented and deliberately conservative: a paragraph or list is only
//! considered finished once a second consecutive blank line (or the end of the source) follows
//! it, and a fenced code block once its matching closing fence is followed by a blank line (or
//! the end of the source). Everything after the last finished construct forms a single open
//! segment that is re-rendered on every update.
//!
//! Segmentation is lossless: concatenating every [`Segment::content`] yields the source.

use crate::hash::SegmentHash;
use crate::hash::content_hash;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    #[default]
    Block,
    List,
    Fence,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    pub content: String,
    /// `true` once the construct has textually terminated; only closed segments are cached.
    pub closed: bool,
    pub kind: SegmentKind,
    pub hash: SegmentHash,
}

impl Segment {
    pub fn new(content: impl Into<String>, closed: bool, kind: SegmentKind) -> Self {
        let content = content.into();
        let hash = content_hash(&content);
        Self {
            content,
            closed,
            kind,
            hash,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FenceFamily {
    Backtick,
    Tilde,
}

impl FenceFamily {
    fn of(trimmed: &str) -> Option<Self> {
        if trimmed.starts_with("```") {
            Some(Self::Backtick)
        } else if trimmed.starts_with("~~~") {
            Some(Self::Tilde)
        } else {
            None
        }
    }
}

/// Segments `source` into an ordered list of segments.
pub fn segment(source: &str) -> Vec<Segment> {
    let mut out = Vec::new();
    segment_with(source, |s| out.push(s));
    out
}

/// Like [`segment`], but hands each segment to `emit` in source order.
pub fn segment_with(source: &str, mut emit: impl FnMut(Segment)) {
    let lines = source_lines(source);

    let mut buf_start = 0usize;
    let mut pos = 0usize;
    let mut fence: Option<FenceFamily> = None;
    let mut in_list = false;
    let mut last_blank = false;

    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        let next = lines.get(i + 1);
        let next_blank = next.is_none_or(|l| l.trim().is_empty());

        if let Some(family) = FenceFamily::of(trimmed) {
            match fence {
                None => fence = Some(family),
                Some(open) if open == family => {
                    fence = None;
                    pos += line.len();
                    last_blank = false;
                    if next_blank {
                        emit(Segment::new(&source[buf_start..pos], true, SegmentKind::Fence));
                        buf_start = pos;
                    }
                    continue;
                }
                // The other marker family is plain content inside an open fence.
                Some(_) => {}
            }
        }

        pos += line.len();

        if fence.is_some() {
            continue;
        }

        if is_list_item(line) {
            in_list = true;
        }

        if trimmed.is_empty() {
            if last_blank || next.is_none() {
                let buffer = &source[buf_start..pos];
                if !buffer.trim().is_empty() {
                    let kind = if in_list {
                        SegmentKind::List
                    } else {
                        SegmentKind::Block
                    };
                    emit(Segment::new(buffer, true, kind));
                    buf_start = pos;
                }
                in_list = false;
            }
            last_blank = true;
        } else {
            last_blank = false;
        }
    }

    if buf_start < source.len() {
        let kind = if fence.is_some() {
            SegmentKind::Fence
        } else if in_list {
            SegmentKind::List
        } else {
            SegmentKind::Block
        };
        emit(Segment::new(&source[buf_start..], false, kind));
    }
}

/// Splits on `\n`, keeping each terminator. The final piece (possibly empty) is always present,
/// so a source ending in `\n` ends with an empty last line.
fn source_lines(source: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = source.split_inclusive('\n').collect();
    if source.is_empty() || source.ends_with('\n') {
        lines.push("");
    }
    lines
}

/// Bullet (`-`, `*`, `+`) or ordered (`1.`) list item followed by whitespace.
fn is_list_item(line: &str) -> bool {
    let body = line.strip_suffix('\n').unwrap_or(line);
    let rest = body.trim_start();
    let after = if let Some(after) = rest.strip_prefix(['-', '*', '+']) {
        after
    } else {
        let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        if digits == 0 {
            return false;
        }
        match rest[digits..].strip_prefix('.') {
            Some(after) => after,
            None => return false,
        }
    };
    after.starts_with(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(segments: &[Segment]) -> Vec<(&str, bool)> {
        segments
            .iter()
            .map(|s| (s.content.as_str(), s.closed))
            .collect()
    }

    #[test]
    fn empty_source_has_no_segments() {
        assert!(segment("").is_empty());
    }

    #[test]
    fn single_blank_line_does_not_close_a_paragraph() {
        let segs = segment("para one\n\npara two");
        assert_eq!(contents(&segs), vec![("para one\n\npara two", false)]);
    }

    #[test]
    fn double_blank_line_closes_a_paragraph() {
        let segs = segment("para one\n\n\npara two");
        assert_eq!(
            contents(&segs),
            vec![("para one\n\n\n", true), ("para two", false)]
        );
    }

    #[test]
    fn trailing_blank_line_at_end_of_input_closes() {
        assert_eq!(contents(&segment("para one\n")), vec![("para one\n", true)]);
        assert_eq!(
            contents(&segment("para one\n\n")),
            vec![("para one\n\n", true)]
        );
    }

    #[test]
    fn fence_closed_by_blank_line_is_its_own_segment() {
        let segs = segment("```rs\nfn main() {}\n```\n\nnext");
        assert_eq!(
            contents(&segs),
            vec![("```rs\nfn main() {}\n```\n", true), ("\nnext", false)]
        );
        assert_eq!(segs[0].kind, SegmentKind::Fence);
    }

    #[test]
    fn fence_followed_by_text_keeps_accumulating() {
        let segs = segment("```\na\n```\ntext\n\n\n");
        assert_eq!(contents(&segs), vec![("```\na\n```\ntext\n\n\n", true)]);
        assert_eq!(segs[0].kind, SegmentKind::Block);
    }

    #[test]
    fn blank_lines_inside_a_fence_are_inert() {
        let segs = segment("```\na\n\n\nb\n```");
        assert_eq!(contents(&segs), vec![("```\na\n\n\nb\n```", true)]);
    }

    #[test]
    fn other_marker_family_does_not_close_a_fence() {
        let segs = segment("~~~\n```\nstill code\n\n\n");
        assert_eq!(contents(&segs), vec![("~~~\n```\nstill code\n\n\n", false)]);
        assert_eq!(segs[0].kind, SegmentKind::Fence);
    }

    #[test]
    fn lists_close_like_paragraphs_and_are_tagged() {
        let segs = segment("- a\n- b\n\n\nafter");
        assert_eq!(
            contents(&segs),
            vec![("- a\n- b\n\n\n", true), ("after", false)]
        );
        assert_eq!(segs[0].kind, SegmentKind::List);
        assert_eq!(segs[1].kind, SegmentKind::Block);
    }

    #[test]
    fn whitespace_only_remainder_is_kept_open() {
        let segs = segment("\n\n");
        assert_eq!(contents(&segs), vec![("\n\n", false)]);
    }

    #[test]
    fn recognizes_list_items() {
        assert!(is_list_item("- a"));
        assert!(is_list_item("  * a\n"));
        assert!(is_list_item("12. a"));
        assert!(!is_list_item("-a"));
        assert!(!is_list_item("-\n"));
        assert!(!is_list_item("1) a"));
        assert!(!is_list_item("text"));
    }

    #[test]
    fn hash_matches_content() {
        for s in segment("a\n\n\nb") {
            assert_eq!(s.hash, content_hash(&s.content));
        }
    }
}

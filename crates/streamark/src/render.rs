use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::Line;
use unicode_width::UnicodeWidthChar;

use crate::viewport::ViewportState;

/// Draws a one-column scrollbar for `state` into `area`.
///
/// The column stays blank while all content fits. Otherwise the thumb is at least one row tall
/// and touches the bottom of the track exactly when the view is scrolled to the end.
pub fn render_scrollbar(area: Rect, buf: &mut Buffer, state: &ViewportState, style: Style) {
    buf.set_style(area, style);
    let track = area.height as u64;
    let content = state.content_h as u64;
    let visible = state.viewport_h as u64;
    let fits = content <= visible;

    let (thumb_top, thumb_len) = if fits || track == 0 {
        (0, 0)
    } else {
        let len = (visible * track).div_ceil(content).clamp(1, track);
        let travel = track - len;
        let max_y = content - visible;
        let top = (state.y as u64 * travel + max_y / 2) / max_y;
        (top.min(travel), len)
    };

    for dy in 0..area.height {
        let row = dy as u64;
        let symbol = if row >= thumb_top && row < thumb_top + thumb_len {
            "█"
        } else {
            " "
        };
        if let Some(cell) = buf.cell_mut((area.x, area.y + dy)) {
            cell.set_symbol(symbol);
        }
    }
}

/// Draws `line` at `(x, y)`, skipping `start_col` display columns and clipping to `max_cols`.
///
/// Wide characters that straddle either edge are dropped rather than split.
pub fn render_line_clipped(
    x: u16,
    y: u16,
    start_col: u32,
    max_cols: u16,
    buf: &mut Buffer,
    line: &Line<'_>,
) {
    if max_cols == 0 {
        return;
    }

    let start_col = start_col as usize;
    let max_cols = max_cols as usize;
    let mut col = 0usize;
    let mut out_cols = 0usize;

    for span in &line.spans {
        let style = line.style.patch(span.style);
        for ch in span.content.chars() {
            let w = UnicodeWidthChar::width(ch).unwrap_or(0);
            if w == 0 {
                continue;
            }
            if col < start_col {
                col += w;
                continue;
            }
            if out_cols + w > max_cols {
                return;
            }

            if let Some(cell) = buf.cell_mut((x + out_cols as u16, y)) {
                cell.set_style(style);
                cell.set_symbol(ch.encode_utf8(&mut [0; 4]));
            }
            if w == 2
                && let Some(cell) = buf.cell_mut((x + out_cols as u16 + 1, y))
            {
                cell.set_style(style);
                cell.set_symbol("");
            }
            out_cols += w;
            col += w;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::text::Span;

    fn row(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf[(x, y)].symbol().to_string())
            .collect()
    }

    #[test]
    fn clips_lines_horizontally() {
        let mut buf = Buffer::empty(Rect::new(0, 0, 4, 1));
        let line = Line::from(vec![Span::raw("ab"), Span::raw("cdef")]);
        render_line_clipped(0, 0, 1, 4, &mut buf, &line);
        assert_eq!(row(&buf, 0), "bcde");
    }

    #[test]
    fn wide_chars_do_not_overflow() {
        let mut buf = Buffer::empty(Rect::new(0, 0, 3, 1));
        render_line_clipped(0, 0, 0, 3, &mut buf, &Line::raw("界界"));
        assert_eq!(buf[(0, 0)].symbol(), "界");
        assert_eq!(buf[(2, 0)].symbol(), " ");
    }

    fn column(buf: &Buffer) -> String {
        (0..buf.area.height)
            .map(|y| buf[(0, y)].symbol().to_string())
            .collect()
    }

    #[test]
    fn scrollbar_thumb_tracks_position() {
        let mut state = ViewportState::default();
        state.set_viewport(10, 5);
        state.set_content(10, 50);
        let area = Rect::new(0, 0, 1, 5);

        let mut buf = Buffer::empty(area);
        render_scrollbar(area, &mut buf, &state, Style::default());
        assert_eq!(column(&buf), "█    ");

        state.to_bottom();
        let mut buf = Buffer::empty(area);
        render_scrollbar(area, &mut buf, &state, Style::default());
        assert_eq!(column(&buf), "    █");
    }

    #[test]
    fn scrollbar_is_blank_when_content_fits() {
        let mut state = ViewportState::default();
        state.set_viewport(10, 5);
        state.set_content(10, 3);
        let area = Rect::new(0, 0, 1, 5);
        let mut buf = Buffer::empty(area);
        render_scrollbar(area, &mut buf, &state, Style::default());
        assert_eq!(column(&buf), "     ");
    }
}

//! A scrollable widget that renders a growing Markdown source.
//!
//! [`StreamingMarkdownView`] owns the [`MarkdownSession`], the scroll state and the
//! [`ScrollObserver`] that gates code highlighting. The host appends text as it arrives and
//! calls [`StreamingMarkdownView::render`] every frame.

use crate::render::render_line_clipped;
use crate::render::render_scrollbar;
use crate::viewport::ViewportState;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use std::rc::Rc;
use std::sync::Arc;
use streamark_core::observer::ScrollObserver;
use streamark_core::observer::ViewportObserver;
use streamark_core::viewport::Region;
use streamark_markdown::MarkdownSession;
use streamark_markdown::RenderContext;
use streamark_markdown::RenderPass;
use streamark_markdown::layout::LaidOut;
use streamark_markdown::layout::layout_pass;

pub struct StreamingMarkdownView {
    context: Arc<RenderContext>,
    session: MarkdownSession,
    observer: Rc<ScrollObserver>,
    viewport: ViewportState,
    source: String,
    pass: RenderPass,
    laid: LaidOut,
    /// Width the current layout was computed for.
    width: Option<u16>,
    dirty: bool,
    follow: bool,
}

impl StreamingMarkdownView {
    pub fn new(context: Arc<RenderContext>) -> Self {
        let observer = Rc::new(ScrollObserver::new(Region::rows(0, 0)));
        let dyn_observer: Rc<dyn ViewportObserver> = observer.clone();
        let session = MarkdownSession::new(context.clone(), Some(dyn_observer));
        Self {
            context,
            session,
            observer,
            viewport: ViewportState::default(),
            source: String::new(),
            pass: RenderPass::default(),
            laid: LaidOut::default(),
            width: None,
            dirty: false,
            follow: true,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn push_str(&mut self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }
        self.source.push_str(chunk);
        self.dirty = true;
    }

    /// Replaces the whole source. Anything that is not an extension of the previous source
    /// drops every cached segment.
    pub fn set_source(&mut self, source: impl Into<String>) {
        self.source = source.into();
        self.dirty = true;
    }

    pub fn session(&self) -> &MarkdownSession {
        &self.session
    }

    pub fn last_pass(&self) -> &RenderPass {
        &self.pass
    }

    pub fn viewport(&self) -> &ViewportState {
        &self.viewport
    }

    /// When set (the default), the view sticks to the bottom while content streams in.
    pub fn set_follow(&mut self, follow: bool) {
        self.follow = follow;
    }

    pub fn is_following(&self) -> bool {
        self.follow
    }

    pub fn scroll_by(&mut self, delta: i32) {
        self.viewport.scroll_y_by(delta);
        self.follow = self.at_bottom();
        self.sync_window();
    }

    pub fn page_down(&mut self) {
        self.viewport.page_down();
        self.follow = self.at_bottom();
        self.sync_window();
    }

    pub fn page_up(&mut self) {
        self.viewport.page_up();
        self.follow = false;
        self.sync_window();
    }

    pub fn to_top(&mut self) {
        self.viewport.to_top();
        self.follow = false;
        self.sync_window();
    }

    pub fn to_bottom(&mut self) {
        self.viewport.to_bottom();
        self.follow = true;
        self.sync_window();
    }

    /// Brings the layout up to date for `width` columns and the current source.
    pub fn update(&mut self, width: u16, height: u16) {
        self.viewport.set_viewport(width, height);
        if self.dirty {
            self.pass = self.session.render_incremental(&self.source);
            self.dirty = false;
            self.width = None;
        }
        if self.width != Some(width) {
            self.relayout(width);
        }
        if self.follow {
            self.viewport.to_bottom();
        }
        self.sync_window();
        if self.session.attach_regions(&self.laid.code_regions) {
            self.refresh();
        }
    }

    pub fn render(&mut self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let content_w = area.width.saturating_sub(1);
        self.update(content_w, area.height);

        let top = self.viewport.y as usize;
        for (row, line) in self
            .laid
            .text
            .lines
            .iter()
            .skip(top)
            .take(area.height as usize)
            .enumerate()
        {
            render_line_clipped(
                area.x,
                area.y + row as u16,
                self.viewport.x,
                content_w,
                buf,
                line,
            );
        }

        let bar = Rect::new(area.x + content_w, area.y, 1, area.height);
        render_scrollbar(bar, buf, &self.viewport, self.context.theme.text_muted);
    }

    fn relayout(&mut self, width: u16) {
        self.laid = layout_pass(&self.pass, &self.context, width);
        self.viewport.set_content(width as u32, self.laid.height());
        self.width = Some(width);
    }

    fn refresh(&mut self) {
        self.pass = self.session.refresh();
        if let Some(width) = self.width {
            self.relayout(width);
        }
    }

    /// Pushes the scroll position to the observer; opened gates trigger a refresh.
    fn sync_window(&mut self) {
        let fired = self.observer.set_window(self.viewport.window());
        if fired > 0 || self.session.needs_refresh(&self.pass) {
            tracing::debug!(fired, "code blocks became visible");
            self.refresh();
        }
    }

    fn at_bottom(&self) -> bool {
        let max_y = self
            .viewport
            .content_h
            .saturating_sub(self.viewport.viewport_h as u32);
        self.viewport.y >= max_y
    }
}

//! Simulates an LLM answer arriving a few characters at a time.
//!
//! Keys: `j/k` scroll, `PgUp/PgDn` page, `g/G` top/bottom, `r` restart, `q` quit.
//! Set `RUST_LOG=streamark_markdown=debug` to write logs to `stream.log`.

use crossterm::event::Event;
use crossterm::event::KeyCode;
use crossterm::event::KeyEventKind;
use crossterm::terminal::EnterAlternateScreen;
use crossterm::terminal::LeaveAlternateScreen;
use crossterm::terminal::disable_raw_mode;
use crossterm::terminal::enable_raw_mode;
use ratatui::Terminal;
use ratatui::backend::Backend;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Constraint;
use ratatui::layout::Layout;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::text::Text;
use ratatui::widgets::Block;
use ratatui::widgets::Borders;
use ratatui::widgets::Paragraph;
use serde_json::Value;
use std::io;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use streamark::markdown::RenderContext;
use streamark::markdown::registry::ComponentRegistry;
use streamark::syntax::syntect::SyntectHighlighter;
use streamark::theme::Theme;
use streamark::view::StreamingMarkdownView;
use tracing_subscriber::EnvFilter;

const ANSWER: &str = r#"# Streaming answer

Here is a **short** walkthrough with a table, some code and an embedded component.

| step | cost |
|:-----|-----:|
| parse | 1 |
| highlight | 3 |

```rust
fn main() {
    for i in 0..3 {
        println!("tick {i}");
    }
}
```

```component-json {"placeholder": "weather-loading"}
{"type": "weather", "props": {"city": "Lisbon", "temp": 21}}
```

```echarts
{"series": [{"type": "bar", "data": [3, 7, 4, 9]}]}
```

1. Closed segments are cached.
2. Only the tail is re-parsed.
   - nested item

> Done. Press `r` to stream again.
"#;

const CHUNK: usize = 7;

fn main() -> io::Result<()> {
    init_logging()?;

    let mut stdout = io::stdout();
    enable_raw_mode()?;
    crossterm::execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let res = run(&mut terminal);

    disable_raw_mode()?;
    crossterm::execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    res
}

fn init_logging() -> io::Result<()> {
    if std::env::var_os("RUST_LOG").is_none() {
        return Ok(());
    }
    let file = std::fs::File::create("stream.log")?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
    Ok(())
}

fn context() -> RenderContext {
    let components = ComponentRegistry::new()
        .with("weather", |props: &Value, theme: &Theme| {
            let city = props["city"].as_str().unwrap_or("?");
            let temp = props["temp"].as_i64().unwrap_or_default();
            Text::from(Line::from(vec![
                Span::styled("☀ ", theme.accent),
                Span::styled(format!("{city}: {temp}°C"), theme.text_primary),
            ]))
        })
        .with("weather-loading", |_: &Value, theme: &Theme| {
            Text::from(Span::styled("fetching weather…", theme.placeholder))
        });

    RenderContext::new(Theme::default())
        .with_highlighter(Arc::new(SyntectHighlighter::new()))
        .with_components(components)
        .with_chart_renderer(|option: &Value, theme: &Theme| {
            let data = option["series"][0]["data"]
                .as_array()
                .cloned()
                .unwrap_or_default();
            let lines = data
                .iter()
                .filter_map(Value::as_u64)
                .map(|v| Line::from(Span::styled("▇".repeat(v as usize), theme.accent)))
                .collect::<Vec<_>>();
            Text::from(lines)
        })
}

fn run<B: Backend>(terminal: &mut Terminal<B>) -> io::Result<()> {
    let context = Arc::new(context());
    let mut view = StreamingMarkdownView::new(context);
    let mut sent = 0usize;

    loop {
        if sent < ANSWER.len() {
            let mut end = (sent + CHUNK).min(ANSWER.len());
            while !ANSWER.is_char_boundary(end) {
                end += 1;
            }
            view.push_str(&ANSWER[sent..end]);
            sent = end;
        }

        terminal.draw(|f| {
            let [body, status] =
                Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(f.area());
            let block = Block::default().borders(Borders::ALL).title(" streamark ");
            let inner = block.inner(body);
            f.render_widget(block, body);
            view.render(inner, f.buffer_mut());

            let stats = view.session().cache_stats();
            let line = format!(
                " {}/{} bytes · cache hits {} misses {} · {}",
                sent,
                ANSWER.len(),
                stats.hits,
                stats.misses,
                if view.is_following() { "following" } else { "paused" },
            );
            f.render_widget(Paragraph::new(line), status);
        })?;

        if crossterm::event::poll(Duration::from_millis(30))?
            && let Event::Key(key) = crossterm::event::read()?
        {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Char('j') | KeyCode::Down => view.scroll_by(1),
                KeyCode::Char('k') | KeyCode::Up => view.scroll_by(-1),
                KeyCode::PageDown => view.page_down(),
                KeyCode::PageUp => view.page_up(),
                KeyCode::Char('g') => view.to_top(),
                KeyCode::Char('G') => view.to_bottom(),
                KeyCode::Char('r') => {
                    view.set_source("");
                    view.to_bottom();
                    sent = 0;
                }
                _ => {}
            }
        }
    }
}

use ratatui::style::Modifier;
use ratatui::style::Style;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ThemeMode {
    Light,
    #[default]
    Dark,
}

#[derive(Clone, Debug)]
pub struct Theme {
    pub mode: ThemeMode,
    pub text_primary: Style,
    pub text_muted: Style,
    pub accent: Style,
    pub danger: Style,
    pub heading: Style,
    pub link: Style,
    pub code_inline: Style,
    pub code_block: Style,
    pub placeholder: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    pub fn dark() -> Self {
        use ratatui::style::Stylize;

        Self {
            mode: ThemeMode::Dark,
            text_primary: Style::default(),
            text_muted: Style::default().dark_gray(),
            accent: Style::default().cyan(),
            danger: Style::default().red(),
            heading: Style::default().cyan().add_modifier(Modifier::BOLD),
            link: Style::default().blue().add_modifier(Modifier::UNDERLINED),
            code_inline: Style::default().cyan(),
            code_block: Style::default().gray(),
            placeholder: Style::default().dark_gray().add_modifier(Modifier::ITALIC),
        }
    }

    pub fn light() -> Self {
        use ratatui::style::Stylize;

        Self {
            mode: ThemeMode::Light,
            text_primary: Style::default().black(),
            text_muted: Style::default().gray(),
            accent: Style::default().blue(),
            danger: Style::default().red(),
            heading: Style::default().blue().add_modifier(Modifier::BOLD),
            link: Style::default().blue().add_modifier(Modifier::UNDERLINED),
            code_inline: Style::default().magenta(),
            code_block: Style::default().black(),
            placeholder: Style::default().gray().add_modifier(Modifier::ITALIC),
        }
    }

    pub fn for_mode(mode: ThemeMode) -> Self {
        match mode {
            ThemeMode::Light => Self::light(),
            ThemeMode::Dark => Self::dark(),
        }
    }
}

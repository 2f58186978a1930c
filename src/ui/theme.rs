use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

/// Styles keyed by what devmind prints rather than by color
#[derive(Debug, Clone)]
pub struct Theme {
    pub heading: Style,
    pub label: Style,
    pub success: Style,
    pub failure: Style,
    pub warning: Style,
    pub function: Style,
    pub location: Style,
    pub commit: Style,
    pub date: Style,
    pub muted: Style,
}

impl Theme {
    pub fn new(colored: bool) -> Self {
        let pick = |style: Style| if colored { style } else { Style::new() };
        Self {
            heading: pick(Style::new().cyan().bold()),
            label: pick(Style::new().white().dimmed()),
            success: pick(Style::new().green().bold()),
            failure: pick(Style::new().red().bold()),
            warning: pick(Style::new().yellow().bold()),
            function: pick(Style::new().blue().bold()),
            location: pick(Style::new().bright_black().underline()),
            commit: pick(Style::new().yellow()),
            date: pick(Style::new().magenta()),
            muted: pick(Style::new().bright_black()),
        }
    }

    /// Colored output needs a terminal, no `NO_COLOR`, and console's own color switch
    pub fn detect() -> Self {
        let colored = std::env::var_os("NO_COLOR").is_none()
            && console::Term::stdout().is_term()
            && console::colors_enabled();
        Self::new(colored)
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}

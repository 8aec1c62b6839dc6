use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

/// Styles for the handful of roles the progress output uses.
#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub error: Style,
    pub warn: Style,
    pub dim: Style,
    pub command: Style,
}

impl Theme {
    /// `color == false` yields unstyled output, e.g. when piped into a log.
    pub fn new(color: bool) -> Self {
        let pick = |styled: Style| if color { styled } else { Style::new() };
        Self {
            header: pick(Style::new().cyan().bold()),
            success: pick(Style::new().green().bold()),
            error: pick(Style::new().red().bold()),
            warn: pick(Style::new().yellow().bold()),
            dim: pick(Style::new().dimmed()),
            command: pick(Style::new().bold()),
        }
    }
}

/// Colored only when stdout is an interactive terminal.
pub fn theme() -> &'static Theme {
    THEME.get_or_init(|| Theme::new(console::Term::stdout().is_term()))
}

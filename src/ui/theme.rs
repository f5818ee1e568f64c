use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

/// Terminal styles. `colored` is false when every style is a no-op.
#[derive(Debug, Clone)]
pub struct Theme {
    pub colored: bool,
    pub header: Style,
    pub success: Style,
    pub error: Style,
    pub warn: Style,
    pub info: Style,
    pub dim: Style,
    pub muted: Style,
}

impl Theme {
    /// Colors only when stdout is a terminal and `NO_COLOR` is unset
    pub fn detect() -> Self {
        let no_color = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
        Self::new(!no_color && console::Term::stdout().is_term())
    }

    pub fn new(colored: bool) -> Self {
        let pick = |style: Style| if colored { style } else { Style::new() };
        Self {
            colored,
            header: pick(Style::new().blue().bold()),
            success: pick(Style::new().green().bold()),
            error: pick(Style::new().red().bold()),
            warn: pick(Style::new().yellow()),
            info: pick(Style::new().cyan()),
            dim: pick(Style::new().dimmed()),
            muted: pick(Style::new().bright_black()),
        }
    }

    /// Full marks in `success`, partial credit in `warn`, nothing in `error`
    pub fn grade(&self, grade: f64, points: i64) -> Style {
        if grade >= points as f64 {
            self.success
        } else if grade > 0.0 {
            self.warn
        } else {
            self.error
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use owo_colors::OwoColorize;

    #[test]
    fn test_plain_theme_adds_no_escapes() {
        let plain = Theme::new(false);
        assert!(!plain.colored);
        assert_eq!("7.50".style(plain.grade(7.5, 10)).to_string(), "7.50");
    }

    #[test]
    fn test_grade_styles_by_credit() {
        let colored = Theme::new(true);
        let full = "x".style(colored.grade(10.0, 10)).to_string();
        let partial = "x".style(colored.grade(4.0, 10)).to_string();
        let none = "x".style(colored.grade(0.0, 10)).to_string();

        assert_eq!(full, "x".style(colored.success).to_string());
        assert_eq!(partial, "x".style(colored.warn).to_string());
        assert_eq!(none, "x".style(colored.error).to_string());
        assert_ne!(full, partial);
    }
}

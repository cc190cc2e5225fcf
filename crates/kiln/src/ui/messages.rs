//! Status message functions for terminal output.

use super::paint;
use owo_colors::Style;

/// Print a success message to stderr.
pub fn success(message: &str) {
    eprintln!("{} {}", paint("✓", Style::new().green().bold()), message);
}

/// Print an info message to stderr.
pub fn info(message: &str) {
    eprintln!("{} {}", paint("ℹ", Style::new().blue().bold()), message);
}

/// Print a warning message to stderr.
///
/// ```no_run
/// use kiln::ui::warning;
///
/// warning("Port 3000 is busy, using port 3001 instead");
/// ```
pub fn warning(message: &str) {
    let style = Style::new().yellow();
    eprintln!("{} {}", paint("⚠", style.bold()), paint(message, style));
}

/// Print an error message to stderr.
pub fn error(message: &str) {
    let style = Style::new().red();
    eprintln!("{} {}", paint("✗", style.bold()), paint(message, style));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_messages() {
        // These should not panic
        success("Success message");
        info("Info message");
        warning("Warning message");
        error("Error message");
    }

    #[test]
    fn test_paint_without_colors() {
        super::super::init_colors(true);
        assert_eq!(paint("plain", Style::new().red()), "plain");
    }
}

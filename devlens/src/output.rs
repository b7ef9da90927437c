use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};

use console::style;

static VERBOSE: AtomicBool = AtomicBool::new(false);

pub fn brand_accent<D: Display>(value: D) -> console::StyledObject<D> {
    style(value).cyan()
}

pub fn brand_muted<D: Display>(value: D) -> console::StyledObject<D> {
    style(value).dim()
}

pub fn brand_success<D: Display>(value: D) -> console::StyledObject<D> {
    style(value).green()
}

pub fn brand_warning<D: Display>(value: D) -> console::StyledObject<D> {
    style(value).yellow()
}

pub fn brand_error<D: Display>(value: D) -> console::StyledObject<D> {
    style(value).red()
}

/// Applies a named color from config. Unknown names render unstyled.
pub fn named_color<D: Display>(value: D, color: Option<&str>) -> console::StyledObject<D> {
    let styled = style(value);
    match color.map(|c| c.trim().to_ascii_lowercase()).as_deref() {
        Some("black") => styled.black(),
        Some("red") => styled.red(),
        Some("green") => styled.green(),
        Some("yellow") => styled.yellow(),
        Some("blue") => styled.blue(),
        Some("magenta") => styled.magenta(),
        Some("cyan") => styled.cyan(),
        Some("white") => styled.white(),
        _ => styled,
    }
}

pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

pub fn step(message: &str) {
    println!("{} {}", brand_accent("•").bold(), message);
}

pub fn success(message: &str) {
    println!("{} {}", brand_success("✓").bold(), message);
}

pub fn warning(message: &str) {
    println!("{} {}", brand_warning("!").bold(), message);
}

pub fn error_stderr(message: &str) {
    eprintln!("{} {}", brand_error("✗").bold(), message);
}

pub fn muted(message: &str) {
    println!("{}", brand_muted(message));
}

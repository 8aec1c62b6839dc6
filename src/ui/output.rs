use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;

const RULE_WIDTH: usize = 50;

pub fn banner(text: &str) {
    println!("{} {}", Icons::BONE, text.style(theme().header.clone()));
}

/// Numbered stage heading.
pub fn step(number: usize, title: &str) {
    let rule = "━".repeat(RULE_WIDTH);
    println!();
    println!("{}", rule.style(theme().dim.clone()));
    println!("{}", format!("Step {}: {}", number, title).style(theme().header.clone()));
    println!("{}", rule.style(theme().dim.clone()));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().error.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{}  {}", Icons::WARN, label.style(theme().warn.clone()));
}

/// Indented progress line under the current step.
pub fn item(icon: &str, text: &str) {
    println!("  {} {}", icon, text);
}

pub fn added(title: &str) {
    item(Icons::CHECK, &format!("Added: {}", title));
}

pub fn skipped(title: &str) {
    item(Icons::SKIP, &format!("Exists: {}", title.style(theme().dim.clone())));
}

pub fn command(text: &str) -> String {
    text.style(theme().command.clone()).to_string()
}

pub fn dim(text: &str) -> String {
    text.style(theme().dim.clone()).to_string()
}

pub fn summary_row(label: &str, value: &str) {
    println!("  {} {}", label.style(theme().dim.clone()), value);
}

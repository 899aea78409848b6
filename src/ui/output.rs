use crate::domain::DomainInfo;
use crate::ui::{Icons, theme};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::BULB, text.style(theme().header.clone()));
}

pub fn status(icon: &str, label: &str, value: &str) {
    println!("{} {}: {}", icon, label.style(theme().dim.clone()), value);
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().error.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn.clone()));
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().header.clone()));
}

pub fn dim(text: &str) -> String {
    text.style(theme().dim.clone()).to_string()
}

pub fn muted(text: &str) -> String {
    text.style(theme().muted.clone()).to_string()
}

/// Icon and display name in the domain's own color
pub fn domain_label(info: &DomainInfo) -> String {
    format!("{} {}", info.icon, info.name.style(theme().domain(info.color)))
}

pub fn summary_row(label: &str, value: &str) {
    println!("  {} {}", label.style(theme().dim.clone()), value);
}

/// Setup-check line that passed
pub fn check_pass(label: &str) {
    println!("{} {}", Icons::CHECK, label);
}

/// Setup-check line that failed, with how to fix it
pub fn check_fail(label: &str, fix: &str) {
    println!("{} {}", Icons::CROSS, label.style(theme().error.clone()));
    for line in fix.lines() {
        println!("   {}", line.style(theme().muted.clone()));
    }
}

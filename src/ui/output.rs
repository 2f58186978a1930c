use crate::model::{CommitRecord, FunctionRecord, IndexWarning};
use crate::ui::{Icons, theme};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::ROCKET, text.style(theme().heading));
}

pub fn status(icon: &str, label: &str, value: &str) {
    println!("{} {}: {}", icon, label.style(theme().label), value);
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().failure));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warning));
}

pub fn info(label: &str, value: &str) {
    println!(
        "{} {}: {}",
        Icons::INFO.style(theme().heading),
        label.style(theme().label),
        value
    );
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().heading));
}

pub fn dim(text: &str) -> String {
    text.style(theme().label).to_string()
}

pub fn muted(text: &str) -> String {
    text.style(theme().muted).to_string()
}

pub fn timing(elapsed: &str) {
    println!("{} {}", Icons::CLOCK.style(theme().muted), elapsed);
}

/// One search hit: `name(args)  file:start-end` plus the docstring's first line
pub fn function_hit(func: &FunctionRecord) {
    println!(
        "{} {}({})  {}",
        Icons::FUNCTION,
        func.name.style(theme().function),
        func.args.join(", "),
        format!("{}:{}-{}", func.file, func.line_start, func.line_end).style(theme().location)
    );
    if let Some(first) = func.docstring.lines().next() {
        println!("    {}", dim(first));
    }
}

pub fn related_file(path: &str) {
    println!("  {} {}", Icons::LINK.style(theme().muted), path);
}

pub fn commit_line(commit: &CommitRecord) {
    let short = commit.hash.get(..8).unwrap_or(&commit.hash);
    let day = commit.date.get(..10).unwrap_or(&commit.date);
    let subject = commit.message.lines().next().unwrap_or("");
    println!(
        "{} {} {} {}  {}",
        Icons::COMMIT,
        short.style(theme().commit),
        day.style(theme().date),
        subject,
        muted(&format!("{} {}", Icons::PERSON, commit.author))
    );
}

pub fn index_warning(warning: &IndexWarning) {
    eprintln!(
        "  {} {} {}",
        Icons::WARN.style(theme().warning),
        warning.path,
        muted(&warning.message)
    );
}

pub fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_bytes() {
        assert_eq!(human_bytes(0), "0 B");
        assert_eq!(human_bytes(1023), "1023 B");
        assert_eq!(human_bytes(1536), "1.5 KB");
        assert_eq!(human_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}

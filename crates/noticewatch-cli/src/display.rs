//! Terminal rendering for `noticewatch status`.

use noticewatch_core::SeenEntry;
use noticewatch_core::message::strip_markup;

const TITLE_WIDTH: usize = 60;

// ── Public API ──

/// Print the store summary followed by the given entries, newest first.
pub fn print_status(count: usize, entries: &[SeenEntry]) {
    println!("=== noticewatch ===");
    println!("  {:<12} {}", "tracked", count);
    println!();

    if entries.is_empty() {
        return;
    }
    println!("Most recent");
    for entry in entries {
        print!("{}", entry_card(entry));
    }
    if count > entries.len() {
        println!("  ... and {} more", count - entries.len());
    }
}

// ── Card rendering ──

fn entry_card(entry: &SeenEntry) -> String {
    let mut out = format!("  {:<12} {}\n", entry.id, short_title(&entry.title));
    let meta: Vec<&str> = [
        entry.category.as_str(),
        entry.priority.as_str(),
        entry.company.as_str(),
    ]
    .into_iter()
    .filter(|s| !s.is_empty())
    .collect();
    if !meta.is_empty() {
        out.push_str(&format!("  {:<12} {}\n", "", meta.join(" · ")));
    }
    out.push_str(&format!(
        "  {:<12} first {}  last {}\n",
        "",
        entry.first_seen.format("%Y-%m-%d %H:%M"),
        entry.last_seen.format("%Y-%m-%d %H:%M"),
    ));
    out
}

fn short_title(title: &str) -> String {
    let clean = strip_markup(title);
    if clean.chars().count() > TITLE_WIDTH {
        let head: String = clean.chars().take(TITLE_WIDTH - 3).collect();
        format!("{head}...")
    } else {
        clean
    }
}

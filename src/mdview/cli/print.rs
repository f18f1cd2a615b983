use chrono::{DateTime, Utc};
use colored::Colorize;
use mdview::commands::{CmdMessage, MessageLevel};
use mdview::model::RecentEntry;
use mdview::render::TocEntry;
use timeago::Formatter;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const LINE_WIDTH: usize = 100;
const TIME_WIDTH: usize = 14;
const KIND_WIDTH: usize = 8;

fn styled(message: &CmdMessage) -> colored::ColoredString {
    match message.level {
        MessageLevel::Info => message.content.dimmed(),
        MessageLevel::Success => message.content.green(),
        MessageLevel::Warning => message.content.yellow(),
        MessageLevel::Error => message.content.red(),
    }
}

pub(super) fn print_messages(messages: &[CmdMessage]) {
    for message in messages {
        println!("{}", styled(message));
    }
}

/// Status lines for commands whose stdout is the document itself.
pub(super) fn print_status(messages: &[CmdMessage]) {
    for message in messages {
        eprintln!("{}", styled(message));
    }
}

pub(super) fn print_recent(entries: &[RecentEntry]) {
    for (i, entry) in entries.iter().enumerate() {
        let idx_str = format!("{:>3}. ", i + 1);
        let kind = format!("{:<width$}", entry.kind.as_str(), width = KIND_WIDTH);
        let time_ago = format_time_ago(entry.timestamp);

        let fixed_width = idx_str.width() + KIND_WIDTH + TIME_WIDTH;
        let available = LINE_WIDTH.saturating_sub(fixed_width);
        let title = truncate_to_width(&entry.title, available);
        let padding = available.saturating_sub(title.width());

        println!(
            "{}{}{}{}{}",
            idx_str.yellow(),
            kind.cyan(),
            title,
            " ".repeat(padding),
            time_ago.dimmed()
        );
        println!(
            "{}{}",
            " ".repeat(idx_str.width() + KIND_WIDTH),
            entry.subtitle.dimmed()
        );
    }
}

pub(super) fn print_toc(toc: &[TocEntry]) {
    if toc.is_empty() {
        println!("{}", "(no H1-H3 headings)".dimmed());
        return;
    }
    for entry in toc {
        let indent = "  ".repeat(usize::from(entry.level.saturating_sub(1)));
        println!("{}{}  {}", indent, entry.text, format!("#{}", entry.id).dimmed());
    }
}

/// Text the clipboard would not take, framed so it can be selected by hand.
pub(super) fn print_manual_copy(text: &str) {
    println!("{}", "-----8<-----".dimmed());
    print!("{}", text);
    if !text.ends_with('\n') {
        println!();
    }
    println!("{}", "----->8-----".dimmed());
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    let mut result = String::new();
    let mut current_width = 0;

    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > max_width.saturating_sub(1) {
            result.push('…');
            return result;
        }
        result.push(c);
        current_width += char_width;
    }

    result
}

fn format_time_ago(timestamp: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(timestamp);
    let formatter = Formatter::new();
    let time_str = formatter.convert(duration.to_std().unwrap_or_default());
    format!("{:>width$}", time_str, width = TIME_WIDTH)
}

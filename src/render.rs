use chrono::Local;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use crossterm::style::Stylize;

use crate::models::Task;

const BAR_WIDTH: usize = 40;

/// Which rows `print_tasks` shows. Statistics always cover every task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListFilter {
    #[default]
    All,
    Done,
    Undone,
}

impl ListFilter {
    pub fn keeps(self, task: &Task) -> bool {
        match self {
            ListFilter::All => true,
            ListFilter::Done => task.done,
            ListFilter::Undone => !task.done,
        }
    }
}

/// Share of done tasks, 0.0 to 100.0. An empty list counts as 0%.
pub fn progress_percent(done: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    done as f64 / total as f64 * 100.0
}

/// Number of filled cells in a bar `width` cells wide.
pub fn filled_cells(progress: f64, width: usize) -> usize {
    ((width as f64 * progress / 100.0).round() as usize).min(width)
}

pub fn status_label(progress: f64) -> &'static str {
    if progress >= 100.0 {
        "✓ Complete"
    } else if progress >= 75.0 {
        "◐ Nearly done"
    } else if progress >= 50.0 {
        "◑ Halfway"
    } else if progress >= 25.0 {
        "◒ In progress"
    } else {
        "◓ Just started"
    }
}

/// Formats `created_at` for display as `Jan 02 15:04` in the local zone.
///
/// Unparseable values are cut at the first `.` and to 16 characters.
pub fn format_created(task: &Task) -> String {
    if task.created_at.is_empty() {
        return "Unknown".to_string();
    }
    match task.created_time() {
        Some(ts) => ts.with_timezone(&Local).format("%b %d %H:%M").to_string(),
        None => {
            let head = task.created_at.split('.').next().unwrap_or_default();
            head.chars().take(16).collect()
        }
    }
}

fn progress_bar(progress: f64) -> String {
    let filled = filled_cells(progress, BAR_WIDTH);
    let mut bar = String::from("  ");
    bar.push_str(&"█".repeat(filled).green().to_string());
    bar.push_str(&"░".repeat(BAR_WIDTH - filled).dim().to_string());
    bar.push_str(&format!(" {:5.1}%", progress));
    bar
}

fn task_table(tasks: &[Task], filter: ListFilter) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("").add_attribute(Attribute::Bold),
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Task").add_attribute(Attribute::Bold),
            Cell::new("Created").add_attribute(Attribute::Bold),
        ]);

    for t in tasks.iter().filter(|t| filter.keeps(t)) {
        let (icon, color) = if t.done {
            ("[✓]", Color::Green)
        } else {
            ("[ ]", Color::Reset)
        };
        table.add_row(vec![
            Cell::new(icon).fg(color),
            Cell::new(t.id).fg(color),
            Cell::new(&t.content),
            Cell::new(format_created(t)).fg(Color::Cyan),
        ]);
    }
    table
}

/// Prints a header, progress bar, the (filtered) task table and a summary.
pub fn print_tasks(title: &str, tasks: &[Task], filter: ListFilter) {
    let total = tasks.len();
    let done = tasks.iter().filter(|t| t.done).count();
    let progress = progress_percent(done, total);

    println!();
    println!(
        "  {}  {}",
        title.blue().bold(),
        format!("{total} total, {done} done").dim()
    );
    println!();
    println!("{}", progress_bar(progress));
    println!();
    println!("{}", task_table(tasks, filter));
    println!();
    println!(
        "  {}{}  {}",
        "Status: ".bold(),
        status_label(progress),
        format!("({done}/{total})").dim()
    );
}

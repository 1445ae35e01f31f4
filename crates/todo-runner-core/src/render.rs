use std::io::{self, IsTerminal, Stdout, Write};

use chrono::NaiveDate;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::short_due_label;
use crate::filter::Filter;
use crate::store::Stats;
use crate::task::{Priority, Task};

/// Terminal output for the CLI. The theme flag picks between the bright
/// and the plain ANSI palette.
#[derive(Debug)]
pub struct Renderer<W: Write> {
    out: W,
    color: bool,
    dark: bool,
}

impl Renderer<Stdout> {
    pub fn stdout(cfg: &Config, dark: bool) -> Self {
        let color = cfg.color_enabled() && io::stdout().is_terminal();
        Self {
            out: io::stdout(),
            color,
            dark,
        }
    }
}

impl<W: Write> Renderer<W> {
    pub fn with_writer(cfg: &Config, dark: bool, out: W) -> Self {
        Self {
            out,
            color: cfg.color_enabled(),
            dark,
        }
    }

    pub fn set_dark(&mut self, dark: bool) {
        self.dark = dark;
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn line(&mut self, text: &str) -> anyhow::Result<()> {
        writeln!(self.out, "{text}")?;
        Ok(())
    }

    /// Rows carry the task's 1-based position in the full list so the
    /// number can be used as a reference in later commands.
    #[tracing::instrument(skip(self, rows, today), fields(rows = rows.len()))]
    pub fn print_task_table(
        &mut self,
        rows: &[(usize, &Task)],
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let headers = vec![
            "#".to_string(),
            "ID".to_string(),
            "Pri".to_string(),
            "Due".to_string(),
            "Task".to_string(),
        ];

        let mut cells = Vec::with_capacity(rows.len());
        for (position, task) in rows {
            let number = self.paint(&position.to_string(), "33", "93");
            let id = task.id.as_str().chars().take(8).collect::<String>();
            let priority = self.paint_priority(task.priority);

            let due = task.due_date.map(short_due_label).unwrap_or_default();
            let due = if task.is_overdue(today) {
                self.paint(&due, "31", "91")
            } else {
                due
            };

            let text = if task.completed {
                format!("[x] {}", self.paint(&task.text, "2", "90"))
            } else {
                format!("[ ] {}", task.text)
            };

            cells.push(vec![number, id, priority, due, text]);
        }

        write_table(&mut self.out, headers, cells)?;
        Ok(())
    }

    pub fn print_empty(&mut self, filter: Filter) -> anyhow::Result<()> {
        let hint = match filter {
            Filter::Completed => "Complete some tasks to see them here",
            _ => "Add your first task with `todo add <text>`",
        };
        writeln!(self.out, "{}", filter.empty_message())?;
        writeln!(self.out, "{hint}")?;
        Ok(())
    }

    pub fn print_stats(&mut self, stats: Stats, overdue: usize) -> anyhow::Result<()> {
        let rate = self.paint(&format!("{}%", stats.completion_rate()), "32", "92");
        write!(
            self.out,
            "{} total, {} active, {} completed ({rate} done)",
            stats.total, stats.active, stats.completed
        )?;
        if overdue > 0 {
            let overdue = self.paint(&format!("{overdue} overdue"), "31", "91");
            write!(self.out, ", {overdue}")?;
        }
        writeln!(self.out)?;
        Ok(())
    }

    pub fn print_celebration(&mut self, stats: Stats) -> anyhow::Result<()> {
        let banner = self.paint("Nice work!", "1;35", "1;95");
        writeln!(
            self.out,
            "{banner} {} of {} tasks done ({}%).",
            stats.completed,
            stats.total,
            stats.completion_rate()
        )?;
        Ok(())
    }

    fn paint_priority(&self, priority: Priority) -> String {
        let (light, dark) = match priority {
            Priority::High => ("31", "91"),
            Priority::Medium => ("33", "93"),
            Priority::Low => ("34", "94"),
        };
        self.paint(priority.as_str(), light, dark)
    }

    fn paint(&self, text: &str, light: &str, dark: &str) -> String {
        if !self.color || text.is_empty() {
            return text.to_string();
        }
        let code = if self.dark { dark } else { light };
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths: Vec<usize> = headers
        .iter()
        .map(|h| UnicodeWidthStr::width(h.as_str()))
        .collect();

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    let write_row = |writer: &mut W, row: &[String]| -> io::Result<()> {
        for (idx, cell) in row.iter().enumerate() {
            if idx + 1 == column_count {
                write!(writer, "{cell}")?;
            } else {
                let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
                let padding = widths[idx].saturating_sub(visible_width);
                write!(writer, "{}{}  ", cell, " ".repeat(padding))?;
            }
        }
        writeln!(writer)
    };

    write_row(&mut writer, headers.as_slice())?;
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    write_row(&mut writer, rule.as_slice())?;
    for row in &rows {
        write_row(&mut writer, row.as_slice())?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{Renderer, strip_ansi};
    use crate::config::Config;
    use crate::filter::Filter;
    use crate::store::Stats;
    use crate::task::{Priority, Task, TaskId};

    fn plain() -> Renderer<Vec<u8>> {
        let mut cfg = Config::default();
        cfg.apply_overrides([("color".to_string(), "off".to_string())]);
        Renderer::with_writer(&cfg, true, Vec::new())
    }

    fn output(renderer: Renderer<Vec<u8>>) -> String {
        String::from_utf8(renderer.into_inner()).expect("utf8")
    }

    #[test]
    fn table_aligns_columns_and_marks_completion() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).expect("date");
        let open = Task::new(
            TaskId::from("0123456789abcdef"),
            "Write report".to_string(),
            Priority::High,
            NaiveDate::from_ymd_opt(2026, 10, 20),
            0,
        );
        let mut done = Task::new(
            TaskId::from("fed"),
            "Email Sam".to_string(),
            Priority::Low,
            None,
            0,
        );
        done.completed = true;

        let mut renderer = plain();
        renderer
            .print_task_table(&[(1, &open), (2, &done)], today)
            .expect("table");
        let text = output(renderer);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "#  ID        Pri   Due     Task");
        assert_eq!(lines[1], "-  --------  ----  ------  ----------------");
        assert_eq!(lines[2], "1  01234567  high  Oct 20  [ ] Write report");
        assert_eq!(lines[3], "2  fed       low           [x] Email Sam");
    }

    #[test]
    fn stats_line_reports_rate_and_overdue() {
        let mut renderer = plain();
        renderer
            .print_stats(
                Stats {
                    total: 3,
                    active: 2,
                    completed: 1,
                },
                1,
            )
            .expect("stats");
        assert_eq!(output(renderer), "3 total, 2 active, 1 completed (33% done), 1 overdue\n");
    }

    #[test]
    fn empty_completed_view_has_its_own_message() {
        let mut renderer = plain();
        renderer.print_empty(Filter::Completed).expect("empty");
        assert!(output(renderer).starts_with("No completed tasks yet\n"));
    }

    #[test]
    fn color_setting_follows_config_booleans() {
        let painted = |value: &str| {
            let mut cfg = Config::default();
            cfg.apply_overrides([("color".to_string(), value.to_string())]);
            let mut renderer = Renderer::with_writer(&cfg, true, Vec::new());
            renderer.print_celebration(Stats::default()).expect("celebrate");
            output(renderer).contains('\x1b')
        };
        assert!(painted("y"));
        assert!(painted("on"));
        assert!(!painted("no"));
        assert!(!painted("off"));
    }

    #[test]
    fn colored_output_uses_theme_palette() {
        let cfg = Config::default();
        let mut renderer = Renderer::with_writer(&cfg, false, Vec::new());
        renderer.print_celebration(Stats::default()).expect("celebrate");
        let text = output(renderer);
        assert!(text.contains("\x1b[1;35m"));
        assert_eq!(strip_ansi(&text), "Nice work! 0 of 0 tasks done (0%).\n");
    }
}

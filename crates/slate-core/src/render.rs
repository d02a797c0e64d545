use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::format_project_date;
use crate::deadline::{Urgency, classify};
use crate::task::Task;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    #[tracing::instrument(skip(self, tasks, now))]
    pub fn print_task_table(&mut self, tasks: &[Task], now: DateTime<Utc>) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = ["ID", "Title", "Status", "Due", "Urgency", "Tags"];
        let mut rows = Vec::with_capacity(tasks.len());

        for task in tasks {
            let id = self.paint(short_id(&task.id), "33");

            let due = task.deadline.map(format_project_date).unwrap_or_default();

            let urgency = classify(task, now);
            let urgency_cell = match urgency {
                Urgency::Overdue => self.paint(urgency.label(), "31"),
                Urgency::Today => self.paint(urgency.label(), "33"),
                Urgency::Soon => self.paint(urgency.label(), "36"),
                Urgency::Normal | Urgency::None => String::new(),
            };

            let tags = task
                .tags
                .iter()
                .map(|tag| format!("+{}", tag.name()))
                .collect::<Vec<_>>()
                .join(" ");

            rows.push(vec![
                id,
                task.title.clone(),
                task.status.name().to_string(),
                due,
                urgency_cell,
                tags,
            ]);
        }

        write_table(&mut out, &headers, &rows)?;
        writeln!(out)?;
        writeln!(out, "{} task(s)", tasks.len())?;
        Ok(())
    }

    #[tracing::instrument(skip(self, task, now))]
    pub fn print_task_info(&mut self, task: &Task, now: DateTime<Utc>) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "id          {}", task.id)?;
        writeln!(out, "title       {}", task.title)?;
        if let Some(description) = &task.description {
            writeln!(out, "description {description}")?;
        }
        writeln!(out, "status      {}", task.status.name())?;
        writeln!(out, "created     {}", format_stamp(task.created_at))?;
        writeln!(out, "updated     {}", format_stamp(task.updated_at))?;
        if let Some(deadline) = task.deadline {
            writeln!(out, "deadline    {}", format_stamp(deadline))?;
            let urgency = classify(task, now);
            if urgency != Urgency::None && urgency != Urgency::Normal {
                writeln!(out, "urgency     {}", urgency.label())?;
            }
        }
        if !task.tags.is_empty() {
            let tags = task
                .tags
                .iter()
                .map(|tag| tag.name())
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(out, "tags        {tags}")?;
        }

        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn format_stamp(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn write_table<W: Write>(mut writer: W, headers: &[&str], rows: &[Vec<String>]) -> anyhow::Result<()> {
    let mut widths: Vec<usize> = headers
        .iter()
        .map(|header| UnicodeWidthStr::width(*header))
        .collect();

    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(visible_width(cell));
        }
    }

    for (idx, header) in headers.iter().enumerate() {
        write!(writer, "{:width$} ", header, width = widths[idx])?;
    }
    writeln!(writer)?;
    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            let padding = widths[idx].saturating_sub(visible_width(cell));
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn visible_width(cell: &str) -> usize {
    UnicodeWidthStr::width(strip_ansi(cell).as_str())
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

use std::io::{self, IsTerminal, Write};

use chrono::Datelike;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::datetime::first_day_of_month;
use crate::event::{CalendarEvent, EventRecord};
use crate::grid::DAYS_PER_WEEK;
use crate::lanes::LaneMap;
use crate::layout::{CalendarLayout, EventPlacement, LayoutStatus};
use crate::presentation::LaneCapacity;
use crate::span::{HEADER_ROW, RowSegment};
use crate::view::{ViewMode, ViewWindow};

const WEEKDAY_HEADERS: [&str; DAYS_PER_WEEK] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> Self {
        Self {
            color: cfg.display.color,
        }
    }

    #[tracing::instrument(skip(self, layout))]
    pub fn print_grid(&self, layout: &CalendarLayout) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_grid(&mut out, layout)
    }

    /// Monday-first calendar; days outside the month are dimmed and days
    /// with a placed event are marked.
    pub fn write_grid<W: Write>(&self, mut out: W, layout: &CalendarLayout) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint(&window_title(&layout.window), "1"))?;

        if let Some(message) = status_message(layout.status) {
            writeln!(out, "{}", self.paint(&message, "33"))?;
            return Ok(());
        }

        let header: Vec<String> = WEEKDAY_HEADERS.iter().map(|day| format!("{day:>4}")).collect();
        writeln!(out, "{}", header.join(""))?;

        let busy = busy_days(layout);
        for (week_idx, week) in layout.cells.chunks(DAYS_PER_WEEK).enumerate() {
            let row = HEADER_ROW + 1 + week_idx as u32;
            let mut line = String::new();
            for (col_idx, cell) in week.iter().enumerate() {
                let column = col_idx as u32 + 1;
                let marker = if busy.contains(&(row, column)) { "*" } else { " " };
                let day = format!("{:>3}{marker}", cell.date.day());
                if cell.is_current_month {
                    line.push_str(&day);
                } else {
                    line.push_str(&self.paint(&day, "2"));
                }
            }
            writeln!(out, "{}", line.trim_end())?;
        }

        Ok(())
    }

    #[tracing::instrument(skip(self, layout, capacity))]
    pub fn print_layout(&self, layout: &CalendarLayout, capacity: &LaneCapacity) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_layout(&mut out, layout, capacity)
    }

    pub fn write_layout<W: Write>(
        &self,
        mut out: W,
        layout: &CalendarLayout,
        capacity: &LaneCapacity,
    ) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint(&window_title(&layout.window), "1"))?;

        if let Some(message) = status_message(layout.status) {
            writeln!(out, "{}", self.paint(&message, "33"))?;
            return Ok(());
        }

        if layout.placements.is_empty() {
            writeln!(out, "No events.")?;
            return Ok(());
        }

        let headers = vec![
            "ID".to_string(),
            "Name".to_string(),
            "Lane".to_string(),
            "Rows".to_string(),
            "Segments".to_string(),
            "Offset".to_string(),
            "Visible".to_string(),
        ];

        let rows = layout
            .placements
            .iter()
            .map(|placement| self.placement_row(placement, capacity))
            .collect();

        write_table(&mut out, headers, rows)?;
        writeln!(
            out,
            "{} lanes fit per row ({}px each)",
            capacity.max_visible_lanes, capacity.event_height
        )?;
        Ok(())
    }

    fn placement_row(&self, placement: &EventPlacement, capacity: &LaneCapacity) -> Vec<String> {
        let display = &placement.display;
        let visible = if capacity.is_visible(display.lane) {
            "yes".to_string()
        } else {
            self.paint("hidden", "31")
        };

        vec![
            self.paint(&placement.event_id.to_string(), "33"),
            display.label.clone(),
            display.lane.to_string(),
            format!("{}-{}", display.start_row, display.end_row),
            placement
                .segments
                .iter()
                .map(format_segment)
                .collect::<Vec<_>>()
                .join(" "),
            format!("{}", capacity.top_offset(display.lane)),
            visible,
        ]
    }

    #[tracing::instrument(skip(self, lanes, events))]
    pub fn print_lanes(&self, lanes: &LaneMap, events: &[CalendarEvent]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "ID".to_string(),
            "Name".to_string(),
            "Start".to_string(),
            "End".to_string(),
            "Lane".to_string(),
        ];

        let rows = events
            .iter()
            .filter_map(|event| {
                let lane = lanes.get(&event.id)?;
                Some(vec![
                    self.paint(&event.id.to_string(), "33"),
                    event.name.clone(),
                    event.start.format("%Y-%m-%d %H:%M").to_string(),
                    event.end.format("%Y-%m-%d %H:%M").to_string(),
                    lane.to_string(),
                ])
            })
            .collect();

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    pub fn print_window(&self, window: &ViewWindow) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(
            out,
            "year={} month={} view={} week={}",
            window.year,
            window.month_index + 1,
            window.view,
            window.week_index
        )?;
        Ok(())
    }

    #[tracing::instrument(skip(self, record, placement), fields(id = record.id))]
    pub fn print_event_details(
        &self,
        record: &EventRecord,
        placement: Option<&EventPlacement>,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "id        {}", record.id)?;
        writeln!(out, "name      {}", record.name)?;
        writeln!(out, "date      {}", record.date)?;
        if let Some(end) = &record.end_date {
            writeln!(out, "end       {end}")?;
        }
        writeln!(out, "type      {}", record.kind)?;
        writeln!(out, "seats     {}", record.max_participants)?;
        match record.coordinates() {
            Some((lat, lon)) => writeln!(out, "location  {lat}, {lon}")?,
            None => writeln!(out, "location  -")?,
        }
        writeln!(
            out,
            "employee  {}",
            record
                .employee_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string())
        )?;

        match placement {
            Some(placement) => {
                let display = &placement.display;
                writeln!(out, "lane      {}", display.lane)?;
                writeln!(
                    out,
                    "rows      {}-{} ({} weeks)",
                    display.start_row,
                    display.end_row,
                    display.row_count()
                )?;
                writeln!(
                    out,
                    "segments  {}",
                    placement
                        .segments
                        .iter()
                        .map(format_segment)
                        .collect::<Vec<_>>()
                        .join(" ")
                )?;
            }
            None => writeln!(out, "{}", self.paint("not placed in this view", "2"))?,
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

/// Placeholder text for views without cells.
pub fn status_message(status: LayoutStatus) -> Option<String> {
    match status {
        LayoutStatus::Ready => None,
        LayoutStatus::WeekNotFound { week_index } => {
            Some(format!("Week data not available (week {week_index})"))
        }
        LayoutStatus::Unsupported { view } => Some(format!("{view} view is not available")),
    }
}

fn window_title(window: &ViewWindow) -> String {
    let window = window.normalized();
    let month = first_day_of_month(window.year, window.month_index + 1).format("%B %Y");
    match window.view {
        ViewMode::Week => format!("{month}, week {}", window.week_index),
        _ => month.to_string(),
    }
}

/// `row:first-last`, with `<`/`>` where the block continues from or into
/// another row.
fn format_segment(segment: &RowSegment) -> String {
    let last = segment.column_start + segment.column_span.saturating_sub(1);
    format!(
        "{}{}:{}-{}{}",
        if segment.opens { "" } else { "<" },
        segment.row,
        segment.column_start,
        last,
        if segment.closes { "" } else { ">" },
    )
}

fn busy_days(layout: &CalendarLayout) -> Vec<(u32, u32)> {
    let mut out = Vec::new();
    for placement in &layout.placements {
        for segment in &placement.segments {
            let last = segment.column_start + segment.column_span.saturating_sub(1);
            for column in segment.column_start..=last.min(DAYS_PER_WEEK as u32) {
                out.push((segment.row, column));
            }
        }
    }
    out
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
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

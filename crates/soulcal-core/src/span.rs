//! Placement of one event on a grid of day cells.
//!
//! Rows are 1-based grid lines with the weekday header on row 1, so the first
//! week of cells sits on row 2. Columns run Monday (1) to Sunday (7).

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::datetime::weekday_column;
use crate::event::CalendarEvent;
use crate::grid::{CalendarDay, DAYS_PER_WEEK};

pub const HEADER_ROW: u32 = 1;
pub const FIRST_DATA_ROW: u32 = 2;
pub const EVENT_CLASS: &str = "task--warning";

/// Where an event sits on the grid. Derived per render, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDisplayInfo {
    /// The start instant is inside the grid.
    pub is_starting: bool,
    /// The end instant is inside the grid.
    pub is_ending: bool,
    pub start_row: u32,
    pub end_row: u32,
    pub lane: usize,
    pub column_start: u32,
    /// Column count on single-row events, otherwise the end column.
    pub column_span: u32,
    pub label: String,
    pub class_name: String,
}

/// The block drawn for an event on one grid row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSegment {
    pub row: u32,
    pub column_start: u32,
    pub column_span: u32,
    /// Left edge of the event is on this row.
    pub opens: bool,
    /// Right edge of the event is on this row.
    pub closes: bool,
    pub label: Option<String>,
}

#[tracing::instrument(skip(event, grid), fields(id = event.id, cells = grid.len()))]
pub fn resolve_span(event: &CalendarEvent, grid: &[CalendarDay], lane: usize) -> EventDisplayInfo {
    let (start_row, end_row) = find_event_rows(event, grid);
    let mut column_start = weekday_column(event.start.weekday());
    let mut column_span = weekday_column(event.end.weekday());

    let is_ending = end_row.is_some();
    let end_row = end_row.unwrap_or_else(|| rows_in(grid) + 1);

    let is_starting = start_row.is_some();
    let start_row = match start_row {
        Some(row) => row,
        None => {
            column_start = 1;
            FIRST_DATA_ROW
        }
    };

    if start_row == end_row && is_starting && is_ending {
        debug_assert!(column_span >= column_start, "same-row event ends before it starts");
        column_span = column_span.saturating_sub(column_start - 1);
    }

    EventDisplayInfo {
        is_starting,
        is_ending,
        start_row,
        end_row,
        lane,
        column_start,
        column_span,
        label: event.name.clone(),
        class_name: EVENT_CLASS.to_string(),
    }
}

fn rows_in(grid: &[CalendarDay]) -> u32 {
    (grid.len() / DAYS_PER_WEEK) as u32
}

/// Rows holding the start and end dates. Cells match on the full date, so
/// an endpoint a year away never lands on a cell with the same day and month.
fn find_event_rows(event: &CalendarEvent, grid: &[CalendarDay]) -> (Option<u32>, Option<u32>) {
    let start = event.start_date();
    let end = event.end_date();
    let mut start_row = None;
    let mut end_row = None;

    for (idx, cell) in grid.iter().enumerate() {
        let row = (idx / DAYS_PER_WEEK) as u32 + FIRST_DATA_ROW;
        if cell.date == start {
            start_row = Some(row);
        }
        if cell.date == end {
            end_row = Some(row);
        }
    }

    (start_row, end_row)
}

impl EventDisplayInfo {
    pub fn row_count(&self) -> u32 {
        (self.end_row + 1).saturating_sub(self.start_row)
    }

    /// One block per row from `start_row` to `end_row`.
    pub fn segments(&self) -> Vec<RowSegment> {
        (self.start_row..=self.end_row)
            .map(|row| self.segment_for_row(row))
            .collect()
    }

    fn segment_for_row(&self, row: u32) -> RowSegment {
        let opens = row == self.start_row && self.is_starting;
        let closes = row == self.end_row && self.is_ending;

        let (column_start, column_span) = match (opens, closes) {
            (true, true) => (self.column_start, self.column_span),
            (true, false) => (self.column_start, 8 - self.column_start),
            (false, true) if row == self.start_row => (self.column_start, self.column_span),
            (false, true) => (1, self.column_span),
            (false, false) => (1, 7),
        };

        RowSegment {
            row,
            column_start,
            column_span,
            opens,
            closes,
            label: (row == self.start_row).then(|| self.label.clone()),
        }
    }
}

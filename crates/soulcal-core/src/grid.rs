use chrono::{
  Datelike,
  NaiveDate,
  Weekday
};
use serde::{
  Deserialize,
  Serialize
};

use crate::datetime::{
  add_days,
  first_day_of_month,
  is_date_in_month,
  last_day_of_month,
  normalize_month,
  weekday_column
};

/// Cells in a six-week grid, the
/// largest a month ever needs.
pub const MAX_GRID_CELLS: usize = 42;
pub const DAYS_PER_WEEK: usize = 7;

/// One visible day box. Cells from the
/// neighbouring months carry
/// `is_current_month = false`.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize
)]
pub struct CalendarDay {
  pub date:             NaiveDate,
  pub is_current_month: bool,
  /// Zero-based month of `date`.
  pub month_index:      u32
}

impl CalendarDay {
  fn new(
    date: NaiveDate,
    year: i32,
    month_index: u32
  ) -> Self {
    Self {
      date,
      is_current_month:
        is_date_in_month(
          date,
          month_index,
          year
        ),
      month_index: date.month0()
    }
  }
}

/// Builds the Monday-first cells for
/// `month_index` (0-11) of `year`.
///
/// Leading days come from the end of
/// the previous month, trailing days
/// are appended until a Sunday closes
/// the last row, capped at six weeks.
/// A month ending on Sunday still gets
/// one full trailing week.
#[tracing::instrument]
pub fn build_month_grid(
  year: i32,
  month_index: i32
) -> Vec<CalendarDay> {
  let (year, month_index) =
    normalize_month(year, month_index);
  let month = month_index + 1;
  let first =
    first_day_of_month(year, month);
  let last =
    last_day_of_month(year, month);

  let mut cells =
    Vec::with_capacity(MAX_GRID_CELLS);

  let leading = i64::from(
    weekday_column(first.weekday()) - 1
  );
  for offset in (1..=leading).rev() {
    cells.push(CalendarDay::new(
      add_days(first, -offset),
      year,
      month_index
    ));
  }

  for day in first.iter_days() {
    if day > last {
      break;
    }
    cells.push(CalendarDay::new(
      day,
      year,
      month_index
    ));
  }

  let remaining = MAX_GRID_CELLS
    .saturating_sub(cells.len());
  for offset in 1..=remaining {
    let day =
      add_days(last, offset as i64);
    cells.push(CalendarDay::new(
      day,
      year,
      month_index
    ));
    if day.weekday() == Weekday::Sun {
      break;
    }
  }

  tracing::debug!(
    year,
    month_index,
    leading,
    cells = cells.len(),
    "built month grid"
  );
  cells
}

#[must_use]
pub fn week_count(
  grid: &[CalendarDay]
) -> usize {
  grid.len() / DAYS_PER_WEEK
}

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{
  Datelike,
  NaiveDate
};
use serde::{
  Deserialize,
  Serialize
};

use crate::datetime::normalize_month;
use crate::grid::{
  CalendarDay,
  DAYS_PER_WEEK,
  build_month_grid,
  week_count
};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize
)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
  #[default]
  Month,
  Week,
  Day
}

impl ViewMode {
  pub fn as_key(self) -> &'static str {
    match self {
      | ViewMode::Month => "month",
      | ViewMode::Week => "week",
      | ViewMode::Day => "day"
    }
  }
}

impl fmt::Display for ViewMode {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.as_key())
  }
}

impl FromStr for ViewMode {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "month" => Ok(ViewMode::Month),
      | "week" => Ok(ViewMode::Week),
      | "day" => Ok(ViewMode::Day),
      | other => {
        Err(anyhow!(
          "unknown view: {other} \
           (expected month, week or \
           day)"
        ))
      }
    }
  }
}

/// What the user is looking at. Owned
/// by the caller and passed into every
/// layout call.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize
)]
pub struct ViewWindow {
  pub year:        i32,
  /// Zero-based month.
  pub month_index: u32,
  pub view:        ViewMode,
  /// Negative selects the last week.
  pub week_index:  i32
}

impl ViewWindow {
  /// Month window; an index past 11
  /// rolls into the following years.
  pub fn month(
    year: i32,
    month_index: u32
  ) -> Self {
    Self {
      year,
      month_index,
      view: ViewMode::Month,
      week_index: 0
    }
    .normalized()
  }

  /// Same window with `month_index`
  /// folded into 0-11.
  #[must_use]
  pub fn normalized(self) -> Self {
    let raw = i32::try_from(
      self.month_index
    )
    .unwrap_or(i32::MAX);
    let (year, month_index) =
      normalize_month(self.year, raw);
    Self {
      year,
      month_index,
      ..self
    }
  }

  /// The window whose week holds
  /// `date`, in the month of `date`.
  pub fn containing(
    date: NaiveDate,
    view: ViewMode
  ) -> Self {
    let year = date.year();
    let month_index = date.month0();
    let grid = build_month_grid(
      year,
      month_index as i32
    );
    let week_index = grid
      .iter()
      .position(|cell| cell.date == date)
      .map_or(0, |idx| {
        (idx / DAYS_PER_WEEK) as i32
      });

    Self {
      year,
      month_index,
      view,
      week_index
    }
  }

  #[must_use]
  pub fn with_view(
    self,
    view: ViewMode
  ) -> Self {
    Self { view, ..self }
  }

  #[must_use]
  pub fn with_week(
    self,
    week_index: i32
  ) -> Self {
    Self {
      week_index,
      ..self
    }
  }

  pub fn grid(
    &self
  ) -> Vec<CalendarDay> {
    build_month_grid(
      self.year,
      self.month_index as i32
    )
  }

  /// Moves the window by `increment`
  /// steps of the current view. Week
  /// steps past either end of the month
  /// roll into the neighbouring month.
  #[must_use]
  #[tracing::instrument]
  pub fn step(
    self,
    increment: i32
  ) -> Self {
    match self.view {
      | ViewMode::Month => {
        self
          .shift_month(increment)
          .with_week(0)
      }
      | ViewMode::Week => {
        let weeks =
          week_count(&self.grid()) as i32;
        let current =
          resolve_week_index(
            self.week_index,
            weeks as usize
          ) as i32;
        let target =
          current.saturating_add(increment);

        if (0..weeks).contains(&target) {
          self.with_week(target)
        } else if increment > 0 {
          self.shift_month(1).with_week(0)
        } else {
          self
            .shift_month(-1)
            .with_week(-1)
        }
      }
      | ViewMode::Day => self
    }
  }

  fn shift_month(
    self,
    months: i32
  ) -> Self {
    let (year, month_index) =
      normalize_month(
        self.year,
        self.month_index as i32
          + months
      );
    Self {
      year,
      month_index,
      ..self
    }
  }
}

/// Result of slicing a grid for the
/// current view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewSelection<'a> {
  Cells(&'a [CalendarDay]),
  WeekNotFound {
    week_index: i32
  },
  Unsupported(ViewMode)
}

/// Negative indices pick the last
/// week.
#[must_use]
pub fn resolve_week_index(
  week_index: i32,
  weeks: usize
) -> usize {
  if week_index < 0 {
    weeks.saturating_sub(1)
  } else {
    week_index as usize
  }
}

/// The seven cells of week
/// `week_index`, or `None` when the
/// grid has no such week.
#[must_use]
pub fn select_week(
  grid: &[CalendarDay],
  week_index: i32
) -> Option<&[CalendarDay]> {
  let idx = resolve_week_index(
    week_index,
    week_count(grid)
  );
  let slice = grid
    .chunks(DAYS_PER_WEEK)
    .nth(idx)
    .filter(|week| {
      week.len() == DAYS_PER_WEEK
    });
  if slice.is_none() {
    tracing::warn!(
      week_index,
      weeks = week_count(grid),
      "week not found in calendar data"
    );
  }
  slice
}

pub fn select_view<'a>(
  grid: &'a [CalendarDay],
  window: &ViewWindow
) -> ViewSelection<'a> {
  match window.view {
    | ViewMode::Month => {
      ViewSelection::Cells(grid)
    }
    | ViewMode::Week => {
      match select_week(
        grid,
        window.week_index
      ) {
        | Some(week) => {
          ViewSelection::Cells(week)
        }
        | None => {
          ViewSelection::WeekNotFound {
            week_index: window
              .week_index
          }
        }
      }
    }
    | ViewMode::Day => {
      ViewSelection::Unsupported(
        ViewMode::Day
      )
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn negative_week_selects_last() {
    let grid = build_month_grid(2024, 1);
    let last =
      select_week(&grid, -1).expect("week");
    assert_eq!(
      resolve_week_index(
        -1,
        week_count(&grid)
      ),
      4
    );
    assert_eq!(last, &grid[28..35]);
  }

  #[test]
  fn out_of_range_week_is_not_found() {
    let grid = build_month_grid(2024, 1);
    assert!(select_week(&grid, 5).is_none());
    assert_eq!(
      select_view(
        &grid,
        &ViewWindow::month(2024, 1)
          .with_view(ViewMode::Week)
          .with_week(9)
      ),
      ViewSelection::WeekNotFound {
        week_index: 9
      }
    );
  }

  #[test]
  fn month_view_passes_grid_through() {
    let grid = build_month_grid(2024, 1);
    assert_eq!(
      select_view(
        &grid,
        &ViewWindow::month(2024, 1)
      ),
      ViewSelection::Cells(&grid[..])
    );
  }

  #[test]
  fn day_view_is_unsupported() {
    let grid = build_month_grid(2024, 1);
    assert_eq!(
      select_view(
        &grid,
        &ViewWindow::month(2024, 1)
          .with_view(ViewMode::Day)
      ),
      ViewSelection::Unsupported(
        ViewMode::Day
      )
    );
  }

  #[test]
  fn month_step_rolls_year_and_resets_week()
  {
    let window =
      ViewWindow::month(2024, 11)
        .with_week(3);
    let next = window.step(1);
    assert_eq!(
      (next.year, next.month_index),
      (2025, 0)
    );
    assert_eq!(next.week_index, 0);

    let prev =
      ViewWindow::month(2024, 0).step(-1);
    assert_eq!(
      (prev.year, prev.month_index),
      (2023, 11)
    );
  }

  #[test]
  fn week_step_stays_inside_month() {
    let window = ViewWindow::month(2024, 1)
      .with_view(ViewMode::Week)
      .with_week(2);
    assert_eq!(window.step(1).week_index, 3);
    assert_eq!(
      window.step(-1).week_index,
      1
    );
  }

  #[test]
  fn week_step_rolls_into_neighbouring_months()
  {
    let last = ViewWindow::month(2024, 1)
      .with_view(ViewMode::Week)
      .with_week(4);
    let forward = last.step(1);
    assert_eq!(forward.month_index, 2);
    assert_eq!(forward.week_index, 0);

    let first = ViewWindow::month(2024, 1)
      .with_view(ViewMode::Week)
      .with_week(0);
    let back = first.step(-1);
    assert_eq!(back.month_index, 0);
    assert_eq!(back.week_index, -1);
  }

  #[test]
  fn last_week_alias_can_step_back() {
    let window = ViewWindow::month(2024, 1)
      .with_view(ViewMode::Week)
      .with_week(-1);
    let back = window.step(-1);
    assert_eq!(back.month_index, 1);
    assert_eq!(back.week_index, 3);
  }

  #[test]
  fn day_view_does_not_move() {
    let window = ViewWindow::month(2024, 1)
      .with_view(ViewMode::Day);
    assert_eq!(window.step(1), window);
  }

  #[test]
  fn window_containing_date() {
    let date =
      NaiveDate::from_ymd_opt(2024, 2, 14)
        .expect("valid date");
    let window = ViewWindow::containing(
      date,
      ViewMode::Week
    );
    assert_eq!(window.month_index, 1);
    assert_eq!(window.week_index, 2);
  }

  #[test]
  fn month_index_past_december_rolls_over()
  {
    assert_eq!(
      ViewWindow::month(2024, 12),
      ViewWindow::month(2025, 0)
    );
    let raw = ViewWindow {
      year:        2024,
      month_index: 14,
      view:        ViewMode::Week,
      week_index:  2
    };
    let fixed = raw.normalized();
    assert_eq!(
      (fixed.year, fixed.month_index),
      (2025, 2)
    );
    assert_eq!(fixed.week_index, 2);
  }

  #[test]
  fn parses_view_names() {
    assert_eq!(
      "Week"
        .parse::<ViewMode>()
        .expect("valid view"),
      ViewMode::Week
    );
    assert!("year".parse::<ViewMode>().is_err());
  }
}

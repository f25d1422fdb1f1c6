//! How many event lanes fit in a grid row, computed from pixel metrics.

use serde::{Deserialize, Serialize};

use crate::grid::DAYS_PER_WEEK;
use crate::view::ViewMode;

/// Pixel metrics of the calendar surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Presentation {
    pub viewport_height: f64,
    /// Share of the viewport given to the calendar.
    pub calendar_fraction: f64,
    pub header_height: f64,
    pub chrome_margin: f64,
    /// Space above the first lane, taken by the day number.
    pub top_padding: f64,
    pub event_height: f64,
    /// Below this a single squeezed lane is no longer drawn.
    pub min_event_height: f64,
    /// Fixed lane count; skips the measurement when set.
    pub max_visible_lanes: Option<usize>,
}

impl Default for Presentation {
    fn default() -> Self {
        Self {
            viewport_height: 1080.0,
            calendar_fraction: 0.45,
            header_height: 56.0,
            chrome_margin: 40.0,
            top_padding: 30.0,
            event_height: 27.0,
            min_event_height: 10.0,
            max_visible_lanes: None,
        }
    }
}

impl Presentation {
    /// Height of one grid row for `view` over `cells` day cells.
    pub fn row_height(&self, view: ViewMode, cells: usize) -> f64 {
        let available = self.viewport_height * self.calendar_fraction
            - self.header_height
            - self.chrome_margin;

        match view {
            ViewMode::Month => {
                let rows = cells.div_ceil(DAYS_PER_WEEK).max(1);
                available / rows as f64
            }
            ViewMode::Week => available,
            ViewMode::Day => available / 24.0,
        }
    }

    pub fn capacity(&self, row_height: f64) -> LaneCapacity {
        let free = row_height - self.top_padding;

        let (computed, event_height) = if free > self.min_event_height && free < self.event_height {
            (1, free)
        } else if free <= 0.0 || self.event_height <= 0.0 {
            (0, self.event_height)
        } else {
            ((free / self.event_height).floor() as usize, self.event_height)
        };

        LaneCapacity {
            max_visible_lanes: self.max_visible_lanes.unwrap_or(computed),
            event_height,
            top_padding: self.top_padding,
        }
    }

    pub fn capacity_for(&self, view: ViewMode, cells: usize) -> LaneCapacity {
        self.capacity(self.row_height(view, cells))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaneCapacity {
    pub max_visible_lanes: usize,
    pub event_height: f64,
    pub top_padding: f64,
}

impl LaneCapacity {
    pub fn is_visible(&self, lane: usize) -> bool {
        lane < self.max_visible_lanes
    }

    /// Vertical offset of `lane` inside its row; hidden lanes stack on the
    /// last visible one.
    pub fn top_offset(&self, lane: usize) -> f64 {
        let slot = lane.min(self.max_visible_lanes.saturating_sub(1));
        self.top_padding + slot as f64 * self.event_height
    }
}

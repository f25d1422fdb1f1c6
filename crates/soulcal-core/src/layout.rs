use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::datetime::{first_day_of_month, last_day_of_month, normalize_month};
use crate::event::{CalendarEvent, EventId};
use crate::grid::{CalendarDay, week_count};
use crate::lanes::{LaneMap, assign_lanes, lane_count};
use crate::span::{EventDisplayInfo, RowSegment, resolve_span};
use crate::view::{ViewMode, ViewSelection, ViewWindow, select_view};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LayoutStatus {
    Ready,
    /// The week index points past the month; the caller shows a placeholder.
    WeekNotFound { week_index: i32 },
    Unsupported { view: ViewMode },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventPlacement {
    pub event_id: EventId,
    pub display: EventDisplayInfo,
    pub segments: Vec<RowSegment>,
}

/// Everything a renderer needs for one view window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarLayout {
    pub window: ViewWindow,
    pub status: LayoutStatus,
    pub cells: Vec<CalendarDay>,
    pub placements: Vec<EventPlacement>,
    pub lanes: LaneMap,
}

/// Receives user activation of an event block.
pub trait EventActivation {
    fn on_event_activated(&mut self, event_id: EventId);
}

impl<F> EventActivation for F
where
    F: FnMut(EventId),
{
    fn on_event_activated(&mut self, event_id: EventId) {
        self(event_id)
    }
}

/// Events with at least one day inside the target month.
pub fn events_in_month<'a>(events: &'a [CalendarEvent], year: i32, month_index: u32) -> Vec<&'a CalendarEvent> {
    let (year, month_index) = normalize_month(year, i32::try_from(month_index).unwrap_or(i32::MAX));
    let first = first_day_of_month(year, month_index + 1);
    let last = last_day_of_month(year, month_index + 1);
    events.iter().filter(|event| event.touches_days(first, last)).collect()
}

#[instrument(skip(events), fields(events = events.len()))]
pub fn compute_layout(window: ViewWindow, events: &[CalendarEvent]) -> CalendarLayout {
    let window = window.normalized();
    let grid = window.grid();

    let month_events: Vec<CalendarEvent> = events_in_month(events, window.year, window.month_index)
        .into_iter()
        .cloned()
        .collect();
    let lanes = assign_lanes(&month_events);

    debug!(
        month_events = month_events.len(),
        lanes = lane_count(&lanes),
        weeks = week_count(&grid),
        "lanes assigned"
    );

    let (status, cells) = match select_view(&grid, &window) {
        ViewSelection::Cells(cells) => (LayoutStatus::Ready, cells.to_vec()),
        ViewSelection::WeekNotFound { week_index } => (LayoutStatus::WeekNotFound { week_index }, Vec::new()),
        ViewSelection::Unsupported(view) => (LayoutStatus::Unsupported { view }, Vec::new()),
    };

    let placements = match (cells.first(), cells.last()) {
        (Some(first), Some(last)) => month_events
            .iter()
            .filter(|event| event.touches_days(first.date, last.date))
            .map(|event| {
                let lane = lanes.get(&event.id).copied().unwrap_or(0);
                let display = resolve_span(event, &cells, lane);
                let segments = display.segments();
                EventPlacement {
                    event_id: event.id,
                    display,
                    segments,
                }
            })
            .collect(),
        _ => Vec::new(),
    };

    info!(
        year = window.year,
        month_index = window.month_index,
        view = %window.view,
        cells = cells.len(),
        placements = placements.len(),
        status = ?status,
        "computed calendar layout"
    );

    CalendarLayout {
        window,
        status,
        cells,
        placements,
        lanes,
    }
}

impl CalendarLayout {
    pub fn placement(&self, event_id: EventId) -> Option<&EventPlacement> {
        self.placements.iter().find(|p| p.event_id == event_id)
    }

    /// Notifies `observer` when `event_id` is drawn in this layout.
    pub fn activate<O: EventActivation + ?Sized>(&self, event_id: EventId, observer: &mut O) -> bool {
        if self.placement(event_id).is_none() {
            debug!(event_id, "activation ignored; event not placed");
            return false;
        }
        observer.on_event_activated(event_id);
        true
    }

    /// Last cell on screen, if any.
    pub fn last_visible_day(&self) -> Option<&CalendarDay> {
        self.cells.last()
    }

    pub fn rows(&self) -> usize {
        week_count(&self.cells)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn event(id: EventId, start: (i32, u32, u32), end: (i32, u32, u32)) -> CalendarEvent {
        let tz = chrono_tz::Europe::Madrid;
        CalendarEvent::new(
            id,
            format!("event {id}"),
            tz.with_ymd_and_hms(start.0, start.1, start.2, 18, 0, 0)
                .single()
                .expect("valid start"),
            tz.with_ymd_and_hms(end.0, end.1, end.2, 20, 0, 0)
                .single()
                .expect("valid end"),
        )
    }

    fn sample() -> Vec<CalendarEvent> {
        vec![
            event(1, (2024, 2, 5), (2024, 2, 5)),
            event(2, (2024, 2, 5), (2024, 2, 7)),
            event(3, (2024, 2, 20), (2024, 2, 20)),
            event(4, (2024, 1, 10), (2024, 1, 12)),
            event(5, (2024, 1, 30), (2024, 2, 2)),
        ]
    }

    #[test]
    fn month_layout_places_month_events_only() {
        let layout = compute_layout(ViewWindow::month(2024, 1), &sample());

        assert_eq!(layout.status, LayoutStatus::Ready);
        assert_eq!(layout.cells.len(), 35);
        assert_eq!(layout.rows(), 5);

        let ids: Vec<_> = layout.placements.iter().map(|p| p.event_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 5]);
        assert!(!layout.lanes.contains_key(&4));
        assert_ne!(layout.lanes[&1], layout.lanes[&2]);
    }

    #[test]
    fn event_started_last_month_is_drawn_from_grid_cells() {
        let layout = compute_layout(ViewWindow::month(2024, 1), &sample());
        let placement = layout.placement(5).expect("placed");
        // Jan 30 is a leading cell of the February grid.
        assert!(placement.display.is_starting);
        assert_eq!(placement.display.start_row, 2);
        assert_eq!(placement.display.column_start, 2);
    }

    #[test]
    fn week_layout_keeps_month_lanes() {
        let window = ViewWindow::month(2024, 1).with_view(ViewMode::Week).with_week(1);
        let layout = compute_layout(window, &sample());

        assert_eq!(layout.status, LayoutStatus::Ready);
        assert_eq!(layout.cells.len(), 7);
        let ids: Vec<_> = layout.placements.iter().map(|p| p.event_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(
            layout
                .placements
                .iter()
                .all(|p| p.display.start_row == 2 && p.display.end_row == 2)
        );
        assert_eq!(layout.placement(2).map(|p| p.display.lane), Some(0));
        assert_eq!(layout.placement(1).map(|p| p.display.lane), Some(1));
    }

    #[test]
    fn last_week_alias() {
        let window = ViewWindow::month(2024, 1).with_view(ViewMode::Week).with_week(-1);
        let layout = compute_layout(window, &sample());
        let last = layout.last_visible_day().expect("cells");
        assert_eq!(last.date.to_string(), "2024-03-03");
    }

    #[test]
    fn missing_week_reports_status() {
        let window = ViewWindow::month(2024, 1).with_view(ViewMode::Week).with_week(7);
        let layout = compute_layout(window, &sample());
        assert_eq!(layout.status, LayoutStatus::WeekNotFound { week_index: 7 });
        assert!(layout.cells.is_empty());
        assert!(layout.placements.is_empty());
    }

    #[test]
    fn day_view_reports_unsupported() {
        let window = ViewWindow::month(2024, 1).with_view(ViewMode::Day);
        let layout = compute_layout(window, &sample());
        assert_eq!(layout.status, LayoutStatus::Unsupported { view: ViewMode::Day });
    }

    #[test]
    fn month_past_december_matches_next_january() {
        let events = vec![
            event(1, (2024, 12, 3), (2024, 12, 4)),
            event(2, (2025, 1, 15), (2025, 1, 16)),
        ];
        let rolled = ViewWindow {
            year: 2024,
            month_index: 12,
            view: ViewMode::Month,
            week_index: 0,
        };

        let layout = compute_layout(rolled, &events);
        assert_eq!(layout, compute_layout(ViewWindow::month(2025, 0), &events));
        assert_eq!((layout.window.year, layout.window.month_index), (2025, 0));

        let ids: Vec<_> = layout.placements.iter().map(|p| p.event_id).collect();
        assert_eq!(ids, vec![2]);
        assert!(!layout.lanes.contains_key(&1));
        assert_eq!(events_in_month(&events, 2024, 12).len(), 1);
    }

    #[test]
    fn empty_event_list() {
        let layout = compute_layout(ViewWindow::month(2024, 1), &[]);
        assert_eq!(layout.status, LayoutStatus::Ready);
        assert!(layout.placements.is_empty());
        assert!(layout.lanes.is_empty());
    }

    #[test]
    fn activation_reaches_observer_for_placed_events() {
        let layout = compute_layout(ViewWindow::month(2024, 1), &sample());
        let mut activated = Vec::new();
        let mut observer = |id: EventId| activated.push(id);

        assert!(layout.activate(3, &mut observer));
        assert!(!layout.activate(4, &mut observer));
        assert_eq!(activated, vec![3]);
    }

    #[test]
    fn layout_serializes_status_tag() {
        let window = ViewWindow::month(2024, 1).with_view(ViewMode::Week).with_week(9);
        let json = serde_json::to_value(compute_layout(window, &[])).expect("serialize");
        assert_eq!(json["status"]["state"], "week_not_found");
        assert_eq!(json["window"]["view"], "week");
    }
}

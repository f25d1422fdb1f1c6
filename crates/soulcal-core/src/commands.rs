use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::cli::{Command, OutputArgs, WindowArgs};
use crate::config::Config;
use crate::datetime::today_in_timezone;
use crate::event::{CalendarEvent, EventId, EventRecord};
use crate::grid::CalendarDay;
use crate::lanes::{LaneMap, assign_lanes, lane_count};
use crate::layout::{CalendarLayout, LayoutStatus, compute_layout, events_in_month};
use crate::presentation::LaneCapacity;
use crate::render::Renderer;
use crate::source::{load_events, to_calendar_events, write_json_atomic};
use crate::view::ViewWindow;

#[derive(Debug, Serialize)]
struct GridReport<'a> {
    window: ViewWindow,
    status: LayoutStatus,
    cells: &'a [CalendarDay],
}

#[derive(Debug, Serialize)]
struct LayoutReport<'a> {
    #[serde(flatten)]
    layout: &'a CalendarLayout,
    capacity: LaneCapacity,
}

#[derive(Debug, Serialize)]
struct LanesReport<'a> {
    window: ViewWindow,
    lane_count: usize,
    lanes: &'a LaneMap,
}

#[instrument(skip(cfg, renderer, command))]
pub fn dispatch(cfg: &Config, renderer: &Renderer, command: Command) -> anyhow::Result<()> {
    let timezone = cfg.timezone();
    let today = today_in_timezone(timezone);
    debug!(%timezone, %today, "dispatching command");

    match command {
        Command::Grid {
            window,
            events,
            output,
        } => cmd_grid(renderer, timezone, today, &window, events.as_deref(), &output),
        Command::Layout {
            window,
            events,
            output,
        } => cmd_layout(cfg, renderer, timezone, today, &window, &events, &output),
        Command::Lanes {
            window,
            events,
            output,
        } => cmd_lanes(renderer, timezone, today, &window, &events, &output),
        Command::Navigate {
            window,
            step,
            output,
        } => cmd_navigate(renderer, today, &window, step, &output),
        Command::Show { window, events, id } => cmd_show(renderer, timezone, today, &window, &events, id),
    }
}

#[instrument(skip(renderer, timezone, window, output))]
fn cmd_grid(
    renderer: &Renderer,
    timezone: Tz,
    today: NaiveDate,
    window: &WindowArgs,
    events: Option<&Path>,
    output: &OutputArgs,
) -> anyhow::Result<()> {
    let window = window.resolve(today)?;
    let events = match events {
        Some(path) => read_calendar_events(path, timezone)?.1,
        None => Vec::new(),
    };
    let layout = compute_layout(window, &events);

    if wants_json(output) {
        return emit_json(
            output,
            &GridReport {
                window: layout.window,
                status: layout.status,
                cells: &layout.cells,
            },
        );
    }

    renderer.print_grid(&layout)
}

#[instrument(skip(cfg, renderer, timezone, window, output))]
fn cmd_layout(
    cfg: &Config,
    renderer: &Renderer,
    timezone: Tz,
    today: NaiveDate,
    window: &WindowArgs,
    events: &Path,
    output: &OutputArgs,
) -> anyhow::Result<()> {
    let window = window.resolve(today)?;
    let (_, events) = read_calendar_events(events, timezone)?;
    let layout = compute_layout(window, &events);
    let capacity = cfg.presentation.capacity_for(window.view, layout.cells.len());

    let hidden = layout
        .placements
        .iter()
        .filter(|p| !capacity.is_visible(p.display.lane))
        .count();
    info!(
        placements = layout.placements.len(),
        max_visible_lanes = capacity.max_visible_lanes,
        hidden,
        "layout ready"
    );

    if wants_json(output) {
        return emit_json(
            output,
            &LayoutReport {
                layout: &layout,
                capacity,
            },
        );
    }

    renderer.print_layout(&layout, &capacity)
}

#[instrument(skip(renderer, timezone, window, output))]
fn cmd_lanes(
    renderer: &Renderer,
    timezone: Tz,
    today: NaiveDate,
    window: &WindowArgs,
    events: &Path,
    output: &OutputArgs,
) -> anyhow::Result<()> {
    let window = window.resolve(today)?;
    let (_, events) = read_calendar_events(events, timezone)?;
    let month_events: Vec<CalendarEvent> = events_in_month(&events, window.year, window.month_index)
        .into_iter()
        .cloned()
        .collect();
    let lanes = assign_lanes(&month_events);

    if wants_json(output) {
        return emit_json(
            output,
            &LanesReport {
                window,
                lane_count: lane_count(&lanes),
                lanes: &lanes,
            },
        );
    }

    renderer.print_lanes(&lanes, &month_events)
}

#[instrument(skip(renderer, window, output))]
fn cmd_navigate(
    renderer: &Renderer,
    today: NaiveDate,
    window: &WindowArgs,
    step: i32,
    output: &OutputArgs,
) -> anyhow::Result<()> {
    let from = window.resolve(today)?;
    let to = from.step(step);
    info!(?from, ?to, "navigated");

    if wants_json(output) {
        return emit_json(output, &to);
    }

    renderer.print_window(&to)
}

#[instrument(skip(renderer, timezone, window))]
fn cmd_show(
    renderer: &Renderer,
    timezone: Tz,
    today: NaiveDate,
    window: &WindowArgs,
    events: &Path,
    id: EventId,
) -> anyhow::Result<()> {
    let (records, events) = read_calendar_events(events, timezone)?;
    let record = records
        .iter()
        .find(|record| record.id == id)
        .ok_or_else(|| anyhow!("event {id} not found"))?;

    // Without an explicit month, open the window on the event itself.
    let explicit = window.month.is_some() || window.year.is_some();
    let window = match events.iter().find(|event| event.id == id) {
        Some(event) if !explicit => ViewWindow::containing(event.start_date(), window.view),
        _ => window.resolve(today)?,
    };
    let layout = compute_layout(window, &events);

    let mut observer = |event_id: EventId| info!(event_id, "event activated");
    if !layout.activate(id, &mut observer) {
        debug!(id, "event is outside the current view");
    }

    renderer.print_event_details(record, layout.placement(id))
}

fn read_calendar_events(path: &Path, timezone: Tz) -> anyhow::Result<(Vec<EventRecord>, Vec<CalendarEvent>)> {
    let records = load_events(path)?;
    let events = to_calendar_events(&records, timezone);
    Ok((records, events))
}

fn wants_json(output: &OutputArgs) -> bool {
    output.json || output.output.is_some()
}

fn emit_json<T: Serialize>(output: &OutputArgs, value: &T) -> anyhow::Result<()> {
    if let Some(path) = &output.output {
        write_json_atomic(path, value)?;
        info!(file = %path.display(), "wrote json output");
        return Ok(());
    }

    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value).context("failed to serialize output")?;
    writeln!(out)?;
    Ok(())
}

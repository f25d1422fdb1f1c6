use anyhow::Context;
use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::datetime::parse_event_instant;

pub type EventId = i64;

/// An event as the dashboard API serves it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(rename = "Id")]
    pub id: EventId,

    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "Date")]
    pub date: String,

    /// Missing for single-day events.
    #[serde(rename = "End_Date", default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,

    #[serde(rename = "Max_Participants", default)]
    pub max_participants: i64,

    #[serde(rename = "Location_X", default)]
    pub location_x: String,

    #[serde(rename = "Location_Y", default)]
    pub location_y: String,

    #[serde(rename = "Type", default)]
    pub kind: String,

    #[serde(rename = "Employee_Id", default)]
    pub employee_id: Option<i64>,
}

impl EventRecord {
    /// Map position as `(latitude, longitude)`, when both parts parse.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let x = self.location_x.trim().parse::<f64>().ok()?;
        let y = self.location_y.trim().parse::<f64>().ok()?;
        Some((x, y))
    }
}

/// The part of an event the layout engine reads.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    pub id: EventId,
    pub name: String,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl CalendarEvent {
    /// An end before the start collapses onto the start.
    pub fn new(id: EventId, name: impl Into<String>, start: DateTime<Tz>, end: DateTime<Tz>) -> Self {
        let end = if end < start {
            tracing::warn!(id, %start, %end, "event ends before it starts; clamping end");
            start
        } else {
            end
        };

        Self {
            id,
            name: name.into(),
            start,
            end,
        }
    }

    #[tracing::instrument(skip(record, timezone), fields(id = record.id))]
    pub fn from_record(record: &EventRecord, timezone: Tz) -> anyhow::Result<Self> {
        let start = parse_event_instant(&record.date, timezone)
            .with_context(|| format!("event {} has an invalid date", record.id))?;
        let end = match record.end_date.as_deref() {
            Some(raw) if !raw.trim().is_empty() => parse_event_instant(raw, timezone)
                .with_context(|| format!("event {} has an invalid end date", record.id))?,
            _ => start,
        };

        Ok(Self::new(record.id, record.name.clone(), start, end))
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end.date_naive()
    }

    /// Inclusive overlap, so touching boundaries count.
    pub fn overlaps(&self, other: &CalendarEvent) -> bool {
        other.start <= self.end && other.end >= self.start
    }

    /// Whether any day of the event falls in `first..=last`.
    pub fn touches_days(&self, first: NaiveDate, last: NaiveDate) -> bool {
        self.start_date() <= last && self.end_date() >= first
    }
}

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::{Context, anyhow};
use chrono_tz::Tz;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::event::{CalendarEvent, EventRecord};

/// Reads a JSON array of event records from `path`, or stdin for `-`.
#[tracing::instrument(skip(path))]
pub fn load_events(path: &Path) -> anyhow::Result<Vec<EventRecord>> {
    let text = if path.as_os_str() == "-" {
        debug!("reading events from stdin");
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed reading events from stdin")?;
        buf
    } else {
        debug!(file = %path.display(), "reading events");
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?
    };

    let records = parse_events(&text)
        .with_context(|| format!("failed parsing events from {}", path.display()))?;
    info!(count = records.len(), "loaded event records");
    Ok(records)
}

pub fn parse_events(text: &str) -> anyhow::Result<Vec<EventRecord>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(text)?)
}

/// Converts records to engine events. Records whose dates do not parse are
/// dropped with a warning.
#[tracing::instrument(skip(records, timezone), fields(records = records.len()))]
pub fn to_calendar_events(records: &[EventRecord], timezone: Tz) -> Vec<CalendarEvent> {
    let mut out = Vec::with_capacity(records.len());
    for record in records {
        match CalendarEvent::from_record(record, timezone) {
            Ok(event) => out.push(event),
            Err(err) => warn!(id = record.id, error = %format!("{err:#}"), "skipping event"),
        }
    }

    if out.len() < records.len() {
        info!(
            kept = out.len(),
            skipped = records.len() - out.len(),
            "dropped events with invalid dates"
        );
    }
    out
}

#[tracing::instrument(skip(path, value))]
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    debug!(file = %path.display(), "writing json atomically");

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
    serde_json::to_writer_pretty(&mut temp, value)?;
    writeln!(temp)?;
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {"Id": 1, "Name": "Speed dating", "Date": "2024-02-05", "Max_Participants": 20,
         "Location_X": "48.85", "Location_Y": "2.35", "Type": "Meetup", "Employee_Id": 4},
        {"Id": 2, "Name": "Broken", "Date": "next tuesday"},
        {"Id": 3, "Name": "Weekend retreat", "Date": "2024-02-09T18:00:00", "End_Date": "2024-02-11"}
    ]"#;

    #[test]
    fn parses_rest_shaped_records() {
        let records = parse_events(SAMPLE).expect("parse");
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].kind, "Meetup");
        assert_eq!(records[0].employee_id, Some(4));
        assert_eq!(records[2].end_date.as_deref(), Some("2024-02-11"));
    }

    #[test]
    fn invalid_dates_are_skipped() {
        let records = parse_events(SAMPLE).expect("parse");
        let events = to_calendar_events(&records, chrono_tz::Europe::Madrid);
        let ids: Vec<_> = events.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(events[1].end_date().to_string(), "2024-02-11");
    }

    #[test]
    fn blank_input_is_no_events() {
        assert!(parse_events("  \n").expect("parse").is_empty());
        assert!(parse_events("{}").is_err());
    }
}

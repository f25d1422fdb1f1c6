use std::collections::BTreeMap;

use crate::event::{
  CalendarEvent,
  EventId
};

pub type LaneMap =
  BTreeMap<EventId, usize>;

/// Greedy sweep over events sorted by
/// start ascending (longer first on
/// equal starts). Each event takes the
/// lowest lane not held by an event it
/// overlaps, inclusive of touching
/// boundaries. Equal `(start, end)`
/// pairs keep their input order.
#[tracing::instrument(skip_all, fields(events = events.len()))]
pub fn assign_lanes(
  events: &[CalendarEvent]
) -> LaneMap {
  let mut sorted: Vec<&CalendarEvent> =
    events.iter().collect();
  sorted.sort_by(|a, b| {
    a.start
      .cmp(&b.start)
      .then_with(|| b.end.cmp(&a.end))
  });

  let mut lanes = LaneMap::new();
  let mut active: Vec<(
    &CalendarEvent,
    usize
  )> = Vec::new();

  for event in sorted {
    active.retain(|(other, _)| {
      other.overlaps(event)
    });

    let mut lane = 0;
    while active
      .iter()
      .any(|(_, used)| *used == lane)
    {
      lane += 1;
    }

    tracing::trace!(
      id = event.id,
      lane,
      active = active.len(),
      "assigned lane"
    );
    lanes.insert(event.id, lane);
    active.push((event, lane));
  }

  lanes
}

/// Lanes needed to draw every event.
#[must_use]
pub fn lane_count(
  lanes: &LaneMap
) -> usize {
  lanes
    .values()
    .max()
    .map_or(0, |max| max + 1)
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn event(
    id: EventId,
    start: (u32, u32),
    end: (u32, u32)
  ) -> CalendarEvent {
    let tz = chrono_tz::UTC;
    CalendarEvent::new(
      id,
      format!("event {id}"),
      tz.with_ymd_and_hms(
        2024, start.0, start.1, 0, 0, 0
      )
      .single()
      .expect("valid start"),
      tz.with_ymd_and_hms(
        2024, end.0, end.1, 0, 0, 0
      )
      .single()
      .expect("valid end")
    )
  }

  #[test]
  fn no_events_no_lanes() {
    let lanes = assign_lanes(&[]);
    assert!(lanes.is_empty());
    assert_eq!(lane_count(&lanes), 0);
  }

  #[test]
  fn same_day_and_multi_day_split() {
    let a = event(1, (2, 5), (2, 5));
    let b = event(2, (2, 5), (2, 7));
    let lanes =
      assign_lanes(&[a.clone(), b]);

    assert_ne!(lanes[&1], lanes[&2]);
    let mut got: Vec<_> =
      lanes.values().copied().collect();
    got.sort_unstable();
    assert_eq!(got, vec![0, 1]);
    // The longer event sorts first.
    assert_eq!(lanes[&2], 0);
  }

  #[test]
  fn disjoint_events_share_lane_zero() {
    let events = vec![
      event(1, (2, 1), (2, 2)),
      event(2, (2, 4), (2, 4)),
      event(3, (2, 10), (2, 12)),
    ];
    let lanes = assign_lanes(&events);
    assert!(
      lanes.values().all(|lane| *lane == 0)
    );
  }

  #[test]
  fn mutual_overlap_uses_one_lane_each() {
    let events: Vec<_> = (1..=4)
      .map(|id| event(id, (2, 5), (2, 9)))
      .collect();
    let lanes = assign_lanes(&events);
    let mut got: Vec<_> =
      lanes.values().copied().collect();
    got.sort_unstable();
    assert_eq!(got, vec![0, 1, 2, 3]);
    // Equal ranges keep input order.
    assert_eq!(lanes[&1], 0);
    assert_eq!(lanes[&4], 3);
  }

  #[test]
  fn freed_lanes_are_reused() {
    let events = vec![
      event(1, (2, 1), (2, 10)),
      event(2, (2, 2), (2, 3)),
      event(3, (2, 5), (2, 6)),
    ];
    let lanes = assign_lanes(&events);
    assert_eq!(lanes[&1], 0);
    assert_eq!(lanes[&2], 1);
    assert_eq!(lanes[&3], 1);
    assert_eq!(lane_count(&lanes), 2);
  }

  #[test]
  fn overlapping_pairs_never_share_a_lane()
  {
    // Small deterministic LCG so the
    // shape varies without a rand dep.
    let mut seed: u64 = 0x5eed_cafe;
    let mut next = |bound: u64| {
      seed = seed
        .wrapping_mul(6_364_136_223_846_793_005)
        .wrapping_add(1_442_695_040_888_963_407);
      (seed >> 33) % bound
    };

    for _round in 0..50 {
      let events: Vec<_> = (0..25)
        .map(|id| {
          let start = 1 + next(25) as u32;
          let len = next(4) as u32;
          event(
            id,
            (3, start),
            (3, (start + len).min(31))
          )
        })
        .collect();
      let lanes = assign_lanes(&events);

      for a in &events {
        for b in &events {
          if a.id != b.id && a.overlaps(b) {
            assert_ne!(
              lanes[&a.id],
              lanes[&b.id],
              "{a:?} / {b:?}"
            );
          }
        }
      }
    }
  }
}

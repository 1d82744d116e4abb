//! Read-side per-day aggregation over the active window.

use crate::event::Event;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use std::fmt::Write;

/// Net delta for one calendar day of the summary window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayNet {
    /// UTC calendar day.
    pub date: NaiveDate,
    /// Sum of event deltas that day.
    pub net: i64,
    /// False when the day is inside the tracked period but saw no events.
    pub has_data: bool,
}

/// Per-day nets for the 7 calendar days ending at "now".
///
/// Days before the first tracked event are excluded entirely, so a user on
/// their second day sees two rows rather than five empty ones. Built by
/// [`week_summary`] from `read_active()` output — a pure read-side consumer,
/// the log is never touched.
#[derive(Debug, Clone, PartialEq)]
pub struct WeekSummary {
    pub days: Vec<DayNet>,
    pub total_net: i64,
}

impl WeekSummary {
    /// Number of days inside the tracked period.
    pub fn tracked_days(&self) -> usize {
        self.days.len()
    }

    /// Mean net per tracked day, `None` when nothing was tracked.
    pub fn average_net(&self) -> Option<f64> {
        if self.days.is_empty() {
            None
        } else {
            Some(self.total_net as f64 / self.days.len() as f64)
        }
    }

    /// Plain-text rendering, one line per day plus a totals footer.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for day in &self.days {
            let weekday = day.date.format("%a");
            if day.has_data {
                let _ = writeln!(out, "{} ({weekday}): net {:+} kcal", day.date, day.net);
            } else {
                let _ = writeln!(out, "{} ({weekday}): no data", day.date);
            }
        }
        out.push('\n');
        match self.average_net() {
            None => out.push_str("No tracked data in the last 7 days.\n"),
            Some(avg) => {
                let _ = writeln!(out, "Tracked-period net: {:+} kcal", self.total_net);
                let _ = writeln!(out, "Tracked-period average net: {avg:+.1} kcal/day");
            }
        }
        out
    }
}

/// Aggregate events into per-day nets for the 7 days ending at `now`.
///
/// Grouping is by UTC calendar day, summing `delta` — all four event kinds
/// count (an `init` contributes 0, a `reset` contributes its negative
/// delta). Events outside the window are ignored.
pub fn week_summary<'a>(
    events: impl IntoIterator<Item = &'a Event>,
    now: DateTime<Utc>,
) -> WeekSummary {
    let today = now.date_naive();
    let start_day = today - Duration::days(6);

    let mut nets = [0i64; 7];
    let mut has_data = [false; 7];
    let mut first_event_day: Option<NaiveDate> = None;

    for event in events {
        let day = event.timestamp.date_naive();
        if day < start_day || day > today {
            continue;
        }
        let idx = (day.num_days_from_ce() - start_day.num_days_from_ce()) as usize;
        nets[idx] += event.delta;
        has_data[idx] = true;
        if first_event_day.is_none_or(|d| day < d) {
            first_event_day = Some(day);
        }
    }

    let mut days = Vec::new();
    let mut total_net = 0;
    if let Some(tracked_start) = first_event_day {
        for offset in 0..7 {
            let date = start_day + Duration::days(offset);
            if date < tracked_start {
                continue;
            }
            let idx = offset as usize;
            days.push(DayNet {
                date,
                net: nets[idx],
                has_data: has_data[idx],
            });
            total_net += nets[idx];
        }
    }

    WeekSummary { days, total_net }
}

//! Activity timeline for the dashboard scrubber.
//!
//! The timeline is the list of distinct event instants in the selected
//! window with the number of events at each instant. Long windows are
//! downsampled to a point budget, always keeping the final instant so the
//! scrubber can reach the present.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::model::Event;

/// Default point budget, roughly one point per 5 minutes over 24 hours.
pub const DEFAULT_TIMELINE_LIMIT: usize = 288;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelinePoint {
    pub timestamp: DateTime<Utc>,
    pub count: u64,
}

/// Collapse events into ascending (instant, count) points, downsampled to at
/// most `limit` points plus the forced last instant.
pub fn build_timeline(events: &[Event], limit: usize) -> Vec<TimelinePoint> {
    let mut counts: BTreeMap<DateTime<Utc>, u64> = BTreeMap::new();
    for event in events {
        *counts.entry(event.timestamp).or_insert(0) += 1;
    }
    let points: Vec<TimelinePoint> = counts
        .into_iter()
        .map(|(timestamp, count)| TimelinePoint { timestamp, count })
        .collect();
    downsample(points, limit.max(1))
}

fn downsample(points: Vec<TimelinePoint>, limit: usize) -> Vec<TimelinePoint> {
    if points.len() <= limit {
        return points;
    }
    let step = (points.len() / limit).max(1);
    let last_index = points.len() - 1;
    let mut sampled: Vec<TimelinePoint> = points.iter().step_by(step).cloned().collect();
    if last_index % step != 0 {
        sampled.push(points[last_index].clone());
    }
    sampled
}

/// Snap a requested instant to the timeline: the last point at or before
/// `at`, or the first point when every point is later.
pub fn select_point(
    points: &[TimelinePoint],
    at: DateTime<Utc>,
) -> Option<(usize, &TimelinePoint)> {
    if points.is_empty() {
        return None;
    }
    let mut best = 0;
    for (index, point) in points.iter().enumerate() {
        if point.timestamp <= at {
            best = index;
        } else {
            break;
        }
    }
    Some((best, &points[best]))
}

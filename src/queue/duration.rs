//! Queue duration bookkeeping.

use super::manager::QueueManager;

/// Seconds of requested music in the queue, backup filler excluded
pub fn total_duration(queue: &QueueManager) -> f64 {
    queue
        .entries()
        .iter()
        .filter(|e| !e.from_backup_playlist)
        .map(|e| e.duration())
        .sum()
}

/// Seconds until the queue runs dry
pub fn queue_empty_in(queue: &QueueManager) -> f64 {
    let played = queue.head().map_or(0.0, |head| head.play_time);
    total_duration(queue) - played
}

/// Human form of `queue_empty_in`: "now" or "<minutes> minutes"
pub fn queue_empty_in_as_string(queue: &QueueManager) -> String {
    format_eta(queue_empty_in(queue))
}

pub fn format_eta(seconds: f64) -> String {
    if seconds == 0.0 {
        "now".to_string()
    } else {
        format!("{:.1} minutes", seconds / 60.0)
    }
}

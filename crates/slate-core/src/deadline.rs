use chrono::{DateTime, Utc};

use crate::task::Task;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;
const SOON_WINDOW_DAYS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Overdue,
    Today,
    Soon,
    Normal,
    None,
}

impl Urgency {
    pub fn label(self) -> &'static str {
        match self {
            Urgency::Overdue => "overdue",
            Urgency::Today => "today",
            Urgency::Soon => "soon",
            Urgency::Normal => "",
            Urgency::None => "",
        }
    }
}

pub fn classify(task: &Task, now: DateTime<Utc>) -> Urgency {
    let Some(deadline) = task.deadline else {
        return Urgency::None;
    };
    if task.status.is_closed() {
        return Urgency::None;
    }

    let diff_days = days_until(deadline, now);
    if diff_days < 0 {
        Urgency::Overdue
    } else if diff_days == 0 {
        Urgency::Today
    } else if diff_days <= SOON_WINDOW_DAYS {
        Urgency::Soon
    } else {
        Urgency::Normal
    }
}

// Ceiling of the full-precision gap: a deadline 23 hours out and one
// 1 hour out both count as "1 day remaining".
fn days_until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (deadline - now).num_milliseconds();
    let mut days = millis / MILLIS_PER_DAY;
    if millis % MILLIS_PER_DAY > 0 {
        days += 1;
    }
    days
}

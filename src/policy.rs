//! Shift schedule and punctuality classification.
//!
//! Everything here is pure: a punch time-of-day in, a verdict out. The
//! schedule is the fixed store schedule (local time-of-day, not date-bound).

use chrono::NaiveTime;

use crate::model::attendance::Punctuality;

/// Inclusive grace around the morning start: up to 15 minutes early and
/// 5 minutes past still count as on time.
const EARLY_GRACE_MIN: i64 = 15;
const LATE_GRACE_MIN: i64 = 5;

/// Checking out up to 30 minutes before the evening end is still on time.
const EARLY_CHECKOUT_GRACE_MIN: i64 = 30;

#[derive(Debug, Clone)]
pub struct ShiftSchedule {
    pub morning_start: NaiveTime,
    pub lunch_start: NaiveTime,
    pub lunch_end: NaiveTime,
    pub evening_end: NaiveTime,
}

/// Result of classifying an IN or OUT punch. `minutes_diff` is the signed
/// offset from the schedule boundary the verdict was measured against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub status: Punctuality,
    pub message: String,
    pub minutes_diff: i64,
}

fn minutes_of_day(t: NaiveTime) -> i64 {
    use chrono::Timelike;
    (t.hour() * 60 + t.minute()) as i64
}

impl Default for ShiftSchedule {
    fn default() -> Self {
        Self::standard()
    }
}

impl ShiftSchedule {
    /// The store schedule: 09:30 morning start, 13:40-15:30 lunch,
    /// 21:30 evening end.
    pub fn standard() -> Self {
        ShiftSchedule {
            morning_start: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            lunch_start: NaiveTime::from_hms_opt(13, 40, 0).unwrap(),
            lunch_end: NaiveTime::from_hms_opt(15, 30, 0).unwrap(),
            evening_end: NaiveTime::from_hms_opt(21, 30, 0).unwrap(),
        }
    }

    pub fn classify_check_in(&self, punch_time: NaiveTime) -> Verdict {
        let diff = minutes_of_day(punch_time) - minutes_of_day(self.morning_start);

        if diff > LATE_GRACE_MIN {
            Verdict {
                status: Punctuality::Late,
                message: format!("Late by {}", format_minutes(diff)),
                minutes_diff: diff,
            }
        } else if diff < -EARLY_GRACE_MIN {
            Verdict {
                status: Punctuality::Early,
                message: format!("Early by {}", format_minutes(diff.abs())),
                minutes_diff: diff,
            }
        } else {
            Verdict {
                status: Punctuality::OnTime,
                message: "On time".to_string(),
                minutes_diff: diff,
            }
        }
    }

    pub fn classify_check_out(&self, punch_time: NaiveTime) -> Verdict {
        let diff = minutes_of_day(punch_time) - minutes_of_day(self.evening_end);

        if diff > 0 {
            Verdict {
                status: Punctuality::Overtime,
                message: format!("Overtime: {}", format_minutes(diff)),
                minutes_diff: diff,
            }
        } else if diff < -EARLY_CHECKOUT_GRACE_MIN {
            Verdict {
                status: Punctuality::Early,
                message: format!("Early checkout by {}", format_minutes(diff.abs())),
                minutes_diff: diff,
            }
        } else {
            Verdict {
                status: Punctuality::OnTime,
                message: "On time".to_string(),
                minutes_diff: diff,
            }
        }
    }
}

/// Renders a minute count as `"2h 19m"`, omitting zero components.
/// Negative inputs clamp to `"0m"`.
pub fn format_minutes(minutes: i64) -> String {
    if minutes < 0 {
        return "0m".to_string();
    }
    let hours = minutes / 60;
    let mins = minutes % 60;
    match (hours, mins) {
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn check_in_on_time_window_is_inclusive() {
        let schedule = ShiftSchedule::standard();
        assert_eq!(schedule.classify_check_in(t(9, 15)).status, Punctuality::OnTime);
        assert_eq!(schedule.classify_check_in(t(9, 30)).status, Punctuality::OnTime);
        assert_eq!(schedule.classify_check_in(t(9, 35)).status, Punctuality::OnTime);
    }

    #[test]
    fn check_in_one_past_grace_is_late() {
        let verdict = ShiftSchedule::standard().classify_check_in(t(9, 36));
        assert_eq!(verdict.status, Punctuality::Late);
        assert_eq!(verdict.minutes_diff, 6);
        assert_eq!(verdict.message, "Late by 6m");
    }

    #[test]
    fn check_in_one_before_grace_is_early() {
        let verdict = ShiftSchedule::standard().classify_check_in(t(9, 14));
        assert_eq!(verdict.status, Punctuality::Early);
        assert_eq!(verdict.message, "Early by 16m");
    }

    #[test]
    fn very_late_check_in_formats_hours() {
        let verdict = ShiftSchedule::standard().classify_check_in(t(11, 49));
        assert_eq!(verdict.status, Punctuality::Late);
        assert_eq!(verdict.minutes_diff, 139);
        assert_eq!(verdict.message, "Late by 2h 19m");
    }

    #[test]
    fn check_out_boundaries() {
        let schedule = ShiftSchedule::standard();
        assert_eq!(schedule.classify_check_out(t(21, 30)).status, Punctuality::OnTime);
        assert_eq!(schedule.classify_check_out(t(21, 0)).status, Punctuality::OnTime);

        let overtime = schedule.classify_check_out(t(21, 31));
        assert_eq!(overtime.status, Punctuality::Overtime);
        assert_eq!(overtime.message, "Overtime: 1m");

        let early = schedule.classify_check_out(t(20, 59));
        assert_eq!(early.status, Punctuality::Early);
        assert_eq!(early.message, "Early checkout by 31m");
    }

    #[test]
    fn format_minutes_table() {
        assert_eq!(format_minutes(0), "0m");
        assert_eq!(format_minutes(45), "45m");
        assert_eq!(format_minutes(120), "2h");
        assert_eq!(format_minutes(139), "2h 19m");
        assert_eq!(format_minutes(-5), "0m");
    }
}

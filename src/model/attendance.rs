use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

use super::approval::ApprovalStatus;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PunchKind {
    In,
    Out,
    BreakStart,
    BreakEnd,
}

/// Punctuality verdict attached to IN/OUT punches only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Punctuality {
    OnTime,
    Late,
    Early,
    Overtime,
}

/// A single timestamped attendance event. Immutable once appended; the only
/// later write is the non-authoritative `late_approval_status` tag set when
/// an admin decides the linked approval request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Punch {
    #[schema(value_type = String, format = "date-time")]
    pub ts: DateTime<Utc>,

    #[serde(rename = "type")]
    #[schema(example = "IN")]
    pub kind: PunchKind,

    #[serde(default)]
    pub manual: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_actor: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<Punctuality>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "Late by 25m")]
    pub classification_detail: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub late_approval_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub late_approval_status: Option<ApprovalStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Totals {
    pub work_minutes: i64,
    pub break_minutes: i64,
}

/// Per-(user, calendar day) attendance record: the ordered punch sequence
/// plus totals derived from it. Exactly one aggregate exists per user/day;
/// it is created lazily on the first punch.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttendanceAggregate {
    pub id: String,

    #[schema(example = "emp-1024")]
    pub user_id: String,

    /// Local calendar day, ISO `YYYY-MM-DD`.
    #[schema(example = "2026-03-02")]
    pub date: String,

    pub punches: Vec<Punch>,

    pub work_minutes: i64,
    pub break_minutes: i64,
}

impl AttendanceAggregate {
    pub fn new(user_id: &str, date: &str) -> Self {
        AttendanceAggregate {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            date: date.to_string(),
            punches: Vec::new(),
            work_minutes: 0,
            break_minutes: 0,
        }
    }

    /// Totals are never edited directly; every mutation re-derives them from
    /// the full punch history.
    pub fn recompute_totals(&mut self, now: DateTime<Utc>) {
        let totals = compute_totals(&self.punches, now);
        self.work_minutes = totals.work_minutes;
        self.break_minutes = totals.break_minutes;
    }
}

fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 60_000.0
}

/// Folds the punch sequence into accumulated work/break minutes.
///
/// Unmatched OUT and BREAK_END punches are silently ignored; a repeated IN
/// overwrites the previous open span. An IN without a closing OUT is counted
/// up to `now`, so totals always reflect the open shift as of the call.
/// Accumulation is fractional; rounding happens once at the end.
pub fn compute_totals(punches: &[Punch], now: DateTime<Utc>) -> Totals {
    let mut work = 0.0_f64;
    let mut breaks = 0.0_f64;
    let mut last_in: Option<DateTime<Utc>> = None;
    let mut last_break_start: Option<DateTime<Utc>> = None;

    for punch in punches {
        match punch.kind {
            PunchKind::In => last_in = Some(punch.ts),
            PunchKind::Out => {
                if let Some(started) = last_in.take() {
                    work += minutes_between(started, punch.ts);
                }
            }
            PunchKind::BreakStart => {
                if let Some(started) = last_in.take() {
                    work += minutes_between(started, punch.ts);
                    last_break_start = Some(punch.ts);
                }
            }
            PunchKind::BreakEnd => {
                if let Some(started) = last_break_start.take() {
                    breaks += minutes_between(started, punch.ts);
                    last_in = Some(punch.ts);
                }
            }
        }
    }

    if let Some(started) = last_in {
        work += minutes_between(started, now);
    }

    Totals {
        work_minutes: work.round() as i64,
        break_minutes: breaks.round() as i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    fn punch(kind: PunchKind, ts: DateTime<Utc>) -> Punch {
        Punch {
            ts,
            kind,
            manual: false,
            manual_actor: None,
            reason: None,
            classification: None,
            classification_detail: None,
            late_approval_id: None,
            late_approval_status: None,
        }
    }

    #[test]
    fn simple_in_out_pair() {
        let punches = vec![punch(PunchKind::In, at(9, 30)), punch(PunchKind::Out, at(17, 30))];
        let totals = compute_totals(&punches, at(21, 0));
        assert_eq!(totals.work_minutes, 480);
        assert_eq!(totals.break_minutes, 0);
    }

    #[test]
    fn open_shift_counts_up_to_now() {
        let punches = vec![punch(PunchKind::In, at(9, 40))];
        let totals = compute_totals(&punches, at(10, 40));
        assert_eq!(totals.work_minutes, 60);
    }

    #[test]
    fn breaks_split_work_spans() {
        let punches = vec![
            punch(PunchKind::In, at(9, 30)),
            punch(PunchKind::BreakStart, at(13, 40)),
            punch(PunchKind::BreakEnd, at(14, 40)),
            punch(PunchKind::Out, at(18, 40)),
        ];
        let totals = compute_totals(&punches, at(21, 0));
        assert_eq!(totals.work_minutes, 490);
        assert_eq!(totals.break_minutes, 60);
    }

    #[test]
    fn unmatched_out_is_ignored() {
        let punches = vec![punch(PunchKind::Out, at(17, 0))];
        let totals = compute_totals(&punches, at(21, 0));
        assert_eq!(totals.work_minutes, 0);
        assert_eq!(totals.break_minutes, 0);
    }

    #[test]
    fn unmatched_break_end_is_ignored() {
        let punches = vec![punch(PunchKind::BreakEnd, at(15, 0)), punch(PunchKind::Out, at(17, 0))];
        let totals = compute_totals(&punches, at(21, 0));
        assert_eq!(totals.work_minutes, 0);
    }

    #[test]
    fn double_in_overwrites_open_span() {
        let punches = vec![
            punch(PunchKind::In, at(9, 0)),
            punch(PunchKind::In, at(10, 0)),
            punch(PunchKind::Out, at(11, 0)),
        ];
        let totals = compute_totals(&punches, at(21, 0));
        assert_eq!(totals.work_minutes, 60);
    }

    #[test]
    fn deterministic_for_identical_inputs() {
        let punches = vec![
            punch(PunchKind::In, at(9, 30)),
            punch(PunchKind::BreakStart, at(12, 0)),
            punch(PunchKind::BreakEnd, at(12, 30)),
        ];
        let now = at(15, 0);
        assert_eq!(compute_totals(&punches, now), compute_totals(&punches, now));
    }

    #[test]
    fn fractional_spans_round_once_at_the_end() {
        // Two 30-second spans accumulate to exactly one minute.
        let punches = vec![
            punch(PunchKind::In, Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()),
            punch(PunchKind::Out, Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 30).unwrap()),
            punch(PunchKind::In, Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap()),
            punch(PunchKind::Out, Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 30).unwrap()),
        ];
        let totals = compute_totals(&punches, at(21, 0));
        assert_eq!(totals.work_minutes, 1);
    }
}

use std::collections::HashMap;

use chrono::{FixedOffset, NaiveDateTime, TimeZone};
use derive_more::Display;
use serde::Serialize;

use crate::model::clock_event::{ClockEvent, EventKind};

/// Shift a stored UTC instant into the company's local wall-clock time.
pub fn to_local(utc: NaiveDateTime, offset: FixedOffset) -> NaiveDateTime {
    offset.from_utc_datetime(&utc).naive_local()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TransitionError {
    #[display(fmt = "Already clocked in")]
    AlreadyClockedIn,
    #[display(fmt = "Not clocked in")]
    NotClockedIn,
    #[display(fmt = "A break is in progress")]
    BreakInProgress,
    #[display(fmt = "No break in progress")]
    NoBreakInProgress,
}

impl std::error::Error for TransitionError {}

/// Validate `next` against the employee's most recent event.
pub fn check_transition(last: Option<EventKind>, next: EventKind) -> Result<(), TransitionError> {
    let open = matches!(
        last,
        Some(EventKind::ClockIn | EventKind::BreakStart | EventKind::BreakEnd)
    );
    let on_break = last == Some(EventKind::BreakStart);

    match next {
        EventKind::ClockIn if open => Err(TransitionError::AlreadyClockedIn),
        EventKind::ClockIn => Ok(()),
        EventKind::ClockOut | EventKind::BreakStart if !open => Err(TransitionError::NotClockedIn),
        EventKind::ClockOut | EventKind::BreakStart if on_break => {
            Err(TransitionError::BreakInProgress)
        }
        EventKind::ClockOut | EventKind::BreakStart => Ok(()),
        EventKind::BreakEnd if !on_break => Err(TransitionError::NoBreakInProgress),
        EventKind::BreakEnd => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub break_type_id: Option<u64>,
}

impl BreakInterval {
    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes().max(0)
    }
}

/// One clock-in paired with its clock-out, in local time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkSession {
    pub employee_id: u64,
    pub clock_in: NaiveDateTime,
    pub clock_out: Option<NaiveDateTime>,
    pub breaks: Vec<BreakInterval>,
}

impl WorkSession {
    fn open(employee_id: u64, clock_in: NaiveDateTime) -> Self {
        Self {
            employee_id,
            clock_in,
            clock_out: None,
            breaks: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.clock_out.is_some()
    }

    /// Zero until the session has a clock-out.
    pub fn worked_minutes(&self) -> i64 {
        self.clock_out
            .map(|out| (out - self.clock_in).num_minutes().max(0))
            .unwrap_or(0)
    }

    pub fn break_minutes(&self) -> i64 {
        self.breaks.iter().map(BreakInterval::minutes).sum()
    }
}

#[derive(Debug, Default)]
pub struct Timeline {
    pub sessions: HashMap<u64, Vec<WorkSession>>,
    /// Local instants of events that could not be paired.
    pub anomalies: Vec<NaiveDateTime>,
}

impl Timeline {
    pub fn sessions_for(&self, employee_id: u64) -> &[WorkSession] {
        self.sessions
            .get(&employee_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

struct OpenSession {
    session: WorkSession,
    open_break: Option<(NaiveDateTime, Option<u64>)>,
}

/// Pair raw clock events into work sessions per employee.
pub fn build_sessions(events: &[ClockEvent], offset: FixedOffset) -> Timeline {
    let mut by_employee: HashMap<u64, Vec<&ClockEvent>> = HashMap::new();
    for event in events {
        by_employee.entry(event.employee_id).or_default().push(event);
    }

    let mut timeline = Timeline::default();

    for (employee_id, mut stream) in by_employee {
        stream.sort_by_key(|e| (e.occurred_at, e.id));

        let mut sessions = Vec::new();
        let mut open: Option<OpenSession> = None;

        for event in stream {
            let at = to_local(event.occurred_at, offset);
            match event.kind {
                EventKind::ClockIn => {
                    if let Some(previous) = open.take() {
                        // never clocked out; keep it as incomplete
                        timeline.anomalies.push(previous.session.clock_in);
                        if let Some((break_start, _)) = previous.open_break {
                            timeline.anomalies.push(break_start);
                        }
                        sessions.push(previous.session);
                    }
                    open = Some(OpenSession {
                        session: WorkSession::open(employee_id, at),
                        open_break: None,
                    });
                }
                EventKind::ClockOut => match open.take() {
                    Some(mut current) => {
                        if let Some((start, break_type_id)) = current.open_break.take() {
                            current.session.breaks.push(BreakInterval {
                                start,
                                end: at,
                                break_type_id,
                            });
                        }
                        current.session.clock_out = Some(at);
                        sessions.push(current.session);
                    }
                    None => timeline.anomalies.push(at),
                },
                EventKind::BreakStart => match open.as_mut() {
                    Some(current) if current.open_break.is_none() => {
                        current.open_break = Some((at, event.break_type_id));
                    }
                    _ => timeline.anomalies.push(at),
                },
                EventKind::BreakEnd => {
                    let closed = open.as_mut().and_then(|current| {
                        let (start, break_type_id) = current.open_break.take()?;
                        current.session.breaks.push(BreakInterval {
                            start,
                            end: at,
                            break_type_id,
                        });
                        Some(())
                    });
                    if closed.is_none() {
                        timeline.anomalies.push(at);
                    }
                }
            }
        }

        if let Some(current) = open {
            if let Some((break_start, _)) = current.open_break {
                timeline.anomalies.push(break_start);
            }
            sessions.push(current.session);
        }

        timeline.sessions.insert(employee_id, sessions);
    }

    timeline
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::fixtures::*;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn to_local_applies_positive_and_negative_offsets() {
        let utc_time = at(2026, 1, 5, 23, 30);
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let minus_five = FixedOffset::west_opt(5 * 3600).unwrap();
        assert_eq!(to_local(utc_time, plus_two), at(2026, 1, 6, 1, 30));
        assert_eq!(to_local(utc_time, minus_five), at(2026, 1, 5, 18, 30));
    }

    #[test]
    fn transitions_follow_clock_state_machine() {
        use EventKind::*;
        assert_eq!(check_transition(None, ClockIn), Ok(()));
        assert_eq!(check_transition(Some(ClockOut), ClockIn), Ok(()));
        assert_eq!(
            check_transition(Some(ClockIn), ClockIn),
            Err(TransitionError::AlreadyClockedIn)
        );
        assert_eq!(
            check_transition(None, ClockOut),
            Err(TransitionError::NotClockedIn)
        );
        assert_eq!(check_transition(Some(ClockIn), BreakStart), Ok(()));
        assert_eq!(
            check_transition(Some(BreakStart), ClockOut),
            Err(TransitionError::BreakInProgress)
        );
        assert_eq!(check_transition(Some(BreakStart), BreakEnd), Ok(()));
        assert_eq!(
            check_transition(Some(BreakEnd), BreakEnd),
            Err(TransitionError::NoBreakInProgress)
        );
        assert_eq!(check_transition(Some(BreakEnd), ClockOut), Ok(()));
    }

    #[test]
    fn pairs_sessions_and_breaks_out_of_order() {
        let mut lunch_start = event(3, 7, EventKind::BreakStart, at(2026, 1, 5, 12, 0));
        lunch_start.break_type_id = Some(4);
        let events = vec![
            event(4, 7, EventKind::BreakEnd, at(2026, 1, 5, 12, 45)),
            event(5, 7, EventKind::ClockOut, at(2026, 1, 5, 17, 10)),
            lunch_start,
            event(1, 7, EventKind::ClockIn, at(2026, 1, 5, 8, 55)),
        ];

        let timeline = build_sessions(&events, utc());
        let sessions = timeline.sessions_for(7);
        assert_eq!(sessions.len(), 1);
        assert!(timeline.anomalies.is_empty());

        let session = &sessions[0];
        assert_eq!(session.worked_minutes(), 8 * 60 + 15);
        assert_eq!(session.break_minutes(), 45);
        assert_eq!(session.breaks[0].break_type_id, Some(4));
    }

    #[test]
    fn overnight_session_stays_single() {
        let events = vec![
            event(1, 2, EventKind::ClockIn, at(2026, 1, 5, 21, 58)),
            event(2, 2, EventKind::ClockOut, at(2026, 1, 6, 6, 3)),
        ];
        let timeline = build_sessions(&events, utc());
        let sessions = timeline.sessions_for(2);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].worked_minutes(), 8 * 60 + 5);
    }

    #[test]
    fn double_clock_in_keeps_incomplete_session() {
        let events = vec![
            event(1, 3, EventKind::ClockIn, at(2026, 1, 5, 9, 0)),
            event(2, 3, EventKind::ClockIn, at(2026, 1, 6, 9, 0)),
            event(3, 3, EventKind::ClockOut, at(2026, 1, 6, 17, 0)),
        ];
        let timeline = build_sessions(&events, utc());
        let sessions = timeline.sessions_for(3);
        assert_eq!(sessions.len(), 2);
        assert!(!sessions[0].is_complete());
        assert_eq!(sessions[0].worked_minutes(), 0);
        assert_eq!(sessions[1].worked_minutes(), 480);
        assert_eq!(timeline.anomalies, vec![at(2026, 1, 5, 9, 0)]);
    }

    #[test]
    fn open_break_closes_at_clock_out() {
        let events = vec![
            event(1, 4, EventKind::ClockIn, at(2026, 1, 5, 9, 0)),
            event(2, 4, EventKind::BreakStart, at(2026, 1, 5, 16, 30)),
            event(3, 4, EventKind::ClockOut, at(2026, 1, 5, 17, 0)),
        ];
        let timeline = build_sessions(&events, utc());
        assert_eq!(timeline.sessions_for(4)[0].break_minutes(), 30);
    }

    #[test]
    fn stray_events_are_counted_as_anomalies() {
        let events = vec![
            event(1, 5, EventKind::BreakEnd, at(2026, 1, 5, 8, 0)),
            event(2, 5, EventKind::BreakStart, at(2026, 1, 5, 8, 30)),
            event(3, 5, EventKind::ClockOut, at(2026, 1, 5, 8, 45)),
        ];
        let timeline = build_sessions(&events, utc());
        assert!(timeline.sessions_for(5).is_empty());
        assert_eq!(timeline.anomalies.len(), 3);
    }

    #[test]
    fn local_offset_moves_session_to_next_day() {
        let events = vec![
            event(1, 6, EventKind::ClockIn, at(2026, 1, 5, 23, 0)),
            event(2, 6, EventKind::ClockOut, at(2026, 1, 6, 7, 0)),
        ];
        let timeline = build_sessions(&events, FixedOffset::east_opt(3600).unwrap());
        assert_eq!(timeline.sessions_for(6)[0].clock_in, at(2026, 1, 6, 0, 0));
    }

    #[test]
    fn break_left_open_by_a_new_clock_in_is_an_anomaly() {
        let events = vec![
            event(1, 8, EventKind::ClockIn, at(2026, 1, 5, 9, 0)),
            event(2, 8, EventKind::BreakStart, at(2026, 1, 5, 12, 0)),
            event(3, 8, EventKind::ClockIn, at(2026, 1, 6, 9, 0)),
            event(4, 8, EventKind::ClockOut, at(2026, 1, 6, 17, 0)),
        ];
        let timeline = build_sessions(&events, utc());
        let sessions = timeline.sessions_for(8);
        assert_eq!(sessions.len(), 2);
        assert!(sessions[0].breaks.is_empty());
        assert_eq!(
            timeline.anomalies,
            vec![at(2026, 1, 5, 9, 0), at(2026, 1, 5, 12, 0)]
        );
    }

    #[test]
    fn break_still_open_at_end_of_stream_is_an_anomaly() {
        let events = vec![
            event(1, 9, EventKind::ClockIn, at(2026, 1, 5, 9, 0)),
            event(2, 9, EventKind::BreakStart, at(2026, 1, 5, 12, 0)),
        ];
        let timeline = build_sessions(&events, utc());
        assert_eq!(timeline.sessions_for(9).len(), 1);
        assert_eq!(timeline.anomalies, vec![at(2026, 1, 5, 12, 0)]);
    }
}

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use super::{ledger::DailyLedger, round2};
use crate::model::break_type::BreakType;

#[derive(Debug, Clone, Default, Serialize)]
pub struct BreakEmployeeRow {
    pub employee_id: u64,
    pub employee_name: String,
    pub occurrences: u32,
    pub total_minutes: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BreakTypeRow {
    /// `None` groups breaks recorded without a type.
    pub break_type_id: Option<u64>,
    pub name: String,
    pub paid: bool,
    pub max_minutes: Option<u32>,
    pub occurrences: u32,
    pub total_minutes: i64,
    pub average_minutes: f64,
    pub longest_minutes: i64,
    pub exceeded_count: u32,
    pub employees: usize,
    pub by_employee: Vec<BreakEmployeeRow>,
}

#[derive(Default)]
struct Acc {
    occurrences: u32,
    total: i64,
    longest: i64,
    exceeded: u32,
    by_employee: BTreeMap<u64, (u32, i64)>,
}

pub fn build(
    ledger: &DailyLedger,
    names: &HashMap<u64, String>,
    break_types: &[BreakType],
) -> Vec<BreakTypeRow> {
    let types: HashMap<u64, &BreakType> = break_types.iter().map(|b| (b.id, b)).collect();
    let mut grouped: BTreeMap<Option<u64>, Acc> = BTreeMap::new();

    let breaks = ledger
        .days
        .iter()
        .flat_map(|d| d.sessions.iter())
        .flat_map(|s| s.breaks.iter().map(move |b| (s.employee_id, b)));

    for (employee_id, interval) in breaks {
        // unknown ids are folded into the unspecified bucket
        let key = interval.break_type_id.filter(|id| types.contains_key(id));
        let minutes = interval.minutes();
        let limit = key
            .and_then(|id| types.get(&id))
            .and_then(|b| b.max_minutes);

        let acc = grouped.entry(key).or_default();
        acc.occurrences += 1;
        acc.total += minutes;
        acc.longest = acc.longest.max(minutes);
        if limit.is_some_and(|max| minutes > i64::from(max)) {
            acc.exceeded += 1;
        }
        let per_employee = acc.by_employee.entry(employee_id).or_default();
        per_employee.0 += 1;
        per_employee.1 += minutes;
    }

    grouped
        .into_iter()
        .map(|(key, acc)| {
            let break_type = key.and_then(|id| types.get(&id).copied());
            BreakTypeRow {
                break_type_id: key,
                name: break_type.map_or_else(|| "Unspecified".to_string(), |b| b.name.clone()),
                paid: break_type.is_some_and(|b| b.paid),
                max_minutes: break_type.and_then(|b| b.max_minutes),
                occurrences: acc.occurrences,
                total_minutes: acc.total,
                average_minutes: round2(acc.total as f64 / f64::from(acc.occurrences.max(1))),
                longest_minutes: acc.longest,
                exceeded_count: acc.exceeded,
                employees: acc.by_employee.len(),
                by_employee: acc
                    .by_employee
                    .into_iter()
                    .map(|(employee_id, (occurrences, total_minutes))| BreakEmployeeRow {
                        employee_id,
                        employee_name: names.get(&employee_id).cloned().unwrap_or_default(),
                        occurrences,
                        total_minutes,
                    })
                    .collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::clock_event::{ClockEvent, EventKind};
    use crate::reporting::fixtures::*;

    fn typed(id: u64, employee_id: u64, kind: EventKind, h: u32, m: u32, ty: Option<u64>) -> ClockEvent {
        let mut e = event(id, employee_id, kind, at(2026, 1, 5, h, m));
        e.break_type_id = ty;
        e
    }

    #[test]
    fn groups_breaks_by_type_and_flags_overruns() {
        let mut data = dataset(date(2026, 1, 5), date(2026, 1, 5));
        data.employees.push(employee(2, "ben"));
        data.break_types = vec![BreakType {
            id: 3,
            name: "Lunch".into(),
            paid: false,
            max_minutes: Some(30),
        }];
        data.events = vec![
            typed(1, 1, EventKind::ClockIn, 9, 0, None),
            typed(2, 1, EventKind::BreakStart, 12, 0, Some(3)),
            typed(3, 1, EventKind::BreakEnd, 12, 45, None),
            typed(4, 1, EventKind::BreakStart, 15, 0, None),
            typed(5, 1, EventKind::BreakEnd, 15, 10, None),
            typed(6, 1, EventKind::ClockOut, 17, 0, None),
            typed(7, 2, EventKind::ClockIn, 9, 0, None),
            typed(8, 2, EventKind::BreakStart, 12, 0, Some(3)),
            typed(9, 2, EventKind::BreakEnd, 12, 25, None),
            typed(10, 2, EventKind::ClockOut, 17, 0, None),
        ];

        let ledger = DailyLedger::build(&data);
        let rows = build(&ledger, &data.employee_names(), &data.break_types);

        assert_eq!(rows.len(), 2);
        let unspecified = &rows[0];
        assert_eq!(unspecified.break_type_id, None);
        assert_eq!(unspecified.name, "Unspecified");
        assert_eq!(unspecified.total_minutes, 10);

        let lunch = &rows[1];
        assert_eq!(lunch.name, "Lunch");
        assert_eq!(lunch.occurrences, 2);
        assert_eq!(lunch.total_minutes, 70);
        assert_eq!(lunch.average_minutes, 35.0);
        assert_eq!(lunch.longest_minutes, 45);
        assert_eq!(lunch.exceeded_count, 1);
        assert_eq!(lunch.employees, 2);
        assert_eq!(lunch.by_employee[1].employee_name, "ben Test");
        assert_eq!(lunch.by_employee[1].total_minutes, 25);
    }
}

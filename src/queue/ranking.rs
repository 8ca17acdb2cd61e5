use std::cmp::Ordering;

use super::collation::compare_names;
use super::types::{QueueEntry, QueueFilter};
use crate::models::enums::ApplicationStatus;

/// Display order of two queue entries.
///
/// 1. `waiting` before anything else.
/// 2. Between two waiting entries, flagged medication first.
/// 3. Then earlier check-in first, when both have one.
/// 4. Otherwise by name, pt-BR collation.
pub fn compare_entries(a: &QueueEntry, b: &QueueEntry) -> Ordering {
    let a_waiting = a.application_status == ApplicationStatus::Waiting;
    let b_waiting = b.application_status == ApplicationStatus::Waiting;

    match (a_waiting, b_waiting) {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        (true, true) => {
            match (a.has_flagged_medication, b.has_flagged_medication) {
                (true, false) => return Ordering::Less,
                (false, true) => return Ordering::Greater,
                _ => {}
            }
            if let (Some(ta), Some(tb)) = (a.check_in_time, b.check_in_time) {
                return ta.cmp(&tb);
            }
        }
        (false, false) => {}
    }

    compare_names(&a.name, &b.name)
}

/// Filter entries by the active statuses and order them for display.
pub fn rank(entries: &[QueueEntry], filter: &QueueFilter) -> Vec<QueueEntry> {
    let mut visible: Vec<QueueEntry> = entries
        .iter()
        .filter(|e| filter.matches(e))
        .cloned()
        .collect();
    stable_sort_by(&mut visible, compare_entries);
    visible
}

/// Stable insertion sort.
///
/// `compare_entries` is not transitive when some waiting entries lack a
/// check-in time (time order and name order can disagree), and the std sort
/// may panic on such comparators. Queues are a few dozen entries long.
fn stable_sort_by<T, F>(items: &mut [T], mut compare: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    for i in 1..items.len() {
        let mut j = i;
        while j > 0 && compare(&items[j - 1], &items[j]) == Ordering::Greater {
            items.swap(j - 1, j);
            j -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures::at;
    use crate::models::enums::TreatmentStatus;
    use uuid::Uuid;

    fn entry(name: &str, status: ApplicationStatus) -> QueueEntry {
        QueueEntry {
            patient_id: Uuid::new_v4(),
            name: name.into(),
            cpf: "CPF não informado".into(),
            treatment_label: "Sem tratamento ativo".into(),
            treatment_status: TreatmentStatus::Inactive,
            application_status: status,
            has_flagged_medication: false,
            has_outstanding_debt: false,
            session_id: Uuid::new_v4(),
            check_in_time: None,
        }
    }

    fn waiting(name: &str, flagged: bool, check_in: Option<(u32, u32)>) -> QueueEntry {
        QueueEntry {
            has_flagged_medication: flagged,
            check_in_time: check_in.map(|(h, m)| at(2026, 3, 2, h, m)),
            ..entry(name, ApplicationStatus::Waiting)
        }
    }

    fn names(entries: &[QueueEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn empty_filter_keeps_every_entry() {
        let entries = vec![
            entry("Ana", ApplicationStatus::Completed),
            entry("Bia", ApplicationStatus::Unscheduled),
            entry("Caio", ApplicationStatus::Scheduled),
        ];
        let ranked = rank(&entries, &QueueFilter::all());
        assert_eq!(ranked.len(), entries.len());
    }

    #[test]
    fn filter_keeps_only_active_statuses() {
        let entries = vec![
            entry("Ana", ApplicationStatus::Completed),
            entry("Bia", ApplicationStatus::Waiting),
            entry("Caio", ApplicationStatus::Scheduled),
        ];
        let ranked = rank(&entries, &QueueFilter::from_statuses([ApplicationStatus::Waiting]));
        assert_eq!(names(&ranked), vec!["Bia"]);

        let ranked = rank(&entries, &QueueFilter::default());
        assert_eq!(names(&ranked), vec!["Bia", "Caio"]);
    }

    #[test]
    fn waiting_entry_precedes_regardless_of_name() {
        let a = entry("Abel", ApplicationStatus::Scheduled);
        let z = waiting("Zuleica", false, None);
        assert_eq!(compare_entries(&z, &a), Ordering::Less);
        assert_eq!(compare_entries(&a, &z), Ordering::Greater);

        let ranked = rank(&[a, z], &QueueFilter::all());
        assert_eq!(names(&ranked), vec!["Zuleica", "Abel"]);
    }

    #[test]
    fn flagged_waiting_entries_order_by_check_in() {
        let a = waiting("Zeca", true, Some((9, 0)));
        let b = waiting("Ana", true, Some((9, 5)));
        let ranked = rank(&[b, a], &QueueFilter::all());
        assert_eq!(names(&ranked), vec!["Zeca", "Ana"]);
    }

    #[test]
    fn flagged_waiting_entry_precedes_unflagged() {
        let a = waiting("Ana", false, Some((8, 0)));
        let b = waiting("Bia", true, Some((10, 0)));
        let ranked = rank(&[a, b], &QueueFilter::all());
        assert_eq!(names(&ranked), vec!["Bia", "Ana"]);
    }

    #[test]
    fn missing_check_in_falls_back_to_name() {
        let a = waiting("Carla", false, None);
        let b = waiting("Bruno", false, Some((9, 0)));
        assert_eq!(compare_entries(&a, &b), Ordering::Greater);
    }

    #[test]
    fn non_waiting_entries_sort_by_name() {
        let entries = vec![
            entry("Élio", ApplicationStatus::InAttendance),
            entry("Zeca", ApplicationStatus::Scheduled),
            entry("Eduardo", ApplicationStatus::Completed),
        ];
        let ranked = rank(&entries, &QueueFilter::all());
        assert_eq!(names(&ranked), vec!["Eduardo", "Élio", "Zeca"]);
    }

    #[test]
    fn full_queue_order() {
        let entries = vec![
            entry("Abel", ApplicationStatus::Scheduled),
            waiting("Dora", false, Some((8, 30))),
            waiting("Caio", true, Some((9, 10))),
            entry("Beto", ApplicationStatus::InAttendance),
            waiting("Edu", false, Some((8, 0))),
            waiting("Fabi", true, Some((9, 0))),
        ];
        let ranked = rank(&entries, &QueueFilter::all());
        assert_eq!(
            names(&ranked),
            vec!["Fabi", "Caio", "Edu", "Dora", "Abel", "Beto"]
        );
    }

    #[test]
    fn intransitive_inputs_do_not_panic() {
        // Time order says Zélia < Carla, names put Bento between them.
        let entries = vec![
            waiting("Zélia", false, Some((9, 0))),
            waiting("Bento", false, None),
            waiting("Carla", false, Some((9, 5))),
        ];
        let ranked = rank(&entries, &QueueFilter::all());
        assert_eq!(ranked.len(), 3);
    }
}

//! Suppression of alarms that were already present in the previous status.

use std::collections::HashSet;

use crate::domain::AlarmDetail;

/// Result of comparing the current alarms against the previous status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmDelta {
    /// Current alarms not present in the previous status, in original order.
    pub remaining: Vec<AlarmDetail>,
    /// Whether at least one current alarm was already present before.
    pub suppressed_any: bool,
}

impl AlarmDelta {
    /// Strip every alarm whose id also appears in `previous`.
    ///
    /// With no previous status the current alarms pass through untouched.
    pub fn filter(current: Vec<AlarmDetail>, previous: Option<&[AlarmDetail]>) -> Self {
        let Some(previous) = previous else {
            return Self {
                remaining: current,
                suppressed_any: false,
            };
        };

        let previous_ids: HashSet<&str> = previous.iter().map(|a| a.alarm_id.as_str()).collect();
        let before = current.len();
        let remaining: Vec<AlarmDetail> = current
            .into_iter()
            .filter(|alarm| !previous_ids.contains(alarm.alarm_id.as_str()))
            .collect();

        Self {
            suppressed_any: remaining.len() != before,
            remaining,
        }
    }

    /// Whether this status change warrants a notification run.
    ///
    /// Any repeated alarm skips the whole run, even if new alarms came with it.
    pub fn should_notify(&self) -> bool {
        !self.suppressed_any && !self.remaining.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alarms(ids: &[&str]) -> Vec<AlarmDetail> {
        ids.iter()
            .map(|id| AlarmDetail::new(*id, format!("alarm {}", id)))
            .collect()
    }

    fn ids(alarms: &[AlarmDetail]) -> Vec<&str> {
        alarms.iter().map(|a| a.alarm_id.as_str()).collect()
    }

    #[test]
    fn test_no_previous_status_passes_through() {
        let current = vec![
            AlarmDetail::new("A1", "Door open"),
            AlarmDetail::new("A2", "Overheat"),
        ];
        let delta = AlarmDelta::filter(current.clone(), None);
        assert_eq!(delta.remaining, current);
        assert!(!delta.suppressed_any);
        assert!(delta.should_notify());
    }

    #[test]
    fn test_repeated_alarm_suppresses_run() {
        let delta = AlarmDelta::filter(
            vec![AlarmDetail::new("A1", "Door open")],
            Some(&[AlarmDetail::new("A1", "Door open")]),
        );
        assert!(delta.suppressed_any);
        assert!(delta.remaining.is_empty());
        assert!(!delta.should_notify());
    }

    #[test]
    fn test_removes_exact_intersection_preserving_order() {
        let previous = alarms(&["A2", "A4", "A9"]);
        let delta = AlarmDelta::filter(alarms(&["A5", "A4", "A1", "A2", "A3"]), Some(&previous));
        assert_eq!(ids(&delta.remaining), vec!["A5", "A1", "A3"]);
        assert!(delta.suppressed_any);
        // New alarms came along, but a repeated one still gates the run off.
        assert!(!delta.should_notify());
    }

    #[test]
    fn test_match_is_by_id_only() {
        let delta = AlarmDelta::filter(
            vec![AlarmDetail::new("A1", "Door open")],
            Some(&[AlarmDetail::new("A1", "Something else entirely")]),
        );
        assert!(delta.suppressed_any);
    }

    #[test]
    fn test_disjoint_previous_notifies() {
        let previous = alarms(&["B1"]);
        let delta = AlarmDelta::filter(alarms(&["A1", "A2"]), Some(&previous));
        assert!(!delta.suppressed_any);
        assert_eq!(ids(&delta.remaining), vec!["A1", "A2"]);
        assert!(delta.should_notify());
    }

    #[test]
    fn test_empty_current_does_not_notify() {
        let delta = AlarmDelta::filter(Vec::new(), None);
        assert!(!delta.suppressed_any);
        assert!(!delta.should_notify());

        let previous = alarms(&["A1"]);
        let delta = AlarmDelta::filter(Vec::new(), Some(&previous));
        assert!(!delta.suppressed_any);
        assert!(!delta.should_notify());
    }
}

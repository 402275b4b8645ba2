//! Resolution of which users hear about which alarms.

use std::collections::HashSet;

use tracing::debug;

use crate::domain::{AlarmDetail, User};

/// A user selected for notification, with their private copy of the alarm list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub user: User,
    pub alarms: Vec<AlarmDetail>,
}

/// Decide the audience for a machine's alarms.
///
/// Users without delivery tokens or who blacklist the machine are dropped; every
/// remaining user gets the alarms minus their blacklisted alarm ids. A user whose
/// list ends up empty is still returned.
pub fn resolve(machine_id: &str, alarms: &[AlarmDetail], candidates: Vec<User>) -> Vec<Recipient> {
    let mut seen: HashSet<String> = HashSet::new();

    candidates
        .into_iter()
        .filter(|user| is_eligible(user, machine_id))
        .filter(|user| seen.insert(user.id.clone()))
        .map(|user| {
            let alarms: Vec<AlarmDetail> = alarms
                .iter()
                .filter(|alarm| !user.blacklists_alarm(&alarm.alarm_id))
                .cloned()
                .collect();
            Recipient { user, alarms }
        })
        .collect()
}

fn is_eligible(user: &User, machine_id: &str) -> bool {
    if user.delivery_tokens().is_none() {
        debug!(user = %user.email, "Skipping user without notification tokens");
        return false;
    }
    if user.blacklists_machine(machine_id) {
        debug!(user = %user.email, machine_id, "Skipping user who blacklisted the machine");
        return false;
    }
    true
}

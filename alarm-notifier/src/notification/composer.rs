//! Title and body rendering for alarm notifications.

use std::fmt::Write as _;

use crate::domain::{AlarmDetail, SignalLight, SignalLights};

/// Maximum number of alarm lines in a body.
pub const MAX_LISTED_ALARMS: usize = 3;

const CHANNEL_GLYPHS: [&str; 4] = ["🟢", "🟡", "🔴", "🔵"];
const ALL_OFF_GLYPH: &str = "⚫";
const BLINKING_SUFFIX: &str = "(blinking)";

/// Renders the notification text for one run.
///
/// The title is shared by every recipient; the body depends on each recipient's
/// filtered alarms.
#[derive(Debug, Clone)]
pub struct MessageComposer {
    title: String,
    status_has_alarms: bool,
}

impl MessageComposer {
    /// `status_alarms` is the machine-wide list before any per-user filtering.
    pub fn new(machine_name: &str, lights: &SignalLights, status_alarms: &[AlarmDetail]) -> Self {
        Self {
            title: build_title(lights, machine_name),
            status_has_alarms: !status_alarms.is_empty(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self, alarms: &[AlarmDetail]) -> String {
        if !self.status_has_alarms {
            return String::new();
        }
        build_body(alarms)
    }
}

/// `"<machine> | "` followed by one marker per lit channel, or the all-off marker.
pub fn build_title(lights: &SignalLights, machine_name: &str) -> String {
    let mut title = format!("{} | ", machine_name);

    if lights.all_off() {
        title.push_str(ALL_OFF_GLYPH);
        return title;
    }

    for (light, glyph) in lights.channels().iter().zip(CHANNEL_GLYPHS) {
        match light {
            SignalLight::Off => {}
            SignalLight::On => title.push_str(glyph),
            SignalLight::Blinking => {
                title.push_str(glyph);
                title.push_str(BLINKING_SUFFIX);
            }
        }
    }
    title
}

/// `"ERR:"` header, up to three `id | description` lines and a `+ N` overflow marker.
pub fn build_body(alarms: &[AlarmDetail]) -> String {
    let mut body = String::from("ERR:\n");
    for alarm in alarms.iter().take(MAX_LISTED_ALARMS) {
        let _ = writeln!(body, "{} | {}", alarm.alarm_id, alarm.alarm_description);
    }
    if alarms.len() > MAX_LISTED_ALARMS {
        let _ = write!(body, "+ {}", alarms.len() - MAX_LISTED_ALARMS);
    }
    body
}

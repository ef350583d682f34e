use serde::{Deserialize, Serialize};

use crate::breath::PhaseKind;

/// Every state change in the breath engine produces an Event.
/// The UI drains them after each input or timer call and reacts
/// (animations, sounds, counters); the session ledger records cycles from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BreathEvent {
    /// A phase began; `duration_ms` is already speed-adjusted.
    PhaseStarted {
        kind: PhaseKind,
        color: ColorHint,
        duration_ms: u32,
    },
    /// A phase's timer ran out.
    PhaseFinished { kind: PhaseKind },
    /// A valid cycle ended.
    BreathCompleted {
        breath_count: u32,
        inhale_secs: f64,
        exhale_secs: f64,
        total_secs: f64,
    },
    /// Visual cue only (ring ripple around the circle).
    RippleRequested,
}

/// Target color the UI should blend toward during a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorHint {
    /// Resting/exhale color.
    Base,
    /// Inhale color.
    Complement,
    /// Hold color, completing the triad.
    Retention,
}

impl ColorHint {
    pub fn for_phase(kind: PhaseKind) -> Self {
        match kind {
            PhaseKind::Inhale => ColorHint::Complement,
            PhaseKind::Hold => ColorHint::Retention,
            PhaseKind::Exhale => ColorHint::Base,
        }
    }

    pub fn rgb(&self) -> (u8, u8, u8) {
        match self {
            ColorHint::Base => (255, 140, 0),
            ColorHint::Complement => (0, 150, 136),
            ColorHint::Retention => (139, 0, 255),
        }
    }
}

use serde::{Deserialize, Serialize};

use crate::error::PatternError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKind {
    Inhale,
    Hold,
    Exhale,
}

impl PhaseKind {
    /// Classify a free-form phase name ("Inhale", "hold in", "Exhalar", ...).
    ///
    /// Anything that is neither an inhale nor an exhale is a hold.
    pub fn from_name(name: &str) -> Self {
        let name = name.to_lowercase();
        if name.contains("inh") {
            PhaseKind::Inhale
        } else if name.contains("exh") {
            PhaseKind::Exhale
        } else {
            PhaseKind::Hold
        }
    }
}

/// Key state a pattern phase expects before it may start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyState {
    Pressed,
    Released,
}

impl KeyState {
    pub fn from_pressed(pressed: bool) -> Self {
        if pressed {
            KeyState::Pressed
        } else {
            KeyState::Released
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreathPhase {
    pub kind: PhaseKind,
    pub duration_ms: u32,
}

impl BreathPhase {
    pub fn new(kind: PhaseKind, duration_ms: u32) -> Self {
        Self { kind, duration_ms }
    }

    pub fn inhale(duration_ms: u32) -> Self {
        Self::new(PhaseKind::Inhale, duration_ms)
    }

    pub fn hold(duration_ms: u32) -> Self {
        Self::new(PhaseKind::Hold, duration_ms)
    }

    pub fn exhale(duration_ms: u32) -> Self {
        Self::new(PhaseKind::Exhale, duration_ms)
    }
}

/// A named step as written by users: `{ name = "Inhale", seconds = 4 }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedStep {
    pub name: String,
    pub seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawPattern {
    name: String,
    phases: Vec<BreathPhase>,
}

/// Immutable, validated sequence of timed phases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPattern", into = "RawPattern")]
pub struct BreathPattern {
    name: String,
    phases: Vec<BreathPhase>,
    expected: Vec<KeyState>,
}

impl TryFrom<RawPattern> for BreathPattern {
    type Error = PatternError;

    fn try_from(raw: RawPattern) -> Result<Self, Self::Error> {
        BreathPattern::new(raw.name, raw.phases)
    }
}

impl From<BreathPattern> for RawPattern {
    fn from(pattern: BreathPattern) -> Self {
        RawPattern {
            name: pattern.name,
            phases: pattern.phases,
        }
    }
}

impl BreathPattern {
    /// Validate `phases` and derive the expected key state of each one.
    ///
    /// # Errors
    /// `Empty` for no phases, `ZeroDuration` for a phase of 0 ms.
    pub fn new(name: impl Into<String>, phases: Vec<BreathPhase>) -> Result<Self, PatternError> {
        if phases.is_empty() {
            return Err(PatternError::Empty);
        }
        if let Some(index) = phases.iter().position(|p| p.duration_ms == 0) {
            return Err(PatternError::ZeroDuration { index });
        }

        let mut expected: Vec<KeyState> = Vec::with_capacity(phases.len());
        for phase in &phases {
            let state = match phase.kind {
                PhaseKind::Inhale => KeyState::Pressed,
                PhaseKind::Exhale => KeyState::Released,
                // Holds keep whatever the key was doing before them.
                PhaseKind::Hold => expected.last().copied().unwrap_or(KeyState::Pressed),
            };
            expected.push(state);
        }

        Ok(Self {
            name: name.into(),
            phases,
            expected,
        })
    }

    /// Build from user-facing named steps with durations in seconds.
    pub fn from_named_steps(name: impl Into<String>, steps: &[NamedStep]) -> Result<Self, PatternError> {
        let phases = steps
            .iter()
            .map(|s| {
                let ms = (s.seconds * 1000.0).round();
                let duration_ms = if ms.is_finite() && ms > 0.0 {
                    ms.min(u32::MAX as f64) as u32
                } else {
                    0
                };
                BreathPhase::new(PhaseKind::from_name(&s.name), duration_ms)
            })
            .collect();
        Self::new(name, phases)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phases(&self) -> &[BreathPhase] {
        &self.phases
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn phase(&self, index: usize) -> Option<&BreathPhase> {
        self.phases.get(index)
    }

    pub fn expected_key_states(&self) -> &[KeyState] {
        &self.expected
    }

    pub fn expected_key_state(&self, index: usize) -> Option<KeyState> {
        self.expected.get(index).copied()
    }

    pub fn cycle_duration_ms(&self) -> u64 {
        self.phases.iter().map(|p| p.duration_ms as u64).sum()
    }

    pub fn breaths_per_minute(&self) -> f64 {
        60_000.0 / self.cycle_duration_ms() as f64
    }
}

/// Catalog entry for a built-in technique.
#[derive(Debug, Clone, Serialize)]
pub struct PatternInfo {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub pattern: BreathPattern,
}

fn seconds(kind: PhaseKind, s: u32) -> BreathPhase {
    BreathPhase::new(kind, s * 1000)
}

/// Built-in breathing techniques.
pub fn builtin_patterns() -> Vec<PatternInfo> {
    use PhaseKind::*;

    let table: [(&str, &str, &str, Vec<BreathPhase>); 5] = [
        (
            "box",
            "Box breathing",
            "Equal inhale, hold, exhale and hold. Steadies attention.",
            vec![
                seconds(Inhale, 4),
                seconds(Hold, 4),
                seconds(Exhale, 4),
                seconds(Hold, 4),
            ],
        ),
        (
            "4-7-8",
            "4-7-8",
            "Long hold and slow exhale, used to wind down before sleep.",
            vec![seconds(Inhale, 4), seconds(Hold, 7), seconds(Exhale, 8)],
        ),
        (
            "coherence",
            "Coherent breathing",
            "Five seconds in, five seconds out, about six breaths a minute.",
            vec![seconds(Inhale, 5), seconds(Exhale, 5)],
        ),
        (
            "calm",
            "Calm",
            "Exhale longer than the inhale to slow the heart rate.",
            vec![seconds(Inhale, 4), seconds(Exhale, 6)],
        ),
        (
            "triangle",
            "Triangle",
            "Inhale, hold and exhale of equal length.",
            vec![seconds(Inhale, 4), seconds(Hold, 4), seconds(Exhale, 4)],
        ),
    ];

    table
        .into_iter()
        .filter_map(|(id, label, description, phases)| {
            BreathPattern::new(id, phases)
                .ok()
                .map(|pattern| PatternInfo {
                    id,
                    label,
                    description,
                    pattern,
                })
        })
        .collect()
}

/// Look up a built-in pattern by id.
pub fn builtin_pattern(id: &str) -> Result<BreathPattern, PatternError> {
    builtin_patterns()
        .into_iter()
        .find(|info| info.id == id)
        .map(|info| info.pattern)
        .ok_or_else(|| PatternError::UnknownPattern(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_pattern_expected_key_states() {
        let pattern = builtin_pattern("box").unwrap();
        assert_eq!(
            pattern.expected_key_states(),
            &[
                KeyState::Pressed,
                KeyState::Pressed,
                KeyState::Released,
                KeyState::Released
            ]
        );
    }

    #[test]
    fn leading_hold_defaults_to_pressed() {
        let pattern =
            BreathPattern::new("odd", vec![BreathPhase::hold(1000), BreathPhase::exhale(1000)])
                .unwrap();
        assert_eq!(pattern.expected_key_state(0), Some(KeyState::Pressed));
        assert_eq!(pattern.expected_key_state(1), Some(KeyState::Released));
    }

    #[test]
    fn rejects_empty_and_zero_duration() {
        assert_eq!(BreathPattern::new("x", vec![]), Err(PatternError::Empty));
        assert_eq!(
            BreathPattern::new("x", vec![BreathPhase::inhale(1000), BreathPhase::hold(0)]),
            Err(PatternError::ZeroDuration { index: 1 })
        );
    }

    #[test]
    fn named_steps_follow_name_rules() {
        let steps = vec![
            NamedStep { name: "Inhalar".into(), seconds: 4.0 },
            NamedStep { name: "Retener".into(), seconds: 7.0 },
            NamedStep { name: "Exhalar".into(), seconds: 8.0 },
        ];
        let pattern = BreathPattern::from_named_steps("4-7-8", &steps).unwrap();
        let kinds: Vec<PhaseKind> = pattern.phases().iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![PhaseKind::Inhale, PhaseKind::Hold, PhaseKind::Exhale]);
        assert_eq!(pattern.cycle_duration_ms(), 19_000);
    }

    #[test]
    fn deserialize_validates() {
        let bad = r#"{"name":"bad","phases":[]}"#;
        assert!(serde_json::from_str::<BreathPattern>(bad).is_err());

        let good = r#"{"name":"ok","phases":[{"kind":"inhale","duration_ms":3000},{"kind":"exhale","duration_ms":3000}]}"#;
        let pattern: BreathPattern = serde_json::from_str(good).unwrap();
        assert_eq!(pattern.len(), 2);
        assert_eq!(pattern.expected_key_state(1), Some(KeyState::Released));
    }

    #[test]
    fn unknown_builtin_is_an_error() {
        assert_eq!(
            builtin_pattern("nope"),
            Err(PatternError::UnknownPattern("nope".into()))
        );
        assert_eq!(builtin_patterns().len(), 5);
    }
}

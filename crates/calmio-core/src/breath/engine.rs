//! Breath-cycle engine implementation.
//!
//! The engine is a logical-timer state machine. It does not use internal
//! threads or animations - the embedding UI reports key presses/releases and
//! calls `advance_timer()` from its tick loop.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Inhaling -> (Holding) -> Exhaling -> Idle
//! ```
//!
//! In simple mode a press starts the inhale and a release starts the exhale.
//! With a pattern set, each phase starts only when the key is in the state the
//! phase expects; key changes that don't match are kept until the running
//! phase's timer elapses.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = BreathCycleEngine::new(clock);
//! engine.on_press();
//! // In the UI tick:
//! for event in engine.advance_timer(frame_time) { /* animate */ }
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::pattern::{BreathPattern, BreathPhase, KeyState, PhaseKind};
use crate::clock::Clock;
use crate::error::{PatternError, ValidationError};
use crate::events::{BreathEvent, ColorHint};

/// Upper bound on phases finished by one `advance_timer` call. A pattern
/// without an exhale never waits for input, so a huge `elapsed` would
/// otherwise loop for a very long time. Leftover time is dropped.
pub const MAX_COMPLETIONS_PER_ADVANCE: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreathState {
    Idle,
    Inhaling,
    Holding,
    Exhaling,
}

/// Simple-mode timing, in unscaled milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreathSettings {
    pub inhale_ms: u32,
    pub exhale_ms: u32,
    /// Added to both targets after every valid simple-mode cycle.
    pub increment_ms: u32,
    /// Exhale length after an interrupted inhale or hold.
    pub interrupted_exhale_ms: u32,
}

impl Default for BreathSettings {
    fn default() -> Self {
        Self {
            inhale_ms: 4000,
            exhale_ms: 6000,
            increment_ms: 75,
            interrupted_exhale_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PhaseTimer {
    kind: PhaseKind,
    duration_ms: u32,
    elapsed_ms: u64,
    /// Started by the pattern sequencer, so completion advances the pattern.
    pattern_step: bool,
}

impl PhaseTimer {
    fn remaining_ms(&self) -> u64 {
        (self.duration_ms as u64).saturating_sub(self.elapsed_ms)
    }
}

/// Serializable view of the engine for UIs and the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub state: BreathState,
    pub breath_count: u32,
    pub pattern: Option<String>,
    pub phase_index: usize,
    pub key_pressed: bool,
    pub cycle_valid: bool,
    pub remaining_ms: u64,
    pub inhale_target_ms: u32,
    pub exhale_target_ms: u32,
    pub speed_multiplier: f64,
}

/// Core breath-cycle state machine.
///
/// Single-threaded: the caller serializes input events and timer calls.
#[derive(Debug)]
pub struct BreathCycleEngine {
    clock: Arc<dyn Clock>,
    settings: BreathSettings,
    /// Current simple-mode targets (grow with progressive lengthening).
    inhale_ms: u32,
    exhale_ms: u32,
    speed_multiplier: f64,
    state: BreathState,
    pattern: Option<BreathPattern>,
    phase_index: usize,
    key_pressed: bool,
    cycle_valid: bool,
    /// The inhale ran its full course (the circle reached full size).
    inhale_complete: bool,
    released_during_exhale: bool,
    breath_count: u32,
    timer: Option<PhaseTimer>,
    breath_start: Option<NaiveDateTime>,
    inhale_start: Option<NaiveDateTime>,
    exhale_start: Option<NaiveDateTime>,
}

impl BreathCycleEngine {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_settings(clock, BreathSettings::default())
    }

    pub fn with_settings(clock: Arc<dyn Clock>, settings: BreathSettings) -> Self {
        Self {
            clock,
            settings,
            inhale_ms: settings.inhale_ms,
            exhale_ms: settings.exhale_ms,
            speed_multiplier: 1.0,
            state: BreathState::Idle,
            pattern: None,
            phase_index: 0,
            key_pressed: false,
            cycle_valid: false,
            inhale_complete: false,
            released_during_exhale: false,
            breath_count: 0,
            timer: None,
            breath_start: None,
            inhale_start: None,
            exhale_start: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> BreathState {
        self.state
    }

    pub fn breath_count(&self) -> u32 {
        self.breath_count
    }

    pub fn phase_index(&self) -> usize {
        self.phase_index
    }

    pub fn key_pressed(&self) -> bool {
        self.key_pressed
    }

    pub fn cycle_valid(&self) -> bool {
        self.cycle_valid
    }

    pub fn released_during_exhale(&self) -> bool {
        self.released_during_exhale
    }

    pub fn pattern(&self) -> Option<&BreathPattern> {
        self.pattern.as_ref()
    }

    pub fn settings(&self) -> &BreathSettings {
        &self.settings
    }

    pub fn speed_multiplier(&self) -> f64 {
        self.speed_multiplier
    }

    /// Speed-adjusted simple-mode inhale length.
    pub fn inhale_target_ms(&self) -> u32 {
        self.scaled(self.inhale_ms)
    }

    /// Speed-adjusted simple-mode exhale length.
    pub fn exhale_target_ms(&self) -> u32 {
        self.scaled(self.exhale_ms)
    }

    /// Time left on the running phase, 0 when no timer is active.
    pub fn remaining_ms(&self) -> u64 {
        self.timer.map(|t| t.remaining_ms()).unwrap_or(0)
    }

    pub fn timer_active(&self) -> bool {
        self.timer.is_some()
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            state: self.state,
            breath_count: self.breath_count,
            pattern: self.pattern.as_ref().map(|p| p.name().to_string()),
            phase_index: self.phase_index,
            key_pressed: self.key_pressed,
            cycle_valid: self.cycle_valid,
            remaining_ms: self.remaining_ms(),
            inhale_target_ms: self.inhale_target_ms(),
            exhale_target_ms: self.exhale_target_ms(),
            speed_multiplier: self.speed_multiplier,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn on_press(&mut self) -> Vec<BreathEvent> {
        let mut events = Vec::new();
        self.key_pressed = true;
        if self.pattern.is_none() {
            self.start_inhale(None, false, &mut events);
        } else if self.timer.is_none() {
            self.maybe_start_phase(&mut events);
        }
        events
    }

    pub fn on_release(&mut self) -> Vec<BreathEvent> {
        let mut events = Vec::new();
        self.key_pressed = false;

        // A running exhale always finishes; only remember the release.
        if self.state == BreathState::Exhaling && self.timer.is_some() {
            self.released_during_exhale = true;
            return events;
        }

        if self.pattern.is_none() {
            self.start_exhale(None, false, &mut events);
            return events;
        }

        match self.state {
            BreathState::Inhaling | BreathState::Holding if self.running_phase_expects_press() => {
                self.interrupt(&mut events);
            }
            BreathState::Inhaling | BreathState::Holding
                if self.timer.is_none() && !self.current_expects(KeyState::Released) =>
            {
                // Waiting for a press that will never come: end the cycle.
                self.interrupt(&mut events);
            }
            _ => {
                if self.timer.is_none() {
                    self.maybe_start_phase(&mut events);
                }
            }
        }
        events
    }

    /// Report elapsed time on the active phase.
    ///
    /// Completes the phase once its duration is reached; overshoot carries into
    /// any phase that the completion starts, up to
    /// [`MAX_COMPLETIONS_PER_ADVANCE`] phases per call.
    pub fn advance_timer(&mut self, elapsed: Duration) -> Vec<BreathEvent> {
        let mut events = Vec::new();
        let mut budget = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        let mut completions = 0;

        while let Some(mut timer) = self.timer.take() {
            let needed = timer.remaining_ms();
            if budget < needed {
                timer.elapsed_ms += budget;
                self.timer = Some(timer);
                break;
            }
            if completions == MAX_COMPLETIONS_PER_ADVANCE {
                debug!(dropped_ms = budget, "phase completion limit reached");
                self.timer = Some(timer);
                break;
            }
            budget -= needed;
            completions += 1;
            self.finish_phase(timer, &mut events);
        }
        events
    }

    /// Switch to pattern mode, starting again from the first phase.
    pub fn set_pattern(&mut self, pattern: BreathPattern) {
        debug!(pattern = pattern.name(), phases = pattern.len(), "pattern set");
        self.pattern = Some(pattern);
        self.stop();
    }

    /// Validate and set a pattern; on error the current pattern is kept.
    pub fn try_set_pattern(
        &mut self,
        name: &str,
        phases: Vec<BreathPhase>,
    ) -> Result<(), PatternError> {
        let pattern = BreathPattern::new(name, phases)?;
        self.set_pattern(pattern);
        Ok(())
    }

    /// Back to simple press/release mode.
    pub fn clear_pattern(&mut self) {
        self.pattern = None;
        self.stop();
    }

    /// Scale all phase durations by `1 / multiplier` (developer fast mode).
    pub fn set_speed_multiplier(&mut self, multiplier: f64) -> Result<(), ValidationError> {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(ValidationError::invalid(
                "speed_multiplier",
                format!("must be a positive number, got {multiplier}"),
            ));
        }
        self.speed_multiplier = multiplier;
        Ok(())
    }

    /// Return to a fresh engine: idle, zero breaths, base targets.
    pub fn reset(&mut self) {
        self.stop();
        self.breath_count = 0;
        self.key_pressed = false;
        self.inhale_ms = self.settings.inhale_ms;
        self.exhale_ms = self.settings.exhale_ms;
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn stop(&mut self) {
        self.timer = None;
        self.state = BreathState::Idle;
        self.phase_index = 0;
        self.cycle_valid = false;
        self.inhale_complete = false;
        self.released_during_exhale = false;
        self.breath_start = None;
        self.inhale_start = None;
        self.exhale_start = None;
    }

    fn scaled(&self, base_ms: u32) -> u32 {
        (base_ms as f64 / self.speed_multiplier)
            .round()
            .clamp(1.0, u32::MAX as f64) as u32
    }

    fn current_expects(&self, key: KeyState) -> bool {
        self.pattern
            .as_ref()
            .and_then(|p| p.expected_key_state(self.phase_index))
            == Some(key)
    }

    fn running_phase_expects_press(&self) -> bool {
        self.timer.is_some() && self.current_expects(KeyState::Pressed)
    }

    fn start_timer(
        &mut self,
        kind: PhaseKind,
        duration_ms: u32,
        pattern_step: bool,
        events: &mut Vec<BreathEvent>,
    ) {
        debug!(?kind, duration_ms, pattern_step, "phase started");
        self.timer = Some(PhaseTimer {
            kind,
            duration_ms,
            elapsed_ms: 0,
            pattern_step,
        });
        events.push(BreathEvent::PhaseStarted {
            kind,
            color: ColorHint::for_phase(kind),
            duration_ms,
        });
    }

    fn start_inhale(&mut self, duration_ms: Option<u32>, pattern_step: bool, events: &mut Vec<BreathEvent>) {
        if !matches!(self.state, BreathState::Idle | BreathState::Holding) {
            return;
        }
        let now = self.clock.now();
        self.state = BreathState::Inhaling;
        self.breath_start = Some(now);
        self.inhale_start = Some(now);
        self.cycle_valid = false;
        self.inhale_complete = false;
        let duration = self.scaled(duration_ms.unwrap_or(self.inhale_ms));
        self.start_timer(PhaseKind::Inhale, duration, pattern_step, events);
    }

    fn start_exhale(&mut self, duration_ms: Option<u32>, pattern_step: bool, events: &mut Vec<BreathEvent>) {
        if !matches!(self.state, BreathState::Inhaling | BreathState::Holding) {
            return;
        }
        let hold_cut_short = self.state == BreathState::Holding && self.timer.is_some();
        self.cycle_valid = self.inhale_complete && !hold_cut_short;
        if hold_cut_short {
            events.push(BreathEvent::RippleRequested);
        }

        self.exhale_start = Some(self.clock.now());
        self.state = BreathState::Exhaling;
        self.inhale_complete = false;

        let base = duration_ms.unwrap_or(if self.cycle_valid {
            self.exhale_ms
        } else {
            self.settings.interrupted_exhale_ms
        });
        let duration = self.scaled(base);
        self.start_timer(PhaseKind::Exhale, duration, pattern_step, events);
    }

    fn start_hold(&mut self, duration_ms: u32, events: &mut Vec<BreathEvent>) {
        self.state = BreathState::Holding;
        let duration = self.scaled(duration_ms);
        self.start_timer(PhaseKind::Hold, duration, true, events);
    }

    /// Early release: cut the cycle short with the fallback exhale.
    fn interrupt(&mut self, events: &mut Vec<BreathEvent>) {
        debug!(state = ?self.state, "cycle interrupted");
        self.released_during_exhale = true;
        self.start_exhale(None, false, events);
        self.phase_index = 0;
    }

    fn finish_phase(&mut self, timer: PhaseTimer, events: &mut Vec<BreathEvent>) {
        match self.state {
            BreathState::Inhaling => {
                self.inhale_complete = true;
                events.push(BreathEvent::RippleRequested);
                events.push(BreathEvent::PhaseFinished { kind: timer.kind });
                if timer.pattern_step {
                    self.advance_pattern(events);
                }
            }
            BreathState::Holding => {
                events.push(BreathEvent::RippleRequested);
                events.push(BreathEvent::PhaseFinished { kind: timer.kind });
                self.advance_pattern(events);
            }
            BreathState::Exhaling => {
                events.push(BreathEvent::PhaseFinished { kind: timer.kind });
                self.complete_exhale(events);
                if timer.pattern_step {
                    self.advance_pattern(events);
                } else {
                    // Fallback exhale: a key pressed meanwhile starts phase 0.
                    self.maybe_start_phase(events);
                }
            }
            BreathState::Idle => {}
        }
    }

    fn complete_exhale(&mut self, events: &mut Vec<BreathEvent>) {
        let now = self.clock.now();
        if self.cycle_valid {
            let inhale_secs = seconds_between(self.inhale_start, self.exhale_start);
            let exhale_secs = seconds_between(self.exhale_start, Some(now));
            let total_secs = seconds_between(self.breath_start, Some(now));
            self.breath_count += 1;
            self.released_during_exhale = false;
            debug!(
                breath_count = self.breath_count,
                inhale_secs, exhale_secs, "breath completed"
            );
            events.push(BreathEvent::BreathCompleted {
                breath_count: self.breath_count,
                inhale_secs,
                exhale_secs,
                total_secs,
            });
            if self.pattern.is_none() {
                self.inhale_ms = self.inhale_ms.saturating_add(self.settings.increment_ms);
                self.exhale_ms = self.exhale_ms.saturating_add(self.settings.increment_ms);
            }
        }
        self.state = BreathState::Idle;
        self.cycle_valid = false;
        self.released_during_exhale = false;
        self.breath_start = None;
    }

    fn advance_pattern(&mut self, events: &mut Vec<BreathEvent>) {
        let Some(len) = self.pattern.as_ref().map(|p| p.len()) else {
            return;
        };
        self.phase_index = (self.phase_index + 1) % len;
        self.maybe_start_phase(events);
    }

    fn maybe_start_phase(&mut self, events: &mut Vec<BreathEvent>) {
        let Some(pattern) = self.pattern.as_ref() else {
            return;
        };
        if self.phase_index >= pattern.len() {
            self.phase_index = 0;
        }
        if pattern.expected_key_state(self.phase_index) != Some(KeyState::from_pressed(self.key_pressed)) {
            return;
        }
        let Some(phase) = pattern.phase(self.phase_index).copied() else {
            return;
        };
        match phase.kind {
            PhaseKind::Inhale => self.start_inhale(Some(phase.duration_ms), true, events),
            PhaseKind::Exhale => self.start_exhale(Some(phase.duration_ms), true, events),
            PhaseKind::Hold => self.start_hold(phase.duration_ms, events),
        }
    }
}

fn seconds_between(from: Option<NaiveDateTime>, to: Option<NaiveDateTime>) -> f64 {
    match (from, to) {
        (Some(from), Some(to)) => ((to - from).num_milliseconds() as f64 / 1000.0).max(0.0),
        _ => 0.0,
    }
}

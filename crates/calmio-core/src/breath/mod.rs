mod engine;
mod pattern;

pub use engine::{
    BreathCycleEngine, BreathSettings, BreathState, EngineSnapshot, MAX_COMPLETIONS_PER_ADVANCE,
};
pub use pattern::{
    builtin_pattern, builtin_patterns, BreathPattern, BreathPhase, KeyState, NamedStep,
    PatternInfo, PhaseKind,
};

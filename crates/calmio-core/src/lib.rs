//! # Calmio Core Library
//!
//! This library provides the core logic for the Calmio guided-breathing
//! meditation app. Rendering, audio and window handling live in the UI; the
//! `calmio-cli` binary exposes the same operations from a terminal.
//!
//! ## Architecture
//!
//! - **Breath engine**: a state machine driven by key presses and explicit
//!   timer expiry calls (`advance_timer`), in simple press/release mode or
//!   following a multi-phase pattern
//! - **Session ledger**: collects completed cycles into a session record
//! - **Stats store**: JSON-persisted daily totals, session history, streak
//!   and badges, with weekly and monthly rollups
//! - **Config**: TOML preferences and custom patterns
//!
//! ## Key Components
//!
//! - [`BreathCycleEngine`]: Breath phase state machine
//! - [`SessionLedger`]: In-progress session bookkeeping
//! - [`StatsStore`]: Persistent ledger and summaries
//! - [`AchievementEngine`]: Badge rules
//! - [`Config`]: Application configuration management

pub mod achievements;
pub mod breath;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod session;
pub mod stats;
pub mod storage;

pub use achievements::{AchievementEngine, BadgeCode, BadgeInfo, Recurrence};
pub use breath::{
    builtin_pattern, builtin_patterns, BreathCycleEngine, BreathPattern, BreathPhase,
    BreathSettings, BreathState, EngineSnapshot, KeyState, NamedStep, PatternInfo, PhaseKind,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{
    ConfigError, CoreError, PatternError, PersistenceError, SessionError, ValidationError,
};
pub use events::{BreathEvent, ColorHint};
pub use session::{CycleRecord, SessionLedger, SessionRecord};
pub use stats::{LongestSession, MonthlySummary, WeeklySummary, MONTHLY_GOAL_MINUTES};
pub use storage::{
    data_dir, JsonFilePersistence, MemoryPersistence, Persistence, StatsDocument, StatsStore,
};

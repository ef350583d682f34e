use std::sync::Arc;
use std::time::Duration;

use calmio_core::{
    BreathCycleEngine, BreathEvent, BreathPattern, Clock, Config, KeyState, ManualClock,
    SessionLedger, SessionRecord,
};
use clap::Subcommand;
use serde::Serialize;
use tracing::debug;

use super::{badge_infos, open_store, parse_datetime, print_json, system_clock, CliResult};

#[derive(Subcommand)]
pub enum SessionAction {
    /// Record a finished session
    Add {
        /// Start time, "YYYY-MM-DD HH:MM[:SS]"
        #[arg(long)]
        start: String,
        /// Duration in seconds
        #[arg(long)]
        seconds: u32,
        /// Completed breaths
        #[arg(long, default_value_t = 0)]
        breaths: u32,
        /// Last cycle's inhale, in seconds
        #[arg(long, default_value_t = 0.0)]
        inhale: f64,
        /// Last cycle's exhale, in seconds
        #[arg(long, default_value_t = 0.0)]
        exhale: f64,
    },
    /// Run the breath engine on a simulated clock and record the session
    Simulate {
        /// Pattern id (defaults to the configured pattern, else simple mode)
        #[arg(long)]
        pattern: Option<String>,
        /// Cycles to attempt
        #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..))]
        cycles: u32,
        /// Release early on every Kth cycle (0 = never)
        #[arg(long, default_value_t = 0)]
        interrupt_every: u32,
    },
    /// Sessions recorded today
    Today,
    /// The most recent session
    Last,
}

#[derive(Serialize)]
struct Recorded<'a> {
    session: &'a SessionRecord,
    badges: Vec<calmio_core::BadgeInfo>,
}

#[derive(Serialize)]
struct Today<'a> {
    date: chrono::NaiveDate,
    seconds: u32,
    sessions: Vec<&'a SessionRecord>,
}

pub fn run(action: SessionAction) -> CliResult {
    let config = Config::load()?;

    match action {
        SessionAction::Add {
            start,
            seconds,
            breaths,
            inhale,
            exhale,
        } => {
            let mut store = open_store(&config)?;
            let record = SessionRecord::new(parse_datetime(&start)?, seconds, breaths)
                .with_last_cycle(inhale, exhale);
            record_and_print(&mut store, record)?;
        }
        SessionAction::Simulate {
            pattern,
            cycles,
            interrupt_every,
        } => {
            let pattern = match pattern {
                Some(id) => Some(config.find_pattern(&id)?),
                None => config.resolve_pattern()?,
            };
            let start = system_clock(&config).now();
            let record = simulate(&config, pattern, start, cycles, interrupt_every)?;
            let mut store = open_store(&config)?;
            record_and_print(&mut store, record)?;
        }
        SessionAction::Today => {
            let store = open_store(&config)?;
            let date = store.clock().today();
            print_json(&Today {
                date,
                seconds: store.seconds_for_date(date),
                sessions: store.get_sessions_for_date(date),
            })?;
        }
        SessionAction::Last => {
            let store = open_store(&config)?;
            print_json(&store.get_last_session())?;
        }
    }
    Ok(())
}

fn record_and_print(store: &mut calmio_core::StatsStore, record: SessionRecord) -> CliResult {
    let credited = store.add_session(record)?;
    let session = store
        .get_last_session()
        .ok_or("session was not recorded")?;
    print_json(&Recorded {
        session,
        badges: badge_infos(&credited),
    })
}

/// Drive the engine like a user following the guide exactly, releasing
/// halfway through the inhale on interrupted cycles.
fn simulate(
    config: &Config,
    pattern: Option<BreathPattern>,
    start: chrono::NaiveDateTime,
    cycles: u32,
    interrupt_every: u32,
) -> Result<SessionRecord, Box<dyn std::error::Error>> {
    let clock = Arc::new(ManualClock::new(start));
    let mut engine = BreathCycleEngine::with_settings(clock.clone(), config.breath_settings());
    engine.set_speed_multiplier(config.speed_multiplier())?;
    if let Some(pattern) = pattern.clone() {
        engine.set_pattern(pattern);
    }
    let mut ledger = SessionLedger::new();

    let observer = clock.clone();
    let mut feed = |events: Vec<BreathEvent>| {
        for event in &events {
            ledger.observe(event, observer.now());
        }
    };

    for cycle in 1..=cycles {
        let interrupted = interrupt_every > 0 && cycle % interrupt_every == 0;
        debug!(cycle, interrupted, "simulating cycle");

        match &pattern {
            None => {
                feed(engine.on_press());
                let hold = u64::from(engine.inhale_target_ms());
                let hold = if interrupted { hold / 2 } else { hold };
                feed(tick(&mut engine, &clock, hold));
                feed(engine.on_release());
                let rest = engine.remaining_ms();
                feed(tick(&mut engine, &clock, rest));
            }
            Some(pattern) => {
                for index in 0..pattern.len() {
                    let pressed = pattern.expected_key_state(index) == Some(KeyState::Pressed);
                    if pressed != engine.key_pressed() {
                        let events = if pressed { engine.on_press() } else { engine.on_release() };
                        feed(events);
                    }
                    if interrupted && index == 0 {
                        let half = engine.remaining_ms() / 2;
                        feed(tick(&mut engine, &clock, half));
                        feed(engine.on_release());
                        let rest = engine.remaining_ms();
                        feed(tick(&mut engine, &clock, rest));
                        break;
                    }
                    let rest = engine.remaining_ms();
                    feed(tick(&mut engine, &clock, rest));
                }
            }
        }
    }

    Ok(ledger.end_session(clock.now())?)
}

fn tick(engine: &mut BreathCycleEngine, clock: &ManualClock, ms: u64) -> Vec<BreathEvent> {
    clock.advance_ms(ms);
    engine.advance_timer(Duration::from_millis(ms))
}

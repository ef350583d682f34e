//! Upgrades for older stats documents.
//!
//! Steps run on the raw JSON before typed decoding, in order, and are
//! idempotent: a document already in the current shape passes through
//! unchanged. [`recompute_streak`] runs after decoding.

use serde_json::{Map, Value};
use tracing::info;

use super::document::StatsDocument;
use crate::stats::compute_streak;

/// Apply every pending step. Returns the names of the steps that changed
/// something.
pub fn migrate(doc: &mut Value) -> Vec<&'static str> {
    let Some(root) = doc.as_object_mut() else {
        return Vec::new();
    };

    let mut applied = Vec::new();
    if migrate_daily_minutes(root) {
        applied.push("daily_minutes_to_seconds");
    }
    if migrate_session_shapes(root) {
        applied.push("session_minutes_to_duration");
    }
    if migrate_badge_lists(root) {
        applied.push("badge_lists_to_counts");
    }

    for step in &applied {
        info!(step, "applied stats document migration");
    }
    applied
}

/// Derive the streak from daily totals. Returns `true` if it changed.
pub fn recompute_streak(doc: &mut StatsDocument) -> bool {
    let streak = compute_streak(&doc.daily_seconds);
    if streak == doc.streak {
        return false;
    }
    info!(old = doc.streak, new = streak, "recomputed streak");
    doc.streak = streak;
    true
}

fn minutes_to_seconds(minutes: &Value) -> Option<Value> {
    let secs = (minutes.as_f64()? * 60.0).round();
    if !secs.is_finite() || secs < 0.0 {
        return Some(Value::from(0u32));
    }
    Some(Value::from(secs.min(u32::MAX as f64) as u32))
}

/// `daily_minutes` → `daily_seconds`; existing seconds entries win.
fn migrate_daily_minutes(root: &mut Map<String, Value>) -> bool {
    let Some(Value::Object(minutes)) = root.remove("daily_minutes") else {
        return false;
    };

    let seconds = root
        .entry("daily_seconds")
        .or_insert_with(|| Value::Object(Map::new()));
    if !seconds.is_object() {
        *seconds = Value::Object(Map::new());
    }
    if let Value::Object(seconds) = seconds {
        for (date, value) in minutes {
            if let Some(secs) = minutes_to_seconds(&value) {
                seconds.entry(date).or_insert(secs);
            }
        }
    }
    true
}

/// Bring one session object to the current key set.
fn upgrade_session(session: &mut Map<String, Value>) -> bool {
    let mut changed = false;

    if let Some(minutes) = session.remove("minutes") {
        changed = true;
        if !session.contains_key("duration") {
            if let Some(secs) = minutes_to_seconds(&minutes) {
                session.insert("duration".into(), secs);
            }
        }
    }

    if let Some(cycle) = session.remove("last_cycle") {
        changed = true;
        for key in ["inhale", "exhale"] {
            if let Some(v) = cycle.get(key).filter(|v| v.is_number()) {
                session
                    .entry(format!("last_{key}"))
                    .or_insert_with(|| v.clone());
            }
        }
    }

    for key in ["duration", "breaths"] {
        if !session.contains_key(key) {
            session.insert(key.into(), Value::from(0u32));
            changed = true;
        }
    }
    changed
}

/// Legacy `minutes`/`last_cycle` keys on sessions; an empty `last_session`
/// means "none".
fn migrate_session_shapes(root: &mut Map<String, Value>) -> bool {
    let mut changed = false;

    let drop_last = match root.get("last_session") {
        Some(Value::Object(last)) => last.is_empty(),
        Some(Value::Null) => true,
        _ => false,
    };
    if drop_last {
        root.remove("last_session");
        changed = true;
    } else if let Some(Value::Object(last)) = root.get_mut("last_session") {
        changed |= upgrade_session(last);
    }

    // Old files only kept the last session; seed the history with it.
    if !root.contains_key("sessions") {
        if let Some(last) = root.get("last_session").cloned() {
            root.insert("sessions".into(), Value::Array(vec![last]));
            changed = true;
        }
    }

    if let Some(Value::Array(sessions)) = root.get_mut("sessions") {
        for session in sessions.iter_mut() {
            if let Value::Object(session) = session {
                changed |= upgrade_session(session);
            }
        }
    }
    changed
}

fn list_to_counts(list: &[Value]) -> Value {
    let mut counts = Map::new();
    for code in list.iter().filter_map(Value::as_str) {
        let entry = counts.entry(code.to_string()).or_insert(Value::from(0u32));
        *entry = Value::from(entry.as_u64().unwrap_or(0) + 1);
    }
    Value::Object(counts)
}

/// `["10_breaths", ...]` → `{"10_breaths": n}` for both badge maps.
fn migrate_badge_lists(root: &mut Map<String, Value>) -> bool {
    let mut changed = false;

    if let Some(badges) = root.get_mut("badges") {
        if let Some(counts) = badges.as_array().map(|list| list_to_counts(list)) {
            *badges = counts;
            changed = true;
        }
    }

    if let Some(Value::Object(days)) = root.get_mut("daily_badges") {
        for badges in days.values_mut() {
            if let Some(counts) = badges.as_array().map(|list| list_to_counts(list)) {
                *badges = counts;
                changed = true;
            }
        }
    }
    changed
}

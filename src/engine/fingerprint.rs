//! Device fingerprint hashing and shared-device detection.

use std::collections::{BTreeMap, HashSet};

use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};

use crate::model::mobile_checkin::{MobileCheckin, RiskFlag};

/// Stable identifier for the device behind a mobile punch. Used for
/// anomaly reporting only, never for blocking a punch.
pub fn fingerprint_hash(raw: &Value, ip: &str, user_agent: &str) -> String {
    let canonical = canonicalize(&json!({
        "ip": ip,
        "raw": raw,
        "ua": user_agent,
    }));
    hex::encode(Sha256::digest(canonical.to_string().as_bytes()))
}

/// Rebuilds every object with its keys sorted so the hash does not depend
/// on the order the client sent them in.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut sorted = Map::new();
            for (key, value) in entries {
                sorted.insert(key.clone(), canonicalize(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Risk for every check-in in the window, ordered by check-in id.
///
/// A fingerprint seen with two or more employees is a shared device; one
/// used by a single employee at least `high_frequency_threshold` times is
/// high-frequency. A threshold of 0 disables the frequency rule.
pub fn analyze(checkins: &[MobileCheckin], high_frequency_threshold: usize) -> Vec<(u64, RiskFlag)> {
    let mut by_fingerprint: BTreeMap<&str, Vec<&MobileCheckin>> = BTreeMap::new();
    for checkin in checkins {
        if let Some(fp) = checkin.device_fingerprint.as_deref().map(str::trim) {
            if !fp.is_empty() {
                by_fingerprint.entry(fp).or_default().push(checkin);
            }
        }
    }

    let mut flags: Vec<(u64, RiskFlag)> = Vec::with_capacity(checkins.len());
    for group in by_fingerprint.values() {
        let employees: HashSet<u64> = group.iter().map(|c| c.employee_id).collect();
        let risk = if employees.len() >= 2 {
            RiskFlag::SharedDevice
        } else if high_frequency_threshold > 0 && group.len() >= high_frequency_threshold {
            RiskFlag::HighFrequency
        } else {
            RiskFlag::None
        };
        flags.extend(group.iter().map(|c| (c.id, risk)));
    }

    flags.sort_by_key(|(id, _)| *id);
    flags
}

/// The flag to store, if `assessed` is more severe than `current`.
pub fn escalate(current: RiskFlag, assessed: RiskFlag) -> Option<RiskFlag> {
    (assessed > current).then_some(assessed)
}

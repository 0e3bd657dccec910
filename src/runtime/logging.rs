use super::StatePaths;
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use std::fs;
use std::io::Write;

/// Appends one JSON line `{timestamp, level, event, ...fields}` to the runtime
/// log and mirrors it to stderr. Write failures are swallowed.
pub fn append_runtime_log(paths: &StatePaths, level: &str, event: &str, fields: Value) {
    let mut payload = json!({
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        "level": level,
        "event": event,
    });
    if let (Some(record), Value::Object(extra)) = (payload.as_object_mut(), fields) {
        for (key, value) in extra {
            record.entry(key).or_insert(value);
        }
    }

    let Ok(line) = serde_json::to_string(&payload) else {
        return;
    };
    eprintln!("{line}");

    let path = paths.runtime_log_path();
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(mut file) = fs::OpenOptions::new().create(true).append(true).open(path) else {
        return;
    };
    let _ = writeln!(file, "{line}");
}

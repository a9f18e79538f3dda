//! Per-host counters, formatted as one JSON line per rendered frame.
//! Kept independent of host internals; hosts bump the fields directly.
use log::info;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameCounters {
    pub frames_rendered: u64,
    pub mutations_applied: u64,
    pub nodes_painted_last: u64,
    pub nodes_painted_total: u64,
    pub stylesheet_rebuilds: u64,
    pub deferred_pending: u64,
    pub active_tweens: u64,
    pub flush_spillover: u64,
}

pub fn frame_counters_json(counters: &FrameCounters) -> String {
    serde_json::to_string(counters).unwrap_or_default()
}

pub fn maybe_emit(enabled: bool, label: &str, json_line: &str) {
    if enabled {
        info!(target: "scene_host::telemetry", "{label} {json_line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_serialize_as_flat_object() {
        let counters = FrameCounters {
            frames_rendered: 3,
            active_tweens: 2,
            ..FrameCounters::default()
        };
        let value: serde_json::Value =
            serde_json::from_str(&frame_counters_json(&counters)).unwrap_or_default();
        assert_eq!(value["frames_rendered"], 3);
        assert_eq!(value["active_tweens"], 2);
        assert_eq!(value["stylesheet_rebuilds"], 0);
    }
}

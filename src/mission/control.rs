// src/mission/control.rs
// Per-user mission running/stop-requested flag. The conductor polls this
// between tasks and the LLM streamer polls it between stream chunks.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::info;

/// A process-wide `user_id -> running` map. A missing entry reads as
/// running so off-mission operations are never blocked.
#[derive(Default)]
pub struct MissionControl {
    states: Mutex<HashMap<i64, bool>>,
}

impl MissionControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a mission as running for a user.
    pub fn set_mission_running(&self, user_id: i64) {
        self.states.lock().insert(user_id, true);
    }

    /// Requests a graceful stop for a user's active mission.
    pub fn request_stop(&self, user_id: i64) {
        let mut states = self.states.lock();
        if let Some(running) = states.get_mut(&user_id) {
            *running = false;
            info!("Stop requested for user {}'s mission", user_id);
        }
    }

    /// Whether a mission should continue running for a user.
    pub fn is_running(&self, user_id: i64) -> bool {
        self.states.lock().get(&user_id).copied().unwrap_or(true)
    }

    /// Cleans up the state for a user's mission once it has fully stopped.
    pub fn set_mission_finished(&self, user_id: i64) {
        self.states.lock().remove(&user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_entry_reads_as_running() {
        let control = MissionControl::new();
        assert!(control.is_running(1));
    }

    #[test]
    fn stop_request_only_affects_active_missions() {
        let control = MissionControl::new();
        // No mission started: stop is a no-op and the default stays permissive.
        control.request_stop(1);
        assert!(control.is_running(1));

        control.set_mission_running(1);
        assert!(control.is_running(1));
        control.request_stop(1);
        assert!(!control.is_running(1));

        control.set_mission_finished(1);
        assert!(control.is_running(1));
    }
}

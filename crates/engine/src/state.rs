use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// Where the run loop stands, as seen from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BotStatus {
    Running,
    Paused,
    Terminated,
}

/// Lifecycle flags shared between the control surface and the run loop.
#[derive(Debug, Default)]
pub(crate) struct BotState {
    killswitch: AtomicBool,
    pause: AtomicBool,
    started: AtomicBool,
    terminated: AtomicBool,
    /// Wakes the run loop's end-of-pass sleep when the kill switch is set.
    wake: Notify,
}

impl BotState {
    pub fn set_kill_switch(&self, kill: bool) {
        self.killswitch.store(kill, Ordering::SeqCst);
        if kill {
            self.wake.notify_one();
        }
    }

    pub fn is_killed(&self) -> bool {
        self.killswitch.load(Ordering::SeqCst)
    }

    pub fn set_paused(&self, paused: bool) {
        self.pause.store(paused, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.pause.load(Ordering::SeqCst)
    }

    /// Claims the single run of the loop. Returns false if it was already claimed.
    pub fn try_start(&self) -> bool {
        !self.started.swap(true, Ordering::SeqCst)
    }

    pub fn mark_terminated(&self) {
        self.terminated.store(true, Ordering::SeqCst);
    }

    /// `Terminated` only once the run loop has actually stopped; a set kill switch is still
    /// `Running` until the loop observes it.
    pub fn status(&self) -> BotStatus {
        if self.terminated.load(Ordering::SeqCst) {
            BotStatus::Terminated
        } else if self.is_paused() {
            BotStatus::Paused
        } else {
            BotStatus::Running
        }
    }

    pub async fn woken(&self) {
        self.wake.notified().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_flags() {
        let state = BotState::default();
        assert_eq!(state.status(), BotStatus::Running);

        state.set_paused(true);
        assert_eq!(state.status(), BotStatus::Paused);
        state.set_paused(false);
        assert_eq!(state.status(), BotStatus::Running);

        state.set_kill_switch(true);
        assert_eq!(state.status(), BotStatus::Running);
        state.mark_terminated();
        assert_eq!(state.status(), BotStatus::Terminated);
    }

    #[test]
    fn termination_outlasts_a_cleared_kill_switch() {
        let state = BotState::default();
        state.set_kill_switch(true);
        state.mark_terminated();
        state.set_kill_switch(false);
        assert_eq!(state.status(), BotStatus::Terminated);

        state.set_paused(true);
        assert_eq!(state.status(), BotStatus::Terminated);
    }

    #[test]
    fn loop_can_only_be_claimed_once() {
        let state = BotState::default();
        assert!(state.try_start());
        assert!(!state.try_start());
    }

    #[tokio::test]
    async fn kill_switch_leaves_a_wake_up_for_the_sleeper() {
        let state = BotState::default();
        state.set_kill_switch(true);
        // The permit is stored even though nobody was waiting yet.
        state.woken().await;
        assert!(state.is_killed());
    }
}

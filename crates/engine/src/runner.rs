use crate::bot::{Binding, Bot};
use crate::error::EngineError;
use crate::schedule::time_until_next_tick;
use configuration::FailurePolicy;
use mediator::{Mediator, SendNotificationRequest};
use tokio::time::{Instant, sleep_until, timeout};

pub const STARTED_MESSAGE: &str = "Bot Started.";
pub const TERMINATED_MESSAGE: &str = "Bot Terminated.";

impl Bot {
    /// Runs the strategy loop until the kill switch is set.
    ///
    /// Every pass runs each strategy's decision cycle once, in binding order, unless the bot is
    /// paused. Passes start on multiples of the loop period counted from loop start. The kill
    /// switch is observed between passes; it never interrupts a running strategy, but it does cut
    /// the end-of-pass sleep short.
    ///
    /// The loop runs at most once per bot. Under [`FailurePolicy::Halt`] the first strategy
    /// failure ends the loop and is returned; no termination notification is sent in that case.
    pub async fn process_strategies(&self) -> Result<(), EngineError> {
        if !self.state.try_start() {
            return Err(EngineError::AlreadyStarted);
        }

        self.send_notification(&SendNotificationRequest::new(STARTED_MESSAGE))
            .await;
        let loop_start = Instant::now();
        tracing::info!(period = ?self.settings.loop_period, "Run loop started.");

        while !self.state.is_killed() {
            if self.state.is_paused() {
                tracing::debug!("Bot is paused. Skipping pass.");
            } else if let Err(e) = self.run_pass().await {
                self.state.mark_terminated();
                tracing::error!(error = %e, "Run loop halted by a strategy failure.");
                return Err(e);
            }
            self.sleep_until_next_pass(loop_start).await;
        }

        self.state.mark_terminated();
        tracing::info!("Run loop terminated.");
        self.send_notification(&SendNotificationRequest::new(TERMINATED_MESSAGE))
            .await;
        Ok(())
    }

    async fn run_pass(&self) -> Result<(), EngineError> {
        for binding in &self.bindings {
            if let Err(e) = self.run_strategy(binding).await {
                match self.settings.failure_policy {
                    FailurePolicy::Halt => return Err(e),
                    FailurePolicy::Continue => {
                        tracing::error!(strategy = %binding.strategy_name(), error = %e, "Strategy cycle failed.");
                    }
                }
            }
        }
        Ok(())
    }

    async fn run_strategy(&self, binding: &Binding) -> Result<(), EngineError> {
        let name = binding.strategy_name();
        let cycle = binding.strategy().process_strategy();
        let result = match self.settings.strategy_timeout {
            Some(limit) => timeout(limit, cycle).await.map_err(|_| EngineError::StrategyTimeout {
                name: name.to_string(),
                timeout: limit,
            })?,
            None => cycle.await,
        };
        result.map_err(|source| EngineError::Strategy {
            name: name.to_string(),
            source,
        })
    }

    /// Sleeps until the next period boundary. Only the kill switch ends the sleep early.
    async fn sleep_until_next_pass(&self, loop_start: Instant) {
        let wait = time_until_next_tick(loop_start.elapsed(), self.settings.loop_period);
        let deadline = Instant::now() + wait;
        tracing::debug!(?wait, "Sleeping until the next pass.");

        while !self.state.is_killed() {
            tokio::select! {
                _ = sleep_until(deadline) => return,
                _ = self.state.woken() => {}
            }
        }
    }
}

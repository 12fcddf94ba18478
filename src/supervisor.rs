//! Supervisor loop - keep the companion running while the target is.
//!
//! Every poll asks the probe whether the target is up, then whether the
//! companion is up, and launches the companion only when the first answer
//! is yes and the second is no. Any failure ends the current iteration and
//! is logged; the loop itself never stops on its own.

use crate::config::SupervisorConfig;
use crate::errors::Result;
use crate::process::{LaunchRequest, Launcher, ProcessProbe, RuntimeResolver, RuntimeTier};

/// What a single poll did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    TargetAbsent,
    CompanionPresent,
    Launched(RuntimeTier),
    /// The iteration failed and was skipped; the message is the logged error
    Failed(String),
}

pub struct Supervisor {
    config: SupervisorConfig,
    probe: Box<dyn ProcessProbe>,
    resolver: RuntimeResolver,
    launcher: Box<dyn Launcher>,
    start_flag: String,
}

impl Supervisor {
    pub fn new(
        config: SupervisorConfig,
        probe: Box<dyn ProcessProbe>,
        resolver: RuntimeResolver,
        launcher: Box<dyn Launcher>,
        start_flag: impl Into<String>,
    ) -> Self {
        Self {
            config,
            probe,
            resolver,
            launcher,
            start_flag: start_flag.into(),
        }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Run one poll. Never fails: errors become [`TickOutcome::Failed`].
    pub fn tick(&self) -> TickOutcome {
        match self.try_tick() {
            Ok(outcome) => {
                tracing::debug!(?outcome, "poll finished");
                outcome
            }
            Err(e) => {
                tracing::warn!(error = %e, "poll failed, retrying next interval");
                TickOutcome::Failed(e.to_string())
            }
        }
    }

    fn try_tick(&self) -> Result<TickOutcome> {
        if !self.probe.is_target_running()? {
            return Ok(TickOutcome::TargetAbsent);
        }
        if self.probe.is_companion_running()? {
            return Ok(TickOutcome::CompanionPresent);
        }

        let candidate = self.resolver.resolve()?;
        let request = LaunchRequest::new(&candidate, &self.start_flag, self.resolver.install_dir());
        tracing::info!(
            tier = %candidate.tier,
            program = %candidate.program.display(),
            "target running without companion, launching"
        );
        self.launcher.launch(&request)?;

        Ok(TickOutcome::Launched(candidate.tier))
    }

    /// Poll forever. Only external termination stops this.
    pub async fn run(&self) {
        tracing::info!(
            poll_seconds = self.config.poll_interval_seconds(),
            task = self.config.task_name(),
            "supervisor started"
        );
        loop {
            self.tick();
            tokio::time::sleep(self.config.poll_interval()).await;
        }
    }

    /// Poll `iterations` times, sleeping between polls, and return each outcome.
    pub async fn run_iterations(&self, iterations: usize) -> Vec<TickOutcome> {
        let mut outcomes = Vec::with_capacity(iterations);
        for i in 0..iterations {
            outcomes.push(self.tick());
            if i + 1 < iterations {
                tokio::time::sleep(self.config.poll_interval()).await;
            }
        }
        outcomes
    }
}

use crate::command::build_command;
use crate::exec::Executor;
use crate::record::record_result;
use crate::record::RuntimeParse;
use crate::store::ResultStore;
use crate::SweepError;
use crate::SweepResult;
use std::fs;
use std::path::Path;
use sweep_types::config::SweepConfig;
use sweep_types::machine::MachineProfile;
use sweep_types::RunKey;
use tokio::time::Instant;
use tracing::debug;
use tracing::info;
use tracing::warn;

pub fn load_config(path: &Path) -> SweepResult<SweepConfig> {
  let config_err = |source: Box<dyn std::error::Error + Send + Sync>| SweepError::Config {
    path: path.to_path_buf(),
    source,
  };
  let raw = fs::read_to_string(path).map_err(|e| config_err(e.into()))?;
  serde_yaml::from_str(&raw).map_err(|e| config_err(e.into()))
}

/// Tally of one sweep. A run that is executed but not recorded will be executed again by the next sweep.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct SweepSummary {
  pub planned: usize,
  pub cached: usize,
  pub executed: usize,
  pub recorded: usize,
  pub missing_marker: usize,
  pub malformed: usize,
  pub failed_exit: usize,
  pub timed_out: usize,
  /// Keys for which no command could be built (dataset or termination class missing from the config).
  pub unbuildable: usize,
}

pub struct Sweep<'a, E: Executor> {
  profile: &'a MachineProfile,
  cfg: &'a SweepConfig,
  store: ResultStore,
  executor: E,
}

impl<'a, E: Executor> Sweep<'a, E> {
  pub fn new(
    profile: &'a MachineProfile,
    cfg: &'a SweepConfig,
    store: ResultStore,
    executor: E,
  ) -> Self {
    Self {
      profile,
      cfg,
      store,
      executor,
    }
  }

  pub fn store(&self) -> &ResultStore {
    &self.store
  }

  pub fn into_store(self) -> ResultStore {
    self.store
  }

  /// The command to run for `key`, or `None` if it has already been measured.
  pub fn command_for(&self, key: &RunKey) -> Option<String> {
    let needs_run = self.store.needs_run(key);
    debug!(key = %key, needs_run, "checking cache");
    if !needs_run {
      return None;
    };
    build_command(self.profile, self.cfg, key)
  }

  /// Commands that `run` would execute for `keys`, without executing anything.
  pub fn dry_run(&self, keys: &[RunKey]) -> Vec<(RunKey, String)> {
    keys
      .iter()
      .filter_map(|key| self.command_for(key).map(|cmd| (key.clone(), cmd)))
      .collect()
  }

  /// Runs every key in order that is not yet in the store, persisting the store after each executed run and once more at the end.
  ///
  /// Only storage and spawn failures end the sweep early. A run that fails, times out, or reports no usable runtime is logged and left unrecorded.
  pub async fn run(&mut self, keys: &[RunKey]) -> SweepResult<SweepSummary> {
    let mut summary = SweepSummary {
      planned: keys.len(),
      ..Default::default()
    };
    let sweep_started = Instant::now();

    for key in keys {
      if !self.store.needs_run(key) {
        debug!(key = %key, "already measured, skipping");
        summary.cached += 1;
        continue;
      };
      let Some(cmd) = build_command(self.profile, self.cfg, key) else {
        warn!(key = %key, "no step size or step count configured, skipping");
        summary.unbuildable += 1;
        continue;
      };

      info!(key = %key, command = %cmd, "running");
      let started = Instant::now();
      let out = self.executor.execute(&cmd).await?;
      summary.executed += 1;
      if out.timed_out {
        summary.timed_out += 1;
      } else if !out.succeeded() {
        summary.failed_exit += 1;
        warn!(key = %key, exit_code = ?out.exit_code, "command exited unsuccessfully");
      };

      match record_result(&mut self.store, key, &out.lines) {
        RuntimeParse::Found(runtime) => {
          summary.recorded += 1;
          info!(
            key = %key,
            runtime,
            exec_secs = started.elapsed().as_secs_f64(),
            "recorded runtime",
          );
        }
        RuntimeParse::Absent => {
          summary.missing_marker += 1;
          warn!(key = %key, "no runtime reported, will retry on next sweep");
        }
        RuntimeParse::Malformed(_) => summary.malformed += 1,
      };
      self.store.persist()?;
    }

    self.store.persist()?;
    info!(
      planned = summary.planned,
      cached = summary.cached,
      executed = summary.executed,
      recorded = summary.recorded,
      missing_marker = summary.missing_marker,
      malformed = summary.malformed,
      failed_exit = summary.failed_exit,
      timed_out = summary.timed_out,
      unbuildable = summary.unbuildable,
      sweep_secs = sweep_started.elapsed().as_secs_f64(),
      "sweep complete",
    );
    Ok(summary)
  }
}

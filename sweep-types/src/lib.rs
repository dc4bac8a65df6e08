use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use std::fmt;
use std::fmt::Display;

pub mod config;
pub mod machine;

/// How a single advection run is executed. Which of these a machine can run is decided by its `MachineProfile`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlgorithmVariant {
  /// Single-threaded build, used only on machines with neither an accelerator nor a parallel runtime.
  Plain,
  /// CUDA build.
  Accelerator,
  /// TBB build pinned to a thread count.
  ParallelRuntime { threads: u32 },
}

impl AlgorithmVariant {
  pub fn thread_count(&self) -> Option<u32> {
    match self {
      AlgorithmVariant::ParallelRuntime { threads } => Some(*threads),
      _ => None,
    }
  }
}

impl Display for AlgorithmVariant {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      AlgorithmVariant::Plain => write!(f, "Serial"),
      AlgorithmVariant::Accelerator => write!(f, "GPU"),
      AlgorithmVariant::ParallelRuntime { threads } => write!(f, "TBB_{}", threads),
    }
  }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvectionMode {
  Particle,
  Streamline,
}

impl AdvectionMode {
  pub fn as_str(&self) -> &'static str {
    match self {
      AdvectionMode::Particle => "particle",
      AdvectionMode::Streamline => "streamline",
    }
  }
}

impl Display for AdvectionMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Named bound on how many steps a run advances. The step count for each class comes from `SweepConfig`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminationClass {
  Short,
  Med,
  Long,
}

impl TerminationClass {
  pub fn as_str(&self) -> &'static str {
    match self {
      TerminationClass::Short => "short",
      TerminationClass::Med => "med",
      TerminationClass::Long => "long",
    }
  }
}

impl Display for TerminationClass {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Identifies one benchmark configuration. Two keys are the same cache entry only if every field matches.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Deserialize, Serialize)]
pub struct RunKey {
  pub dataset: String,
  pub variant: AlgorithmVariant,
  pub seeds: u64,
  pub termination: TerminationClass,
  pub mode: AdvectionMode,
}

impl Display for RunKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{}/{}/{} seeds/{}/{}",
      self.dataset, self.variant, self.seeds, self.termination, self.mode
    )
  }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct RunRecord {
  /// As printed by the executable; the unit is whatever it reports in.
  pub runtime: u64,
  pub measured_at: DateTime<Utc>,
}

/// One entry of the on-disk store.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StoredRun {
  #[serde(flatten)]
  pub key: RunKey,
  #[serde(flatten)]
  pub record: RunRecord,
}

pub const STORE_FORMAT_VERSION: u32 = 1;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StoreFile {
  pub version: u32,
  #[serde(default)]
  pub runs: Vec<StoredRun>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  #[test]
  fn test_variant_labels() {
    assert_eq!(AlgorithmVariant::Accelerator.to_string(), "GPU");
    assert_eq!(AlgorithmVariant::Plain.to_string(), "Serial");
    assert_eq!(
      AlgorithmVariant::ParallelRuntime { threads: 4 }.to_string(),
      "TBB_4"
    );
    assert_eq!(
      AlgorithmVariant::ParallelRuntime { threads: 4 }.thread_count(),
      Some(4)
    );
    assert_eq!(AlgorithmVariant::Accelerator.thread_count(), None);
  }

  #[test]
  fn test_variant_is_serialized_structurally() {
    let json = serde_json::to_string(&AlgorithmVariant::ParallelRuntime { threads: 8 }).unwrap();
    assert_eq!(json, r#"{"kind":"parallel_runtime","threads":8}"#);
    let back: AlgorithmVariant = serde_json::from_str(r#"{"kind":"accelerator"}"#).unwrap();
    assert_eq!(back, AlgorithmVariant::Accelerator);
  }

  #[test]
  fn test_stored_run_is_flat() {
    let run = StoredRun {
      key: RunKey {
        dataset: "fusion.bov".to_string(),
        variant: AlgorithmVariant::ParallelRuntime { threads: 2 },
        seeds: 1000,
        termination: TerminationClass::Med,
        mode: AdvectionMode::Streamline,
      },
      record: RunRecord {
        runtime: 31,
        measured_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
      },
    };
    let value = serde_json::to_value(&run).unwrap();
    assert_eq!(value["dataset"], "fusion.bov");
    assert_eq!(value["termination"], "med");
    assert_eq!(value["mode"], "streamline");
    assert_eq!(value["variant"]["threads"], 2);
    assert_eq!(value["runtime"], 31);

    let back: StoredRun = serde_json::from_value(value).unwrap();
    assert_eq!(back.key, run.key);
    assert_eq!(back.record, run.record);
  }

  #[test]
  fn test_run_key_label() {
    let key = RunKey {
      dataset: "astro.bov".to_string(),
      variant: AlgorithmVariant::Accelerator,
      seeds: 10000,
      termination: TerminationClass::Long,
      mode: AdvectionMode::Particle,
    };
    assert_eq!(key.to_string(), "astro.bov/GPU/10000 seeds/long/particle");
  }
}

use crate::AdvectionMode;
use crate::AlgorithmVariant;
use crate::RunKey;
use crate::TerminationClass;
use itertools::iproduct;
use serde::Deserialize;
use serde::Serialize;

#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetConfig {
  /// File name, relative to the machine's data directory.
  pub file: String,
  /// Integration step size passed as `-h`.
  pub step_size: f64,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TerminationConfig {
  pub class: TerminationClass,
  /// Passed as `-steps`.
  pub steps: u64,
}

fn default_datasets() -> Vec<DatasetConfig> {
  vec![
    DatasetConfig {
      file: "astro.bov".to_string(),
      step_size: 0.005,
    },
    DatasetConfig {
      file: "fusion.bov".to_string(),
      step_size: 0.005,
    },
    DatasetConfig {
      file: "fishtank.bov".to_string(),
      step_size: 0.0002,
    },
  ]
}

fn default_terminations() -> Vec<TerminationConfig> {
  vec![
    TerminationConfig {
      class: TerminationClass::Short,
      steps: 10,
    },
    TerminationConfig {
      class: TerminationClass::Med,
      steps: 100,
    },
    TerminationConfig {
      class: TerminationClass::Long,
      steps: 1000,
    },
  ]
}

fn default_seeds() -> Vec<u64> {
  vec![1_000, 10_000, 100_000, 1_000_000]
}

fn default_modes() -> Vec<AdvectionMode> {
  vec![AdvectionMode::Particle]
}

/// Parameter tables of a sweep. Every field has a built-in default, so a config file only needs to list what it changes.
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SweepConfig {
  #[serde(default = "default_datasets")]
  pub datasets: Vec<DatasetConfig>,

  /// Swept in the listed order.
  #[serde(default = "default_terminations")]
  pub terminations: Vec<TerminationConfig>,

  /// Seed counts passed as `-seeds`.
  #[serde(default = "default_seeds")]
  pub seeds: Vec<u64>,

  /// Defaults to particle advection only.
  #[serde(default = "default_modes")]
  pub modes: Vec<AdvectionMode>,

  /// Kill a run that has not exited after this many seconds. Unbounded if unset. Can be overridden via CLI.
  pub timeout_secs: Option<u64>,
}

impl Default for SweepConfig {
  fn default() -> Self {
    Self {
      datasets: default_datasets(),
      terminations: default_terminations(),
      seeds: default_seeds(),
      modes: default_modes(),
      timeout_secs: None,
    }
  }
}

impl SweepConfig {
  pub fn step_size(&self, dataset: &str) -> Option<f64> {
    self
      .datasets
      .iter()
      .find(|d| d.file == dataset)
      .map(|d| d.step_size)
  }

  pub fn steps(&self, class: TerminationClass) -> Option<u64> {
    self
      .terminations
      .iter()
      .find(|t| t.class == class)
      .map(|t| t.steps)
  }

  /// Every run key of the sweep, nested as datasets, then termination classes, then variants, then seed counts, then modes.
  pub fn plan(&self, variants: &[AlgorithmVariant]) -> Vec<RunKey> {
    iproduct!(
      self.datasets.iter(),
      self.terminations.iter(),
      variants.iter(),
      self.seeds.iter(),
      self.modes.iter()
    )
    .map(|(dataset, termination, variant, seeds, mode)| RunKey {
      dataset: dataset.file.clone(),
      variant: *variant,
      seeds: *seeds,
      termination: termination.class,
      mode: *mode,
    })
    .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let cfg = SweepConfig::default();
    assert_eq!(cfg.step_size("fishtank.bov"), Some(0.0002));
    assert_eq!(cfg.step_size("missing.bov"), None);
    assert_eq!(cfg.steps(TerminationClass::Short), Some(10));
    assert_eq!(cfg.steps(TerminationClass::Long), Some(1000));
    assert_eq!(cfg.seeds.len(), 4);
    assert_eq!(cfg.modes, vec![AdvectionMode::Particle]);
    assert_eq!(cfg.timeout_secs, None);
  }

  #[test]
  fn test_partial_yaml_keeps_defaults() {
    let cfg: SweepConfig = serde_yaml::from_str(
      "
seeds: [10, 20]
modes: [particle, streamline]
timeout_secs: 600
",
    )
    .unwrap();
    assert_eq!(cfg.seeds, vec![10, 20]);
    assert_eq!(cfg.modes, vec![
      AdvectionMode::Particle,
      AdvectionMode::Streamline
    ]);
    assert_eq!(cfg.timeout_secs, Some(600));
    assert_eq!(cfg.datasets, SweepConfig::default().datasets);
    assert_eq!(cfg.terminations, SweepConfig::default().terminations);
  }

  #[test]
  fn test_unknown_yaml_field_is_rejected() {
    let res = serde_yaml::from_str::<SweepConfig>("seed: [10]\n");
    assert!(res.is_err());
  }

  #[test]
  fn test_plan_order() {
    let cfg = SweepConfig {
      datasets: vec![
        DatasetConfig {
          file: "a.bov".to_string(),
          step_size: 0.1,
        },
        DatasetConfig {
          file: "b.bov".to_string(),
          step_size: 0.1,
        },
      ],
      terminations: vec![
        TerminationConfig {
          class: TerminationClass::Short,
          steps: 1,
        },
        TerminationConfig {
          class: TerminationClass::Long,
          steps: 2,
        },
      ],
      seeds: vec![1, 2],
      modes: vec![AdvectionMode::Particle, AdvectionMode::Streamline],
      timeout_secs: None,
    };
    let variants = [
      AlgorithmVariant::Accelerator,
      AlgorithmVariant::ParallelRuntime { threads: 4 },
    ];
    let plan = cfg.plan(&variants);
    assert_eq!(plan.len(), 2 * 2 * 2 * 2 * 2);

    // Mode varies fastest, dataset slowest.
    assert_eq!(plan[0].dataset, "a.bov");
    assert_eq!(plan[0].mode, AdvectionMode::Particle);
    assert_eq!(plan[1].mode, AdvectionMode::Streamline);
    assert_eq!(plan[1].seeds, 1);
    assert_eq!(plan[2].seeds, 2);
    assert_eq!(plan[4].variant, AlgorithmVariant::ParallelRuntime {
      threads: 4
    });
    assert_eq!(plan[8].termination, TerminationClass::Long);
    assert_eq!(plan[16].dataset, "b.bov");

    let mut unique = plan.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), plan.len());
  }
}

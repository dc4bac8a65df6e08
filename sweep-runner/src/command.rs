use std::fmt::Write;
use sweep_types::config::SweepConfig;
use sweep_types::machine::Launcher;
use sweep_types::machine::MachineProfile;
use sweep_types::AlgorithmVariant;
use sweep_types::RunKey;

pub fn binary_name(variant: AlgorithmVariant) -> &'static str {
  match variant {
    AlgorithmVariant::Plain => "Particle_Advection_SERIAL",
    AlgorithmVariant::Accelerator => "Particle_Advection_CUDA",
    AlgorithmVariant::ParallelRuntime { .. } => "Particle_Advection_TBB",
  }
}

/// Formats the shell command line for `key` on `profile`. Datasets or termination classes missing from `cfg` have no step size or step count and return `None`.
pub fn build_command(profile: &MachineProfile, cfg: &SweepConfig, key: &RunKey) -> Option<String> {
  let step_size = cfg.step_size(&key.dataset)?;
  let steps = cfg.steps(key.termination)?;
  let binary = binary_name(key.variant);

  let mut cmd = match profile.launcher {
    Launcher::Direct => profile.exe_dir.join(binary).display().to_string(),
    Launcher::Aprun { ranks } => format!(
      "cd {}; aprun -n {} {}",
      profile.exe_dir.display(),
      ranks,
      binary
    ),
  };
  write!(
    cmd,
    " -seeds {} -file {} -h {:.6} -steps {} -{}",
    key.seeds,
    profile.data_dir.join(&key.dataset).display(),
    step_size,
    steps,
    key.mode,
  )
  .unwrap();
  if let Some(threads) = key.variant.thread_count() {
    write!(cmd, " -t {}", threads).unwrap();
  };
  Some(cmd)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::path::PathBuf;
  use sweep_types::machine::lookup;
  use sweep_types::AdvectionMode;
  use sweep_types::TerminationClass;

  fn profile(has_gpu: bool) -> MachineProfile {
    MachineProfile {
      name: "bench".to_string(),
      exe_dir: PathBuf::from("build/bin"),
      data_dir: PathBuf::from("data"),
      has_gpu,
      has_tbb: true,
      max_threads: 16,
      launcher: Launcher::Direct,
    }
  }

  fn key(variant: AlgorithmVariant) -> RunKey {
    RunKey {
      dataset: "astro.bov".to_string(),
      variant,
      seeds: 1000,
      termination: TerminationClass::Med,
      mode: AdvectionMode::Particle,
    }
  }

  #[test]
  fn test_parallel_runtime_command() {
    let cmd = build_command(
      &profile(false),
      &SweepConfig::default(),
      &key(AlgorithmVariant::ParallelRuntime { threads: 4 }),
    )
    .unwrap();
    assert_eq!(
      cmd,
      "build/bin/Particle_Advection_TBB -seeds 1000 -file data/astro.bov -h 0.005000 -steps 100 -particle -t 4"
    );
    assert!(cmd.contains("-t 4"));
  }

  #[test]
  fn test_accelerator_command() {
    let cmd = build_command(
      &profile(true),
      &SweepConfig::default(),
      &key(AlgorithmVariant::Accelerator),
    )
    .unwrap();
    assert!(cmd.starts_with("build/bin/Particle_Advection_CUDA "));
    assert!(!cmd.contains("-t "));
  }

  #[test]
  fn test_plain_command() {
    let cmd = build_command(
      &profile(false),
      &SweepConfig::default(),
      &key(AlgorithmVariant::Plain),
    )
    .unwrap();
    assert!(cmd.starts_with("build/bin/Particle_Advection_SERIAL "));
    assert!(!cmd.contains("-t "));
  }

  #[test]
  fn test_aprun_launcher() {
    let titan = lookup("titan").unwrap();
    let mut key = key(AlgorithmVariant::Accelerator);
    key.dataset = "fishtank.bov".to_string();
    key.mode = AdvectionMode::Streamline;
    key.termination = TerminationClass::Long;
    let cmd = build_command(&titan, &SweepConfig::default(), &key).unwrap();
    assert_eq!(
      cmd,
      "cd /lustre/atlas/scratch/pugmire/csc094/vtkm/titan; aprun -n 1 Particle_Advection_CUDA -seeds 1000 -file /lustre/atlas/scratch/pugmire/csc094/vtkm/titan/fishtank.bov -h 0.000200 -steps 1000 -streamline"
    );
  }

  #[test]
  fn test_unknown_dataset_has_no_command() {
    let mut key = key(AlgorithmVariant::Accelerator);
    key.dataset = "unlisted.bov".to_string();
    assert_eq!(
      build_command(&profile(true), &SweepConfig::default(), &key),
      None
    );
  }
}

use crate::AlgorithmVariant;
use serde::Deserialize;
use serde::Serialize;
use std::path::PathBuf;

/// How the advection binary is started on a machine.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub enum Launcher {
  /// Run `<exe_dir>/<binary>` directly.
  Direct,
  /// Change into `exe_dir` and start the binary through `aprun -n <ranks>`.
  Aprun { ranks: u32 },
}

/// Capabilities and paths of one machine. Built once at startup and never mutated.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MachineProfile {
  pub name: String,
  pub exe_dir: PathBuf,
  pub data_dir: PathBuf,
  pub has_gpu: bool,
  pub has_tbb: bool,
  pub max_threads: u32,
  pub launcher: Launcher,
}

impl MachineProfile {
  /// Where this machine's result store lives.
  pub fn store_path(&self) -> PathBuf {
    self.data_dir.join(format!("{}.sweep.json", self.name))
  }

  /// Variants eligible on this machine, in sweep order.
  ///
  /// With `tbb_scale`, the parallel runtime is additionally swept at every thread count from 1 up to (but excluding) `max_threads`, which is already covered by the default variant.
  pub fn variants(&self, tbb_scale: bool) -> Vec<AlgorithmVariant> {
    let mut variants = Vec::new();
    if self.has_gpu {
      variants.push(AlgorithmVariant::Accelerator);
    };
    if self.has_tbb && self.max_threads > 0 {
      variants.push(AlgorithmVariant::ParallelRuntime {
        threads: self.max_threads,
      });
      if tbb_scale {
        variants.extend(
          (1..self.max_threads).map(|threads| AlgorithmVariant::ParallelRuntime { threads }),
        );
      };
    };
    if variants.is_empty() {
      variants.push(AlgorithmVariant::Plain);
    };
    variants
  }
}

struct MachineEntry {
  name: &'static str,
  exe_dir: &'static str,
  data_dir: &'static str,
  has_gpu: bool,
  has_tbb: bool,
  max_threads: u32,
  launcher: Launcher,
}

// New machines are added here. Thread counts are physical cores; hyperthreading is not used.
const REGISTRY: &[MachineEntry] = &[
  MachineEntry {
    name: "titan",
    exe_dir: "/lustre/atlas/scratch/pugmire/csc094/vtkm/titan",
    data_dir: "/lustre/atlas/scratch/pugmire/csc094/vtkm/titan",
    has_gpu: true,
    has_tbb: true,
    max_threads: 16,
    launcher: Launcher::Aprun { ranks: 1 },
  },
  MachineEntry {
    name: "rhea",
    exe_dir: "build/bin",
    data_dir: ".",
    has_gpu: false,
    has_tbb: true,
    max_threads: 16,
    launcher: Launcher::Direct,
  },
  MachineEntry {
    name: "rheaGPU",
    exe_dir: "build.rhea/bin",
    data_dir: "/lustre/atlas/scratch/pugmire/csc094/vtkm/titan",
    has_gpu: true,
    has_tbb: true,
    max_threads: 28,
    launcher: Launcher::Direct,
  },
  MachineEntry {
    name: "whoopingcough",
    exe_dir: "./build/bin",
    data_dir: "data",
    has_gpu: true,
    has_tbb: true,
    max_threads: 24,
    launcher: Launcher::Direct,
  },
];

pub fn machine_names() -> impl Iterator<Item = &'static str> {
  REGISTRY.iter().map(|m| m.name)
}

pub fn lookup(name: &str) -> Option<MachineProfile> {
  REGISTRY
    .iter()
    .find(|m| m.name == name)
    .map(|m| MachineProfile {
      name: m.name.to_string(),
      exe_dir: PathBuf::from(m.exe_dir),
      data_dir: PathBuf::from(m.data_dir),
      has_gpu: m.has_gpu,
      has_tbb: m.has_tbb,
      max_threads: m.max_threads,
      launcher: m.launcher,
    })
}

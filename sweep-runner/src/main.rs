use clap::Parser;
use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use sweep_runner::exec::ShellExecutor;
use sweep_runner::store::ResultStore;
use sweep_runner::sweep::load_config;
use sweep_runner::sweep::Sweep;
use sweep_runner::SweepError;
use sweep_runner::SweepResult;
use sweep_types::config::SweepConfig;
use sweep_types::machine::lookup;
use sweep_types::machine::machine_names;
use tracing::error;
use tracing::info;
use tracing::warn;

/*

# Sweep runner

Runs every combination of dataset, termination class, algorithm variant, seed count, and advection mode that the machine supports through the particle advection executables, and records each reported runtime in `<data_dir>/<machine>.sweep.json`.

- A combination that already has a result is never run again. Delete its entry (or the whole store) to re-measure it.
- The store is written after every run, so an interrupted sweep loses at most the run in flight, and rerunning the same command resumes where it stopped.
- Runs that exit without printing a `Runtime =` line are not recorded and get retried by the next sweep.

*/

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
  /// Name of the machine to sweep on; selects executables, data, and eligible variants.
  #[arg(long)]
  mach: Option<String>,

  /// Also sweep the parallel runtime at every thread count below the machine's maximum.
  #[arg(long)]
  tbbscale: bool,

  /// YAML file overriding the built-in sweep parameter tables.
  #[arg(long)]
  config: Option<PathBuf>,

  /// Kill a run after this many seconds (overrides config).
  #[arg(long)]
  timeout_secs: Option<u64>,

  /// Print the commands that would run without running them.
  #[arg(long)]
  dry_run: bool,
}

/// Accepts the single-dash spellings (`-mach`, `-tbbscale`) that existing job scripts use.
fn normalize_legacy_args(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
  args
    .into_iter()
    .map(|arg| match arg.to_str() {
      Some("-mach") => OsString::from("--mach"),
      Some("-tbbscale") => OsString::from("--tbbscale"),
      _ => arg,
    })
    .collect()
}

async fn run_sweep(cli: Cli, machine: String) -> SweepResult<()> {
  let profile = lookup(&machine).ok_or_else(|| SweepError::UnknownMachine(machine.clone()))?;
  let cfg = match &cli.config {
    Some(path) => load_config(path)?,
    None => SweepConfig::default(),
  };
  let timeout = cli
    .timeout_secs
    .or(cfg.timeout_secs)
    .map(Duration::from_secs);

  let variants = profile.variants(cli.tbbscale);
  let keys = cfg.plan(&variants);
  info!(
    machine = %profile.name,
    variants = ?variants.iter().map(|v| v.to_string()).collect::<Vec<_>>(),
    runs = keys.len(),
    "planned sweep",
  );

  if cli.dry_run {
    let store = ResultStore::load_read_only(profile.store_path())?;
    let sweep = Sweep::new(&profile, &cfg, store, ShellExecutor::new(timeout));
    for (_, cmd) in sweep.dry_run(&keys) {
      println!("{}", cmd);
    }
    return Ok(());
  };

  let store = ResultStore::load(profile.store_path())?;
  let mut sweep = Sweep::new(&profile, &cfg, store, ShellExecutor::new(timeout));

  // Dropping the sweep future kills the in-flight child. Everything recorded before it is already on disk.
  tokio::select! {
    res = sweep.run(&keys) => {
      res?;
    }
    _ = tokio::signal::ctrl_c() => {
      warn!("interrupted, in-flight run discarded");
      return Err(SweepError::Interrupted);
    }
  };
  Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
  tracing_subscriber::fmt::init();

  let cli = Cli::parse_from(normalize_legacy_args(env::args_os()));

  let Some(machine) = cli.mach.clone() else {
    let program = env::args().next().unwrap_or_else(|| "sweep-runner".to_string());
    println!("Usage: {} -mach <machine>", program);
    println!("Known machines: {}", machine_names().collect::<Vec<_>>().join(", "));
    return ExitCode::SUCCESS;
  };

  match run_sweep(cli, machine).await {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      error!(error = %err, "sweep failed");
      ExitCode::FAILURE
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(normalize_legacy_args(args.iter().map(OsString::from))).unwrap()
  }

  #[test]
  fn test_legacy_flags() {
    let cli = parse(&["sweep-runner", "-mach", "rhea", "-tbbscale"]);
    assert_eq!(cli.mach.as_deref(), Some("rhea"));
    assert!(cli.tbbscale);
  }

  #[test]
  fn test_modern_flags() {
    let cli = parse(&[
      "sweep-runner",
      "--mach",
      "titan",
      "--timeout-secs",
      "90",
      "--dry-run",
    ]);
    assert_eq!(cli.mach.as_deref(), Some("titan"));
    assert!(!cli.tbbscale);
    assert_eq!(cli.timeout_secs, Some(90));
    assert!(cli.dry_run);
  }

  #[test]
  fn test_machine_is_optional_at_parse_time() {
    let cli = parse(&["sweep-runner"]);
    assert!(cli.mach.is_none());
  }

  #[tokio::test]
  async fn test_unknown_machine_is_an_error() {
    let cli = parse(&["sweep-runner", "-mach", "nowhere"]);
    let res = run_sweep(cli, "nowhere".to_string()).await;
    assert!(matches!(res, Err(SweepError::UnknownMachine(name)) if name == "nowhere"));
  }
}

use clap::Parser;
use itertools::Itertools;
use std::path::PathBuf;
use std::process::ExitCode;
use sweep_runner::store::ResultStore;
use sweep_runner::SweepError;
use sweep_runner::SweepResult;
use sweep_types::machine::lookup;
use sweep_types::RunKey;
use sweep_types::RunRecord;
use tracing::error;

/// Prints the runtimes recorded by sweep-runner.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
  /// Read the store of this registered machine.
  #[arg(long, conflicts_with = "store", required_unless_present = "store")]
  mach: Option<String>,

  /// Read the store at this path.
  #[arg(long)]
  store: Option<PathBuf>,

  /// Only show runs on this dataset.
  #[arg(long)]
  dataset: Option<String>,

  /// Print the raw store as JSON instead of a table.
  #[arg(long)]
  json: bool,
}

const HEADERS: [&str; 7] = [
  "dataset",
  "termination",
  "variant",
  "seeds",
  "mode",
  "runtime",
  "measured_at",
];

fn row(key: &RunKey, record: &RunRecord) -> [String; 7] {
  [
    key.dataset.clone(),
    key.termination.to_string(),
    key.variant.to_string(),
    key.seeds.to_string(),
    key.mode.to_string(),
    record.runtime.to_string(),
    record.measured_at.format("%Y-%m-%d %H:%M:%S").to_string(),
  ]
}

/// Rows are ordered by dataset, then termination class, then variant, then seed count, then mode, following the order a sweep visits them in.
fn render_table<'a>(runs: impl Iterator<Item = (&'a RunKey, &'a RunRecord)>) -> String {
  let rows = runs
    .sorted_by(|(a, _), (b, _)| {
      (&a.dataset, a.termination, a.variant, a.seeds, a.mode).cmp(&(
        &b.dataset,
        b.termination,
        b.variant,
        b.seeds,
        b.mode,
      ))
    })
    .map(|(key, record)| row(key, record))
    .collect_vec();

  let mut widths = HEADERS.map(str::len);
  for r in &rows {
    for (w, cell) in widths.iter_mut().zip(r.iter()) {
      *w = (*w).max(cell.len());
    }
  }

  let format_line = |cells: &[&str]| {
    cells
      .iter()
      .zip(widths.iter())
      .map(|(cell, w)| format!("{:<width$}", cell, width = *w))
      .join("  ")
      .trim_end()
      .to_string()
  };

  let mut out = format_line(&HEADERS[..]);
  out.push('\n');
  for r in &rows {
    out.push_str(&format_line(&r.iter().map(String::as_str).collect_vec()));
    out.push('\n');
  }
  out.push_str(&format!("{} runs\n", rows.len()));
  out
}

fn report(cli: Cli) -> SweepResult<()> {
  let path = match (cli.store, cli.mach) {
    (Some(path), _) => path,
    (None, Some(mach)) => lookup(&mach)
      .ok_or(SweepError::UnknownMachine(mach))?
      .store_path(),
    (None, None) => unreachable!("clap requires --mach or --store"),
  };
  // Never creates a store, unlike the runner.
  let store = ResultStore::open(path)?;

  if cli.json {
    let mut file = store.to_file();
    if let Some(dataset) = &cli.dataset {
      file.runs.retain(|r| &r.key.dataset == dataset);
    };
    let raw = serde_json::to_string_pretty(&file).map_err(|source| SweepError::CorruptStore {
      path: store.path().to_path_buf(),
      source,
    })?;
    println!("{}", raw);
    return Ok(());
  };

  let runs = store
    .iter()
    .filter(|(key, _)| cli.dataset.as_ref().map_or(true, |d| &key.dataset == d));
  print!("{}", render_table(runs));
  Ok(())
}

fn main() -> ExitCode {
  // Stdout carries the report.
  tracing_subscriber::fmt().with_writer(std::io::stderr).init();

  match report(Cli::parse()) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      error!(error = %err, "failed to read result store");
      ExitCode::FAILURE
    }
  }
}

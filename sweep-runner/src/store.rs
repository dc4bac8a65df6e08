use crate::SweepError;
use crate::SweepResult;
use chrono::Utc;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use sweep_types::RunKey;
use sweep_types::RunRecord;
use sweep_types::StoreFile;
use sweep_types::StoredRun;
use sweep_types::STORE_FORMAT_VERSION;
use tracing::debug;
use tracing::info;

/// Measured runtimes of one machine, keyed by run. Only a single process is expected to use a store at a time.
pub struct ResultStore {
  path: PathBuf,
  runs: BTreeMap<RunKey, RunRecord>,
}

fn storage_err(path: &Path) -> impl FnOnce(io::Error) -> SweepError + '_ {
  move |source| SweepError::Storage {
    path: path.to_path_buf(),
    source,
  }
}

impl ResultStore {
  /// Loads the store at `path`. If nothing exists there yet, an empty store is created and written out immediately, so an unwritable location fails here rather than after the first run.
  pub fn load(path: impl Into<PathBuf>) -> SweepResult<Self> {
    let path = path.into();
    if path.exists() {
      return Self::open(path);
    };
    let store = Self {
      path,
      runs: BTreeMap::new(),
    };
    store.persist()?;
    info!(path = %store.path.display(), "created empty result store");
    Ok(store)
  }

  /// Like `load`, but fails if the store does not exist.
  pub fn open(path: impl Into<PathBuf>) -> SweepResult<Self> {
    let path = path.into();
    let raw = fs::read_to_string(&path).map_err(storage_err(&path))?;
    let file: StoreFile =
      serde_json::from_str(&raw).map_err(|source| SweepError::CorruptStore {
        path: path.clone(),
        source,
      })?;
    let runs = file
      .runs
      .into_iter()
      .map(|r| (r.key, r.record))
      .collect::<BTreeMap<_, _>>();
    info!(path = %path.display(), runs = runs.len(), "loaded result store");
    Ok(Self { path, runs })
  }

  /// Like `load`, but never touches the filesystem when nothing exists at `path` yet: the store starts empty in memory.
  pub fn load_read_only(path: impl Into<PathBuf>) -> SweepResult<Self> {
    let path = path.into();
    if path.exists() {
      return Self::open(path);
    };
    Ok(Self {
      path,
      runs: BTreeMap::new(),
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn len(&self) -> usize {
    self.runs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.runs.is_empty()
  }

  /// Presence is all that matters: a stored key is never run again, however old its result.
  pub fn needs_run(&self, key: &RunKey) -> bool {
    !self.runs.contains_key(key)
  }

  pub fn get(&self, key: &RunKey) -> Option<&RunRecord> {
    self.runs.get(key)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&RunKey, &RunRecord)> {
    self.runs.iter()
  }

  /// Stores `runtime` under `key`, replacing any previous result. Not written to disk until `persist`.
  pub fn record(&mut self, key: RunKey, runtime: u64) {
    self.runs.insert(key, RunRecord {
      runtime,
      measured_at: Utc::now(),
    });
  }

  pub fn to_file(&self) -> StoreFile {
    StoreFile {
      version: STORE_FORMAT_VERSION,
      runs: self
        .runs
        .iter()
        .map(|(key, record)| StoredRun {
          key: key.clone(),
          record: *record,
        })
        .collect(),
    }
  }

  pub fn persist(&self) -> SweepResult<()> {
    self.persist_to(&self.path)
  }

  /// Overwrites whatever is at `path`. The new content goes to a sibling temporary file first and is renamed into place, so a crash mid-write leaves the previous store intact.
  pub fn persist_to(&self, path: &Path) -> SweepResult<()> {
    let raw = serde_json::to_string_pretty(&self.to_file()).map_err(|source| {
      SweepError::CorruptStore {
        path: path.to_path_buf(),
        source,
      }
    })?;
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);
    fs::write(&tmp_path, raw).map_err(storage_err(&tmp_path))?;
    fs::rename(&tmp_path, path).map_err(storage_err(path))?;
    debug!(path = %path.display(), runs = self.runs.len(), "persisted result store");
    Ok(())
  }
}

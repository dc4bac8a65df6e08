use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::io;
use std::path::PathBuf;

pub mod command;
pub mod exec;
pub mod record;
pub mod store;
pub mod sweep;

pub type SweepResult<T> = Result<T, SweepError>;

#[derive(Debug)]
pub enum SweepError {
  UnknownMachine(String),
  Config {
    path: PathBuf,
    source: Box<dyn Error + Send + Sync>,
  },
  Storage {
    path: PathBuf,
    source: io::Error,
  },
  CorruptStore {
    path: PathBuf,
    source: serde_json::Error,
  },
  Spawn(io::Error),
  Interrupted,
}

impl Display for SweepError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SweepError::UnknownMachine(name) => write!(f, "no machine named {:?} is registered", name),
      SweepError::Config { path, source } => {
        write!(f, "failed to load sweep config {}: {}", path.display(), source)
      }
      SweepError::Storage { path, source } => {
        write!(f, "failed to access result store {}: {}", path.display(), source)
      }
      SweepError::CorruptStore { path, source } => {
        write!(f, "result store {} is not valid: {}", path.display(), source)
      }
      SweepError::Spawn(source) => write!(f, "failed to start shell: {}", source),
      SweepError::Interrupted => write!(f, "sweep was interrupted"),
    }
  }
}

impl Error for SweepError {
  fn source(&self) -> Option<&(dyn Error + 'static)> {
    match self {
      SweepError::UnknownMachine(_) | SweepError::Interrupted => None,
      SweepError::Config { source, .. } => Some(source.as_ref()),
      SweepError::Storage { source, .. } => Some(source),
      SweepError::CorruptStore { source, .. } => Some(source),
      SweepError::Spawn(source) => Some(source),
    }
  }
}

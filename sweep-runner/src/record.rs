use crate::store::ResultStore;
use sweep_types::RunKey;
use tracing::warn;

pub const RUNTIME_MARKER: &str = "Runtime =";

// Whitespace-separated field holding the value, e.g. "Runtime = 42 ms" -> "42".
const RUNTIME_FIELD: usize = 2;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum RuntimeParse {
  Found(u64),
  /// No line carries the marker.
  Absent,
  /// The first marker line has no integer in the runtime field.
  Malformed(String),
}

/// Classifies the first line containing the runtime marker. Later marker lines are ignored.
pub fn parse_runtime<S: AsRef<str>>(lines: &[S]) -> RuntimeParse {
  let Some(line) = lines
    .iter()
    .map(|l| l.as_ref())
    .find(|l| l.contains(RUNTIME_MARKER))
  else {
    return RuntimeParse::Absent;
  };
  match line
    .split_whitespace()
    .nth(RUNTIME_FIELD)
    .and_then(|f| f.parse::<u64>().ok())
  {
    Some(runtime) => RuntimeParse::Found(runtime),
    None => RuntimeParse::Malformed(line.to_string()),
  }
}

/// Stores the runtime reported in `lines` under `key`. The store is left untouched unless a well-formed runtime is found, so the key will be run again by the next sweep.
pub fn record_result<S: AsRef<str>>(
  store: &mut ResultStore,
  key: &RunKey,
  lines: &[S],
) -> RuntimeParse {
  let parsed = parse_runtime(lines);
  match &parsed {
    RuntimeParse::Found(runtime) => store.record(key.clone(), *runtime),
    RuntimeParse::Absent => {}
    RuntimeParse::Malformed(line) => {
      warn!(key = %key, line = %line, "runtime line is malformed, leaving run unrecorded");
    }
  };
  parsed
}

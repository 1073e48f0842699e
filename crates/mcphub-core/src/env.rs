// ABOUTME: Environment loader for the hub's KEY=VALUE env file.
// ABOUTME: Merges file entries into an explicit snapshot without overwriting existing keys.

use crate::error::{HubError, Result};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// The hub's view of its environment. Lookups (config keys, `${VAR}`
/// overrides) read this map rather than ambient process state.
pub type EnvSnapshot = BTreeMap<String, String>;

/// Capture the current process environment. Entries that are not valid
/// unicode are left out of the snapshot, but children still inherit them
/// from the process itself.
pub fn process_snapshot() -> EnvSnapshot {
    std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect()
}

/// Merge a `KEY=VALUE` env file into `env`. Keys already present win
/// (first writer wins). Malformed lines are skipped with a warning, and a
/// missing file is not an error. Returns the number of keys added.
pub fn load_env_file(path: &Path, env: &mut EnvSnapshot) -> Result<usize> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No env file, skipping");
            return Ok(0);
        }
        Err(e) => return Err(HubError::io(path, e)),
    };

    let mut added = 0;
    for (index, line) in content.lines().enumerate() {
        let Some((key, value)) = parse_line(line) else {
            if !is_ignorable(line) {
                warn!(
                    path = %path.display(),
                    line = index + 1,
                    "Skipping malformed env file line"
                );
            }
            continue;
        };
        if env.contains_key(key) {
            debug!(key = %key, "Env file entry already set, keeping existing value");
            continue;
        }
        env.insert(key.to_string(), value.to_string());
        added += 1;
    }

    debug!(path = %path.display(), added, "Loaded env file");
    Ok(added)
}

fn is_ignorable(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line.starts_with('#')
}

/// Split on the first `=` and trim both sides. The value is otherwise
/// taken verbatim: no quoting, comments or `$` expansion.
fn parse_line(line: &str) -> Option<(&str, &str)> {
    if is_ignorable(line) {
        return None;
    }
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value.trim()))
}

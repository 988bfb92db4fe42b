use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use coursebin_core::StateSnapshot;
use coursebin_logging::{cb_info, cb_warn};
use tempfile::NamedTempFile;

pub const STATE_FILENAME: &str = ".coursebin_state.ron";

/// Local state from the last run. Missing or unreadable state starts empty.
pub fn load_snapshot(state_dir: &Path) -> StateSnapshot {
    let path = state_dir.join(STATE_FILENAME);
    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return StateSnapshot::default();
        }
        Err(err) => {
            cb_warn!("Failed to read state from {:?}: {}", path, err);
            return StateSnapshot::default();
        }
    };

    match ron::from_str(&content) {
        Ok(snapshot) => {
            cb_info!("Loaded state from {:?}", path);
            snapshot
        }
        Err(err) => {
            cb_warn!("Failed to parse state from {:?}: {}", path, err);
            StateSnapshot::default()
        }
    }
}

pub fn save_snapshot(state_dir: &Path, snapshot: &StateSnapshot) -> anyhow::Result<PathBuf> {
    let pretty = ron::ser::PrettyConfig::new();
    let content =
        ron::ser::to_string_pretty(snapshot, pretty).context("serializing local state")?;
    let path = write_replacing(state_dir, STATE_FILENAME, &content)
        .with_context(|| format!("writing state to {}", state_dir.display()))?;
    cb_info!("Saved state to {:?}", path);
    Ok(path)
}

/// Writes `content` to a temp file in `state_dir` and renames it over
/// `filename`, so a reader never sees a half-written state file.
fn write_replacing(state_dir: &Path, filename: &str, content: &str) -> anyhow::Result<PathBuf> {
    if state_dir.exists() && !state_dir.is_dir() {
        bail!("{} is not a directory", state_dir.display());
    }
    fs::create_dir_all(state_dir).context("creating state directory")?;

    let target = state_dir.join(filename);
    let mut tmp = NamedTempFile::new_in(state_dir).context("creating temp file")?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(&target).map_err(|err| err.error)?;
    Ok(target)
}

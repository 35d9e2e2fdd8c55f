use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{info, warn};

use crate::simulation::SimulationState;

/// Metadata about a snapshot file on disk.
#[derive(Debug, Clone)]
pub struct SnapshotMetadata {
    pub path: PathBuf,
    pub frame: u64,
    pub timestamp: u64,
    pub file_size: u64,
}

/// Errors that can occur during snapshot operations.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serialize(String),
    #[error("Deserialization error: {0}")]
    Deserialize(String),
    #[error("Corrupt snapshot: {}", .0.display())]
    Corrupt(PathBuf),
    #[error("No valid snapshots found. Start a run with: hordewind run --snapshot")]
    NoValidSnapshots,
}

const PREFIX: &str = "run-frame";
const EXTENSION: &str = ".bin";

/// `run-frame{frame}-{timestamp}.bin`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SnapshotName {
    frame: u64,
    timestamp: u64,
}

impl SnapshotName {
    fn parse(filename: &str) -> Option<Self> {
        let (frame, timestamp) = filename
            .strip_prefix(PREFIX)?
            .strip_suffix(EXTENSION)?
            .split_once('-')?;
        Some(Self {
            frame: frame.parse().ok()?,
            timestamp: timestamp.parse().ok()?,
        })
    }
}

impl fmt::Display for SnapshotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}-{}{}", PREFIX, self.frame, self.timestamp, EXTENSION)
    }
}

/// Write through a dot-prefixed sibling and rename over `target`.
/// The sibling is removed on failure, and listing skips dot files.
fn write_atomic(target: &Path, bytes: &[u8]) -> io::Result<()> {
    let name = target
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("snapshot");
    let tmp = target.with_file_name(format!(".{}.tmp", name));
    let result = fs::write(&tmp, bytes).and_then(|()| fs::rename(&tmp, target));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

/// Encode `state` into `snapshot_dir`, creating the directory if needed.
pub fn save_snapshot(
    state: &SimulationState,
    snapshot_dir: &Path,
) -> Result<PathBuf, SnapshotError> {
    fs::create_dir_all(snapshot_dir)?;

    let name = SnapshotName {
        frame: state.frame,
        timestamp: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs()),
    };
    let target = snapshot_dir.join(name.to_string());
    let encoded = bincode::serialize(state).map_err(|e| SnapshotError::Serialize(e.to_string()))?;
    write_atomic(&target, &encoded)?;

    info!(path = %target.display(), frame = state.frame, bytes = encoded.len(), "Snapshot saved");
    Ok(target)
}

/// Decode a run. A grid whose cell storage disagrees with its shape is corrupt.
pub fn load_snapshot(path: &Path) -> Result<SimulationState, SnapshotError> {
    let data = fs::read(path)?;
    let state: SimulationState =
        bincode::deserialize(&data).map_err(|e| SnapshotError::Deserialize(e.to_string()))?;
    if state.grid.is_consistent() {
        Ok(state)
    } else {
        Err(SnapshotError::Corrupt(path.to_path_buf()))
    }
}

/// Snapshots in `snapshot_dir`, newest first. A missing directory has none.
pub fn list_snapshots(snapshot_dir: &Path) -> Result<Vec<SnapshotMetadata>, SnapshotError> {
    if !snapshot_dir.exists() {
        return Ok(Vec::new());
    }

    let mut snapshots = Vec::new();
    for entry in fs::read_dir(snapshot_dir)? {
        let entry = entry?;
        let path = entry.path();
        let Some(name) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(SnapshotName::parse)
        else {
            continue;
        };
        if !path.is_file() {
            continue;
        }
        snapshots.push(SnapshotMetadata {
            file_size: entry.metadata().map_or(0, |m| m.len()),
            path,
            frame: name.frame,
            timestamp: name.timestamp,
        });
    }

    // Same second: the later frame is newer
    snapshots.sort_by(|a, b| (b.timestamp, b.frame).cmp(&(a.timestamp, a.frame)));
    Ok(snapshots)
}

/// Delete all but the `keep` newest snapshots. Returns the deleted paths.
pub fn prune_snapshots(snapshot_dir: &Path, keep: usize) -> Result<Vec<PathBuf>, SnapshotError> {
    let mut deleted = Vec::new();
    for old in list_snapshots(snapshot_dir)?.into_iter().skip(keep) {
        fs::remove_file(&old.path)?;
        deleted.push(old.path);
    }
    if !deleted.is_empty() {
        info!(count = deleted.len(), kept = keep, "Old snapshots pruned");
    }
    Ok(deleted)
}

/// Newest snapshot that decodes, skipping (and logging) unreadable ones.
pub fn load_latest_valid_snapshot(snapshot_dir: &Path) -> Result<SimulationState, SnapshotError> {
    list_snapshots(snapshot_dir)?
        .iter()
        .find_map(|snapshot| match load_snapshot(&snapshot.path) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(path = %snapshot.path.display(), error = %e, "Skipping unreadable snapshot");
                None
            }
        })
        .ok_or(SnapshotError::NoValidSnapshots)
}

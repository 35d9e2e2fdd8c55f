//! On-disk run snapshots (bincode), written atomically and pruned by age.

pub mod snapshot;

pub use snapshot::{
    list_snapshots, load_latest_valid_snapshot, load_snapshot, prune_snapshots, save_snapshot,
    SnapshotError, SnapshotMetadata,
};

//! Copy-to-shared ("hoist") operation for treehoist.
//!
//! Takes the copyable entries of a comparison report and places one copy of
//! each under a shared root, with progress reporting via channels. The
//! operation is idempotent: identical destinations are left as they are and
//! differing destinations are reported as conflicts, never overwritten.

mod conflict;
mod copy;
mod manifest;
mod operation;
mod progress;

pub use conflict::{Conflict, ConflictKind};
pub use copy::{ensure_item, start_hoist, Ensured, HoistOptions, HoistResult};
pub use manifest::{HoistManifest, ManifestEntry, MANIFEST_VERSION};
pub use operation::{HoistError, HoistItem, HoistPlan, OperationError};
pub use progress::{HoistComplete, HoistProgress};

/// Default channel buffer size for hoist progress updates.
pub const OPERATION_CHANNEL_SIZE: usize = 100;

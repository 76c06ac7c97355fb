//! # ArraySense-CSI
//!
//! Fuses CSI snapshot streams captured independently by several receiver
//! nodes (e.g. Intel AX210 NICs under PicoScenes) into one time-aligned,
//! geometry-correct tensor for direction-of-arrival processing.
//!
//! ## Pipeline Stages
//!
//! 1. **Loading**: Read each node's capture export into a [`NodeStream`]
//! 2. **Correlation**: Match every reference-stream frame to the closest
//!    frame of every other node, within a timestamp tolerance
//! 3. **Locking**: Fix the session's (tx, rx, subcarrier) shape from the
//!    first snapshot that honours the configured overrides
//! 4. **Assembly**: Scatter each node's antennas into their array positions
//! 5. **Stacking**: Stack array frames into `(tx, rx, subcarrier, snapshot)`
//!
//! A snapshot that fails any stage is dropped whole and counted in the
//! [`FusionReport`].
//!
//! ## Features
//!
//! - `parallel`: evaluate snapshots after the geometry lock on the rayon
//!   pool. Output is identical to the sequential pass; run the suite both
//!   ways (`cargo test -p arraysense-csi --features parallel`).

pub mod artifact;
pub mod assembler;
pub mod correlator;
pub mod frame;
pub mod loader;
pub mod locker;
pub mod pipeline;
pub mod stacker;

pub use artifact::*;
pub use assembler::*;
pub use correlator::*;
pub use frame::*;
pub use loader::*;
pub use locker::*;
pub use pipeline::*;
pub use stacker::*;

//! Complete snapshot fusion pipeline.
//!
//! Integrates correlation, geometry locking, array assembly and stacking
//! into one pass over the reference stream.

use serde::Serialize;

use arraysense_core::{Error, GeometryRegistry, Result, RunId};

use crate::assembler::{ArrayAssembler, ArrayFrame, ShapeMismatch};
use crate::correlator::{Correlation, SnapshotCorrelator, SnapshotGroup};
use crate::frame::NodeStream;
use crate::locker::{GeometryLocker, LockOutcome, OverrideViolation, SessionGeometry};
use crate::stacker::{OutputTensor, TensorStacker};

/// Counters for one fusion run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FusionReport {
    /// Node whose frames drive the scan
    pub reference_node: Option<usize>,
    /// Frames scanned on the reference node
    pub reference_frames: usize,
    /// Some node had no frame within tolerance
    pub unmatched: usize,
    /// Correlated, but could not lock geometry under the overrides
    pub override_rejected: usize,
    /// Correlated after lock, but some node disagreed with the session shape
    pub shape_mismatched: usize,
    /// Snapshots in the output tensor
    pub accepted: usize,
    /// Nothing survived; the tensor's snapshot axis has length 0
    pub empty_result: bool,
}

/// Everything a run produces
#[derive(Debug)]
pub struct FusionOutput {
    pub run_id: RunId,
    pub tensor: OutputTensor,
    pub geometry: Option<SessionGeometry>,
    /// Source frames of each snapshot, same order as the tensor's last axis
    pub snapshots: Vec<SnapshotGroup>,
    pub report: FusionReport,
}

impl FusionOutput {
    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Fate of one reference-stream index
#[derive(Debug, PartialEq)]
enum SnapshotOutcome {
    Accepted(SnapshotGroup, ArrayFrame),
    Unmatched,
    OverrideRejected,
    ShapeMismatched,
}

/// Fuses per-node CSI streams into one array tensor
pub struct ArrayFusion {
    registry: GeometryRegistry,
    tolerance: u64,
}

impl ArrayFusion {
    /// `tolerance` is in node clock units and is inclusive
    pub fn new(registry: GeometryRegistry, tolerance: u64) -> Result<Self> {
        registry.validate()?;
        Ok(Self {
            registry,
            tolerance,
        })
    }

    pub fn registry(&self) -> &GeometryRegistry {
        &self.registry
    }

    pub fn tolerance(&self) -> u64 {
        self.tolerance
    }

    fn check_streams(&self, streams: &[NodeStream]) -> Result<()> {
        if streams.len() != self.registry.node_count() {
            return Err(Error::NodeCount {
                expected: self.registry.node_count(),
                actual: streams.len(),
            });
        }

        for (stream, layout) in streams.iter().zip(&self.registry.nodes) {
            if stream.positions != layout.positions {
                return Err(Error::InvalidInput(format!(
                    "stream {} carries position map {:?}, registry node {} has {:?}",
                    stream.source, stream.positions, layout.label, layout.positions
                )));
            }
        }

        Ok(())
    }

    /// Run the whole pass
    ///
    /// Discarded snapshots are counted, never raised. An empty result is a
    /// warning, not an error.
    pub fn run(&self, streams: &[NodeStream]) -> Result<FusionOutput> {
        self.check_streams(streams)?;

        let run_id = RunId::new();
        let span = tracing::info_span!("fusion", run = %run_id);
        let _guard = span.enter();

        if let Some(n_tx) = self.registry.overrides.n_tx {
            tracing::warn!("Only frames with {} TX antennas may lock geometry", n_tx);
        }
        if let Some(subcarriers) = self.registry.overrides.subcarriers {
            tracing::warn!("Only frames with {} subcarriers may lock geometry", subcarriers);
        }

        let mut report = FusionReport::default();
        let mut locker = GeometryLocker::new(&self.registry);
        let mut stacker = TensorStacker::new();

        if let Some(correlator) = SnapshotCorrelator::new(streams, self.tolerance) {
            let total = correlator.reference_len();
            report.reference_node = Some(correlator.reference());
            report.reference_frames = total;

            tracing::info!(
                reference = correlator.reference(),
                frames = total,
                tolerance = correlator.tolerance(),
                "Correlating snapshots"
            );

            // Until geometry is locked every index may change the lock state
            let mut next = 0;
            while next < total && !locker.is_locked() {
                let outcome = self.evaluate_unlocked(&correlator, &mut locker, streams, next);
                Self::record(&mut report, &mut stacker, outcome);
                next += 1;
            }

            if let Some(geometry) = locker.geometry().copied() {
                let assembler =
                    ArrayAssembler::new(streams, geometry, self.registry.antennas_per_node);
                for outcome in evaluate_locked_range(&correlator, &assembler, next..total) {
                    Self::record(&mut report, &mut stacker, outcome);
                }
            }
        }

        report.empty_result = stacker.is_empty();
        let geometry = locker.geometry().copied();
        let (tensor, snapshots) = stacker.finish(geometry.as_ref());

        tracing::info!(
            accepted = report.accepted,
            unmatched = report.unmatched,
            override_rejected = report.override_rejected,
            shape_mismatched = report.shape_mismatched,
            empty = report.empty_result,
            shape = ?tensor.dim(),
            "Fusion complete"
        );

        Ok(FusionOutput {
            run_id,
            tensor,
            geometry,
            snapshots,
            report,
        })
    }

    fn evaluate_unlocked(
        &self,
        correlator: &SnapshotCorrelator<'_>,
        locker: &mut GeometryLocker,
        streams: &[NodeStream],
        index: usize,
    ) -> SnapshotOutcome {
        let group = match correlate(correlator, index) {
            Some(group) => group,
            None => return SnapshotOutcome::Unmatched,
        };

        let reference_frame = &streams[correlator.reference()].frames[index];
        match locker.offer(reference_frame) {
            LockOutcome::OverrideRejected(violation) => {
                log_override(index, &violation);
                return SnapshotOutcome::OverrideRejected;
            }
            LockOutcome::Locked | LockOutcome::AlreadyLocked => {}
        }

        match locker.geometry() {
            Some(&geometry) => {
                let assembler =
                    ArrayAssembler::new(streams, geometry, self.registry.antennas_per_node);
                assemble(&assembler, group)
            }
            None => SnapshotOutcome::OverrideRejected,
        }
    }

    fn record(report: &mut FusionReport, stacker: &mut TensorStacker, outcome: SnapshotOutcome) {
        match outcome {
            SnapshotOutcome::Accepted(group, frame) => {
                report.accepted += 1;
                stacker.push(group, frame);
            }
            SnapshotOutcome::Unmatched => report.unmatched += 1,
            SnapshotOutcome::OverrideRejected => report.override_rejected += 1,
            SnapshotOutcome::ShapeMismatched => report.shape_mismatched += 1,
        }
    }
}

fn correlate(correlator: &SnapshotCorrelator<'_>, index: usize) -> Option<SnapshotGroup> {
    match correlator.correlate(index) {
        Correlation::Matched(group) => Some(group),
        Correlation::Unmatched { node, best_delta } => {
            tracing::debug!(index, node, ?best_delta, "No frame within tolerance");
            None
        }
    }
}

fn assemble(assembler: &ArrayAssembler<'_>, group: SnapshotGroup) -> SnapshotOutcome {
    match assembler.assemble(&group) {
        Ok(frame) => SnapshotOutcome::Accepted(group, frame),
        Err(mismatch) => {
            log_mismatch(group.reference_index, &mismatch);
            SnapshotOutcome::ShapeMismatched
        }
    }
}

fn evaluate_locked(
    correlator: &SnapshotCorrelator<'_>,
    assembler: &ArrayAssembler<'_>,
    index: usize,
) -> SnapshotOutcome {
    match correlate(correlator, index) {
        Some(group) => assemble(assembler, group),
        None => SnapshotOutcome::Unmatched,
    }
}

#[cfg(any(not(feature = "parallel"), test))]
fn evaluate_locked_sequential(
    correlator: &SnapshotCorrelator<'_>,
    assembler: &ArrayAssembler<'_>,
    range: std::ops::Range<usize>,
) -> Vec<SnapshotOutcome> {
    range
        .map(|index| evaluate_locked(correlator, assembler, index))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn evaluate_locked_range(
    correlator: &SnapshotCorrelator<'_>,
    assembler: &ArrayAssembler<'_>,
    range: std::ops::Range<usize>,
) -> Vec<SnapshotOutcome> {
    evaluate_locked_sequential(correlator, assembler, range)
}

/// Post-lock indices are independent; `collect` keeps scan order
#[cfg(feature = "parallel")]
fn evaluate_locked_range(
    correlator: &SnapshotCorrelator<'_>,
    assembler: &ArrayAssembler<'_>,
    range: std::ops::Range<usize>,
) -> Vec<SnapshotOutcome> {
    use rayon::prelude::*;

    range
        .into_par_iter()
        .map(|index| evaluate_locked(correlator, assembler, index))
        .collect()
}

fn log_override(index: usize, violation: &OverrideViolation) {
    tracing::debug!(index, "Snapshot cannot lock geometry: {}", violation);
}

fn log_mismatch(index: usize, mismatch: &ShapeMismatch) {
    tracing::debug!(index, "Snapshot discarded: {}", mismatch);
}

//! Stacking of accepted array frames into the `(tx, rx, subcarrier, snapshot)` tensor.

use ndarray::{Array4, Axis};

use arraysense_core::CsiComplex;

use crate::assembler::ArrayFrame;
use crate::correlator::SnapshotGroup;
use crate::locker::SessionGeometry;

/// Final session tensor, `(tx, rx, subcarrier, snapshot)`
pub type OutputTensor = Array4<CsiComplex>;

/// Append-only accumulator of accepted snapshots, kept in discovery order
#[derive(Debug, Default)]
pub struct TensorStacker {
    frames: Vec<ArrayFrame>,
    groups: Vec<SnapshotGroup>,
}

impl TensorStacker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, group: SnapshotGroup, frame: ArrayFrame) {
        self.groups.push(group);
        self.frames.push(frame);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Stack along a new trailing axis
    ///
    /// With nothing accepted the snapshot axis has length 0; the other axes
    /// follow the locked geometry, or are 0 too if geometry never locked.
    pub fn finish(
        self,
        geometry: Option<&SessionGeometry>,
    ) -> (OutputTensor, Vec<SnapshotGroup>) {
        let (n_tx, n_rx, n_sc) = geometry
            .map(SessionGeometry::frame_dim)
            .or_else(|| self.frames.first().map(|f| f.dim()))
            .unwrap_or((0, 0, 0));

        if self.is_empty() {
            tracing::warn!(
                n_tx,
                n_rx,
                subcarriers = n_sc,
                "Output tensor is empty: no snapshot survived correlation and assembly"
            );
        }

        let mut tensor = OutputTensor::zeros((n_tx, n_rx, n_sc, self.len()));
        for (k, frame) in self.frames.iter().enumerate() {
            tensor.index_axis_mut(Axis(3), k).assign(frame);
        }

        (tensor, self.groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arraysense_core::AntennaConfig;

    fn geometry() -> SessionGeometry {
        SessionGeometry {
            antennas: AntennaConfig::new(1, 2),
            subcarrier_count: 3,
            carrier_freq_hz: 2.412e9,
            bandwidth_hz: 20e6,
        }
    }

    fn filled(value: f64) -> ArrayFrame {
        ArrayFrame::from_elem((1, 2, 3), CsiComplex::new(value, 0.0))
    }

    fn group(reference_index: usize) -> SnapshotGroup {
        SnapshotGroup {
            reference_index,
            frame_indices: vec![reference_index],
        }
    }

    #[test]
    fn test_stack_keeps_discovery_order() {
        let mut stacker = TensorStacker::new();
        stacker.push(group(4), filled(4.0));
        stacker.push(group(1), filled(1.0));
        stacker.push(group(9), filled(9.0));
        assert_eq!(stacker.len(), 3);

        let (tensor, groups) = stacker.finish(Some(&geometry()));
        assert_eq!(tensor.dim(), (1, 2, 3, 3));
        assert_eq!(tensor[[0, 1, 2, 0]].re, 4.0);
        assert_eq!(tensor[[0, 0, 0, 1]].re, 1.0);
        assert_eq!(tensor[[0, 1, 0, 2]].re, 9.0);
        let order: Vec<usize> = groups.iter().map(|g| g.reference_index).collect();
        assert_eq!(order, vec![4, 1, 9]);
    }

    #[test]
    fn test_empty_with_locked_geometry() {
        let stacker = TensorStacker::new();
        assert!(stacker.is_empty());
        let (tensor, groups) = stacker.finish(Some(&geometry()));
        assert_eq!(tensor.dim(), (1, 2, 3, 0));
        assert!(groups.is_empty());
    }

    #[test]
    fn test_empty_without_geometry() {
        let (tensor, _) = TensorStacker::new().finish(None);
        assert_eq!(tensor.dim(), (0, 0, 0, 0));
        assert_eq!(tensor.len_of(Axis(3)), 0);
    }
}

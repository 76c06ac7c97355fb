//! Array frame assembly: scatter each node's antennas into the combined array.
//!
//! Sample packing contract with the external parser: a node frame's flat
//! `csi` vector is the row-major layout of a `(n_tx, n_rx, subcarriers)`
//! cube, transmit antenna slowest and subcarrier fastest. For 2 Tx, 2 Rx and
//! S subcarriers that is
//!
//! ```text
//! [tx0 rx0 s0..S] [tx0 rx1 s0..S] [tx1 rx0 s0..S] [tx1 rx1 s0..S]
//! ```
//!
//! Local receive antenna `k` of a node is then copied to global receive
//! position `positions[k]` of the array frame.

use ndarray::{s, Array3, ArrayView3};
use thiserror::Error;

use arraysense_core::CsiComplex;

use crate::correlator::SnapshotGroup;
use crate::frame::{CsiFrameRecord, NodeStream};
use crate::locker::SessionGeometry;

/// Combined-array CSI cube for one snapshot, `(tx, rx, subcarrier)`
pub type ArrayFrame = Array3<CsiComplex>;

/// Why a correlated snapshot could not be assembled
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeMismatch {
    #[error("node {node}: {actual} transmit antennas, session has {expected}")]
    Transmit { node: usize, expected: u16, actual: u16 },

    #[error("node {node}: {actual} receive antennas, node should have {expected}")]
    Receive { node: usize, expected: u16, actual: u16 },

    #[error("node {node}: {actual} subcarriers, session has {expected}")]
    Subcarriers { node: usize, expected: u16, actual: u16 },

    #[error("node {node}: {actual} CSI samples, dimensions imply {expected}")]
    SampleCount {
        node: usize,
        expected: usize,
        actual: usize,
    },
}

/// View a frame's flat samples as its local `(tx, rx, subcarrier)` cube
pub fn local_cube(frame: &CsiFrameRecord) -> Option<ArrayView3<'_, CsiComplex>> {
    let dim = (
        frame.n_tx as usize,
        frame.n_rx as usize,
        frame.subcarrier_count as usize,
    );
    ArrayView3::from_shape(dim, &frame.csi).ok()
}

pub struct ArrayAssembler<'a> {
    streams: &'a [NodeStream],
    geometry: SessionGeometry,
    antennas_per_node: u16,
}

impl<'a> ArrayAssembler<'a> {
    pub fn new(
        streams: &'a [NodeStream],
        geometry: SessionGeometry,
        antennas_per_node: u16,
    ) -> Self {
        Self {
            streams,
            geometry,
            antennas_per_node,
        }
    }

    fn check_shape(&self, node: usize, frame: &CsiFrameRecord) -> Result<(), ShapeMismatch> {
        if frame.n_tx != self.geometry.antennas.n_tx {
            return Err(ShapeMismatch::Transmit {
                node,
                expected: self.geometry.antennas.n_tx,
                actual: frame.n_tx,
            });
        }
        if frame.n_rx != self.antennas_per_node {
            return Err(ShapeMismatch::Receive {
                node,
                expected: self.antennas_per_node,
                actual: frame.n_rx,
            });
        }
        if frame.subcarrier_count != self.geometry.subcarrier_count {
            return Err(ShapeMismatch::Subcarriers {
                node,
                expected: self.geometry.subcarrier_count,
                actual: frame.subcarrier_count,
            });
        }
        if !frame.is_consistent() {
            return Err(ShapeMismatch::SampleCount {
                node,
                expected: frame.expected_len(),
                actual: frame.csi.len(),
            });
        }
        Ok(())
    }

    /// Build the array frame for a correlated snapshot
    ///
    /// Every node is checked before anything is copied; one bad node
    /// discards the whole snapshot.
    pub fn assemble(&self, group: &SnapshotGroup) -> Result<ArrayFrame, ShapeMismatch> {
        let members: Vec<(&NodeStream, &CsiFrameRecord)> = self
            .streams
            .iter()
            .zip(&group.frame_indices)
            .map(|(stream, &idx)| (stream, &stream.frames[idx]))
            .collect();

        for (node, (_, frame)) in members.iter().enumerate() {
            self.check_shape(node, frame)?;
        }

        let mut array_frame = ArrayFrame::zeros(self.geometry.frame_dim());

        for (node, (stream, frame)) in members.into_iter().enumerate() {
            let local = local_cube(frame).ok_or(ShapeMismatch::SampleCount {
                node,
                expected: frame.expected_len(),
                actual: frame.csi.len(),
            })?;

            for (antenna, &position) in stream.positions.iter().enumerate() {
                array_frame
                    .slice_mut(s![.., position, ..])
                    .assign(&local.slice(s![.., antenna, ..]));
            }
        }

        Ok(array_frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arraysense_core::{AntennaConfig, Timestamp};

    /// Sample value encodes its origin: re = node*1000 + tx*100 + rx*10 + sc
    fn tagged_frame(node: usize, n_tx: u16, n_rx: u16, subcarriers: u16) -> CsiFrameRecord {
        let mut csi = Vec::new();
        for tx in 0..n_tx {
            for rx in 0..n_rx {
                for sc in 0..subcarriers {
                    let tag = node * 1000 + tx as usize * 100 + rx as usize * 10 + sc as usize;
                    csi.push(CsiComplex::new(tag as f64, -(tag as f64)));
                }
            }
        }
        CsiFrameRecord::new(Timestamp(0), AntennaConfig::new(n_tx, n_rx), subcarriers, csi)
    }

    fn geometry(n_tx: u16, n_rx: u16, subcarriers: u16) -> SessionGeometry {
        SessionGeometry {
            antennas: AntennaConfig::new(n_tx, n_rx),
            subcarrier_count: subcarriers,
            carrier_freq_hz: 5.18e9,
            bandwidth_hz: 20e6,
        }
    }

    fn group() -> SnapshotGroup {
        SnapshotGroup {
            reference_index: 0,
            frame_indices: vec![0, 0],
        }
    }

    #[test]
    fn test_parser_packing_transmit_slowest() {
        let frame = tagged_frame(0, 2, 2, 3);
        let cube = local_cube(&frame).unwrap();
        assert_eq!(cube.dim(), (2, 2, 3));
        assert_eq!(cube[[1, 0, 2]].re, 102.0);
        assert_eq!(cube[[0, 1, 1]].re, 11.0);
        assert_eq!(frame.csi[3].re, 10.0);
    }

    #[test]
    fn test_position_mapping() {
        let streams = vec![
            NodeStream::new(0, "node-1", vec![2, 3], vec![tagged_frame(1, 2, 2, 4)]),
            NodeStream::new(1, "node-2", vec![1, 0], vec![tagged_frame(2, 2, 2, 4)]),
        ];
        let assembler = ArrayAssembler::new(&streams, geometry(2, 4, 4), 2);
        let frame = assembler.assemble(&group()).unwrap();
        assert_eq!(frame.dim(), (2, 4, 4));

        // (expected node tag, local antenna) for global positions 0..4
        let expected = [(2, 1), (2, 0), (1, 0), (1, 1)];
        for (position, &(node, antenna)) in expected.iter().enumerate() {
            for tx in 0..2 {
                for sc in 0..4 {
                    let tag = node * 1000 + tx * 100 + antenna * 10 + sc;
                    assert_eq!(
                        frame[[tx, position, sc]],
                        CsiComplex::new(tag as f64, -(tag as f64)),
                        "position {} tx {} sc {}",
                        position,
                        tx,
                        sc
                    );
                }
            }
        }
    }

    #[test]
    fn test_any_node_mismatch_discards_group() {
        let streams = vec![
            NodeStream::new(0, "a", vec![0, 1], vec![tagged_frame(1, 2, 2, 4)]),
            NodeStream::new(1, "b", vec![2, 3], vec![tagged_frame(2, 1, 2, 4)]),
        ];
        let assembler = ArrayAssembler::new(&streams, geometry(2, 4, 4), 2);
        assert_eq!(
            assembler.assemble(&group()),
            Err(ShapeMismatch::Transmit {
                node: 1,
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_receive_count_checked_against_node_config() {
        let streams = vec![
            NodeStream::new(0, "a", vec![0, 1], vec![tagged_frame(1, 2, 1, 4)]),
            NodeStream::new(1, "b", vec![2, 3], vec![tagged_frame(2, 2, 2, 4)]),
        ];
        let assembler = ArrayAssembler::new(&streams, geometry(2, 4, 4), 2);
        assert!(matches!(
            assembler.assemble(&group()),
            Err(ShapeMismatch::Receive { node: 0, .. })
        ));
    }

    #[test]
    fn test_subcarrier_and_sample_count_checked() {
        let streams = vec![
            NodeStream::new(0, "a", vec![0, 1], vec![tagged_frame(1, 2, 2, 4)]),
            NodeStream::new(1, "b", vec![2, 3], vec![tagged_frame(2, 2, 2, 5)]),
        ];
        let assembler = ArrayAssembler::new(&streams, geometry(2, 4, 4), 2);
        assert!(matches!(
            assembler.assemble(&group()),
            Err(ShapeMismatch::Subcarriers { node: 1, .. })
        ));

        let mut truncated = tagged_frame(2, 2, 2, 4);
        truncated.csi.pop();
        let streams = vec![
            NodeStream::new(0, "a", vec![0, 1], vec![tagged_frame(1, 2, 2, 4)]),
            NodeStream::new(1, "b", vec![2, 3], vec![truncated]),
        ];
        let assembler = ArrayAssembler::new(&streams, geometry(2, 4, 4), 2);
        assert_eq!(
            assembler.assemble(&group()),
            Err(ShapeMismatch::SampleCount {
                node: 1,
                expected: 16,
                actual: 15
            })
        );
    }
}

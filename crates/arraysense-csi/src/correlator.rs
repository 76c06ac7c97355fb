//! Temporal correlation of frames across receiver nodes.
//!
//! Nodes capture asynchronously, each on its own clock. For every frame of
//! the reference stream (the one with the most frames) the correlator looks
//! for the closest frame in time on every other node. A snapshot only exists
//! if all nodes have such a frame within the tolerance window.

use arraysense_core::Timestamp;
use serde::Serialize;

use crate::frame::NodeStream;

/// One frame index per node, judged to be the same physical instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotGroup {
    /// Index into the reference stream
    pub reference_index: usize,

    /// `frame_indices[n]` is the frame of node `n` in this snapshot
    pub frame_indices: Vec<usize>,
}

/// Result of correlating one reference frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Correlation {
    Matched(SnapshotGroup),

    /// `node` had no frame within tolerance; `best_delta` is its closest
    /// distance, `None` for an empty stream
    Unmatched { node: usize, best_delta: Option<u64> },
}

/// Index of the stream with the most frames; ties go to the lowest node
pub fn select_reference(streams: &[NodeStream]) -> Option<usize> {
    streams
        .iter()
        .enumerate()
        .rev()
        .max_by_key(|(_, s)| s.len())
        .map(|(i, _)| i)
}

/// Closest timestamp to `target` as `(index, |delta|)`
///
/// On equal distances the earliest index in stream order wins.
pub fn closest_frame(timestamps: &[Timestamp], target: Timestamp) -> Option<(usize, u64)> {
    timestamps
        .iter()
        .map(|t| t.abs_diff(target))
        .enumerate()
        .min_by_key(|&(_, delta)| delta)
}

/// Matches reference-stream frames against every other node
pub struct SnapshotCorrelator<'a> {
    streams: &'a [NodeStream],
    reference: usize,
    tolerance: u64,
}

impl<'a> SnapshotCorrelator<'a> {
    /// Returns `None` when there are no streams at all
    pub fn new(streams: &'a [NodeStream], tolerance: u64) -> Option<Self> {
        let reference = select_reference(streams)?;
        Some(Self {
            streams,
            reference,
            tolerance,
        })
    }

    pub fn reference(&self) -> usize {
        self.reference
    }

    pub fn reference_len(&self) -> usize {
        self.streams[self.reference].len()
    }

    pub fn tolerance(&self) -> u64 {
        self.tolerance
    }

    /// Correlate reference frame `index`
    ///
    /// Stops at the first node without a match: each node's search is
    /// independent of the others, so the outcome does not depend on the
    /// order nodes are visited in.
    pub fn correlate(&self, index: usize) -> Correlation {
        let target = self.streams[self.reference].timestamps[index];
        let mut frame_indices = vec![0; self.streams.len()];
        frame_indices[self.reference] = index;

        for (node, stream) in self.streams.iter().enumerate() {
            if node == self.reference {
                continue;
            }

            match closest_frame(&stream.timestamps, target) {
                Some((closest, delta)) if delta <= self.tolerance => {
                    frame_indices[node] = closest;
                }
                other => {
                    return Correlation::Unmatched {
                        node,
                        best_delta: other.map(|(_, delta)| delta),
                    };
                }
            }
        }

        Correlation::Matched(SnapshotGroup {
            reference_index: index,
            frame_indices,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::CsiFrameRecord;
    use arraysense_core::AntennaConfig;

    fn stream(node: usize, times: &[i64]) -> NodeStream {
        let frames = times
            .iter()
            .map(|&t| CsiFrameRecord::new(Timestamp(t), AntennaConfig::new(1, 1), 1, vec![]))
            .collect();
        NodeStream::new(node, format!("node-{}", node), vec![node], frames)
    }

    #[test]
    fn test_reference_is_longest_stream() {
        let streams = vec![stream(0, &[1, 2]), stream(1, &[1, 2, 3]), stream(2, &[1])];
        assert_eq!(select_reference(&streams), Some(1));
    }

    #[test]
    fn test_reference_tie_goes_to_first_node() {
        let streams = vec![stream(0, &[1]), stream(1, &[1, 2]), stream(2, &[5, 6])];
        assert_eq!(select_reference(&streams), Some(1));
        assert_eq!(select_reference(&[]), None);
    }

    #[test]
    fn test_closest_frame_stable_argmin() {
        let times = [Timestamp(90), Timestamp(110), Timestamp(90)];
        assert_eq!(closest_frame(&times, Timestamp(100)), Some((0, 10)));
        assert_eq!(closest_frame(&[], Timestamp(100)), None);
    }

    #[test]
    fn test_tolerance_boundary_inclusive() {
        let streams = vec![stream(0, &[100, 200]), stream(1, &[105, 206])];
        let correlator = SnapshotCorrelator::new(&streams, 5).unwrap();

        assert_eq!(
            correlator.correlate(0),
            Correlation::Matched(SnapshotGroup {
                reference_index: 0,
                frame_indices: vec![0, 0],
            })
        );
        assert_eq!(
            correlator.correlate(1),
            Correlation::Unmatched {
                node: 1,
                best_delta: Some(6)
            }
        );
    }

    #[test]
    fn test_reference_need_not_be_node_zero() {
        let streams = vec![stream(0, &[300]), stream(1, &[100, 298, 500])];
        let correlator = SnapshotCorrelator::new(&streams, 2).unwrap();
        assert_eq!(correlator.reference(), 1);

        assert!(matches!(correlator.correlate(0), Correlation::Unmatched { node: 0, .. }));
        assert_eq!(
            correlator.correlate(1),
            Correlation::Matched(SnapshotGroup {
                reference_index: 1,
                frame_indices: vec![0, 1],
            })
        );
    }

    #[test]
    fn test_any_missing_node_discards_group() {
        let streams = vec![
            stream(0, &[100, 200, 300]),
            stream(1, &[100, 200, 300]),
            stream(2, &[100, 300]),
        ];
        let correlator = SnapshotCorrelator::new(&streams, 10).unwrap();

        assert!(matches!(correlator.correlate(0), Correlation::Matched(_)));
        assert_eq!(
            correlator.correlate(1),
            Correlation::Unmatched {
                node: 2,
                best_delta: Some(100)
            }
        );
    }

    #[test]
    fn test_node_order_does_not_change_accepted_set() {
        let a = stream(0, &[10, 20, 30, 40]);
        let b = stream(1, &[11, 35]);
        let c = stream(2, &[9, 19, 41]);

        let forward = vec![a.clone(), b.clone(), c.clone()];
        let reversed = vec![a, c, b];

        let accepted = |streams: &[NodeStream]| -> Vec<usize> {
            let correlator = SnapshotCorrelator::new(streams, 2).unwrap();
            (0..correlator.reference_len())
                .filter(|&i| matches!(correlator.correlate(i), Correlation::Matched(_)))
                .collect()
        };

        assert_eq!(accepted(&forward), vec![0]);
        assert_eq!(accepted(&forward), accepted(&reversed));
    }

    #[test]
    fn test_empty_other_stream_never_matches() {
        let streams = vec![stream(0, &[1, 2]), stream(1, &[])];
        let correlator = SnapshotCorrelator::new(&streams, 1000).unwrap();
        assert_eq!(
            correlator.correlate(0),
            Correlation::Unmatched {
                node: 1,
                best_delta: None
            }
        );
    }
}

//! Output artifact model handed to the serializer.

use serde::{Deserialize, Serialize};

use arraysense_core::{CsiComplex, ElementPosition, GeometryRegistry, Result, RunId, Timestamp};

use crate::correlator::SnapshotGroup;
use crate::frame::{CsiFrameRecord, NodeStream};
use crate::pipeline::{FusionOutput, FusionReport};
use crate::stacker::OutputTensor;

/// How much of the session goes into the artifact
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Tensor, RF parameters and element positions
    #[default]
    MatrixOnly,
    /// Additionally per-node counts, sources, raw frames and timestamps
    Full,
}

/// Dense tensor as shape plus row-major complex samples
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TensorPayload {
    /// `[tx, rx, subcarrier, snapshot]`
    pub shape: [usize; 4],
    pub data: Vec<CsiComplex>,
}

impl From<&OutputTensor> for TensorPayload {
    fn from(tensor: &OutputTensor) -> Self {
        let (a, b, c, d) = tensor.dim();
        Self {
            shape: [a, b, c, d],
            data: tensor.iter().copied().collect(),
        }
    }
}

/// Per-node capture data kept in [`OutputMode::Full`]
#[derive(Debug, Serialize)]
pub struct CaptureMetadata<'a> {
    pub count: Vec<usize>,
    pub file: Vec<&'a str>,
    pub raw: Vec<&'a [CsiFrameRecord]>,
    pub timestamps: Vec<&'a [Timestamp]>,
    pub snapshots: &'a [SnapshotGroup],
}

impl<'a> CaptureMetadata<'a> {
    fn collect(streams: &'a [NodeStream], snapshots: &'a [SnapshotGroup]) -> Self {
        Self {
            count: streams.iter().map(NodeStream::len).collect(),
            file: streams.iter().map(|s| s.source.as_str()).collect(),
            raw: streams.iter().map(|s| s.frames.as_slice()).collect(),
            timestamps: streams.iter().map(|s| s.timestamps.as_slice()).collect(),
            snapshots,
        }
    }
}

/// Everything persisted for one run
#[derive(Debug, Serialize)]
pub struct FusionArtifact<'a> {
    pub run_id: RunId,
    pub output_matrix: TensorPayload,
    /// Carrier frequency in Hz, absent if geometry never locked
    pub center_freq: Option<f64>,
    /// Channel bandwidth in Hz, absent if geometry never locked
    pub chan_bw: Option<f64>,
    pub elem_pos: &'a [ElementPosition],
    pub report: &'a FusionReport,
    #[serde(flatten)]
    pub capture: Option<CaptureMetadata<'a>>,
}

impl<'a> FusionArtifact<'a> {
    pub fn new(
        output: &'a FusionOutput,
        registry: &'a GeometryRegistry,
        streams: &'a [NodeStream],
        mode: OutputMode,
    ) -> Self {
        let capture = match mode {
            OutputMode::MatrixOnly => None,
            OutputMode::Full => Some(CaptureMetadata::collect(streams, &output.snapshots)),
        };

        Self {
            run_id: output.run_id,
            output_matrix: TensorPayload::from(&output.tensor),
            center_freq: output.geometry.map(|g| g.carrier_freq_hz),
            chan_bw: output.geometry.map(|g| g.bandwidth_hz),
            elem_pos: &registry.element_positions,
            report: &output.report,
            capture,
        }
    }
}

/// Persists an artifact; the on-disk format is up to the implementation
pub trait ArtifactWriter {
    fn write(&self, artifact: &FusionArtifact<'_>) -> Result<()>;
}

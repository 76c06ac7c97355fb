//! CSI frame and per-node stream data structures.

use arraysense_core::{AntennaConfig, CsiComplex, Timestamp};
use serde::{Deserialize, Serialize};

/// One node's CSI capture at one instant, as handed over by the external parser
///
/// `csi` holds `n_tx * n_rx * subcarrier_count` samples packed with the
/// transmit antenna varying slowest and the subcarrier fastest, i.e. the
/// row-major layout of a `(n_tx, n_rx, subcarrier_count)` cube.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsiFrameRecord {
    /// Node-local hardware timestamp
    pub timestamp: Timestamp,

    /// Number of transmit antennas (space-time streams)
    pub n_tx: u16,

    /// Number of local receive antennas
    pub n_rx: u16,

    /// Number of reported subcarriers (tones)
    pub subcarrier_count: u16,

    /// Carrier frequency in Hz
    pub carrier_freq_hz: f64,

    /// Channel bandwidth in MHz, as the parser reports it
    pub bandwidth_mhz: f64,

    /// Flat antenna-ordered complex samples
    pub csi: Vec<CsiComplex>,
}

impl CsiFrameRecord {
    pub fn new(
        timestamp: Timestamp,
        antennas: AntennaConfig,
        subcarrier_count: u16,
        csi: Vec<CsiComplex>,
    ) -> Self {
        Self {
            timestamp,
            n_tx: antennas.n_tx,
            n_rx: antennas.n_rx,
            subcarrier_count,
            carrier_freq_hz: 0.0,
            bandwidth_mhz: 0.0,
            csi,
        }
    }

    /// Attach RF parameters
    pub fn with_rf(mut self, carrier_freq_hz: f64, bandwidth_mhz: f64) -> Self {
        self.carrier_freq_hz = carrier_freq_hz;
        self.bandwidth_mhz = bandwidth_mhz;
        self
    }

    pub fn antenna_config(&self) -> AntennaConfig {
        AntennaConfig::new(self.n_tx, self.n_rx)
    }

    /// Sample count implied by the reported dimensions
    pub fn expected_len(&self) -> usize {
        self.antenna_config().total_streams() * self.subcarrier_count as usize
    }

    pub fn bandwidth_hz(&self) -> f64 {
        self.bandwidth_mhz * 1e6
    }

    /// Reported dimensions agree with the sample vector
    pub fn is_consistent(&self) -> bool {
        self.csi.len() == self.expected_len()
    }
}

/// Ordered CSI frames of one receiver node plus its slot in the array
#[derive(Debug, Clone)]
pub struct NodeStream {
    /// Index of the node in the geometry registry
    pub node: usize,

    /// Where the frames came from
    pub source: String,

    /// `positions[k]` is the global array position of local antenna `k`
    pub positions: Vec<usize>,

    pub frames: Vec<CsiFrameRecord>,

    /// `timestamps[i] == frames[i].timestamp`
    pub timestamps: Vec<Timestamp>,
}

impl NodeStream {
    pub fn new(
        node: usize,
        source: impl Into<String>,
        positions: Vec<usize>,
        frames: Vec<CsiFrameRecord>,
    ) -> Self {
        let timestamps = frames.iter().map(|f| f.timestamp).collect();
        Self {
            node,
            source: source.into(),
            positions,
            frames,
            timestamps,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// First and last timestamp in stream order
    pub fn span(&self) -> Option<(Timestamp, Timestamp)> {
        Some((*self.timestamps.first()?, *self.timestamps.last()?))
    }
}

//! Fundamental types for the ArraySense system.

use chrono::{DateTime, Utc};
use num_complex::Complex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier attached to a single fusion run (logs and artifacts)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Node-local hardware timestamp
///
/// The unit is whatever the capturing node's clock reports (PicoScenes
/// `systemns` is nanoseconds). Timestamps from different nodes are only
/// ever compared through [`Timestamp::abs_diff`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Absolute distance between two timestamps, in clock units
    pub fn abs_diff(&self, other: Timestamp) -> u64 {
        self.0.abs_diff(other.0)
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.0)
    }
}

/// Antenna configuration for MIMO systems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AntennaConfig {
    /// Number of transmit antennas (space-time streams)
    pub n_tx: u16,
    /// Number of receive antennas
    pub n_rx: u16,
}

impl AntennaConfig {
    pub fn new(n_tx: u16, n_rx: u16) -> Self {
        Self { n_tx, n_rx }
    }

    /// Total number of spatial streams (Tx * Rx)
    pub fn total_streams(&self) -> usize {
        self.n_tx as usize * self.n_rx as usize
    }

    /// Intel AX210 typical configuration
    pub fn ax210_default() -> Self {
        Self { n_tx: 2, n_rx: 2 }
    }
}

/// Receive element position in the array frame (meters)
///
/// Carried through to the output untouched; written as `[x, y, z]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct ElementPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl ElementPosition {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl From<[f64; 3]> for ElementPosition {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self::new(x, y, z)
    }
}

impl From<ElementPosition> for [f64; 3] {
    fn from(p: ElementPosition) -> Self {
        [p.x, p.y, p.z]
    }
}

/// Complex number type alias for CSI data
pub type CsiComplex = Complex<f64>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_abs_diff_is_symmetric() {
        let a = Timestamp(100);
        let b = Timestamp(101);
        assert_eq!(a.abs_diff(b), 1);
        assert_eq!(b.abs_diff(a), 1);
        assert_eq!(Timestamp(i64::MIN).abs_diff(Timestamp(i64::MAX)), u64::MAX);
    }

    #[test]
    fn test_element_position_as_triple() {
        let p: ElementPosition = serde_json::from_str("[0.0, -0.0525, 0.0]").unwrap();
        assert_eq!(p, ElementPosition::new(0.0, -0.0525, 0.0));
        assert_eq!(serde_json::to_string(&p).unwrap(), "[0.0,-0.0525,0.0]");
    }
}

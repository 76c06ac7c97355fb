//! Session geometry locking.
//!
//! The first correlated snapshot whose reference frame satisfies the
//! configured overrides fixes the (tx, rx, subcarrier) shape and RF
//! parameters for the rest of the run. There is no way back to unlocked.

use arraysense_core::{AntennaConfig, GeometryRegistry, ShapeOverrides};
use thiserror::Error;

use crate::frame::CsiFrameRecord;

/// Locked shape and RF parameters shared by every accepted snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionGeometry {
    /// `n_rx` spans the whole combined array
    pub antennas: AntennaConfig,
    pub subcarrier_count: u16,
    pub carrier_freq_hz: f64,
    pub bandwidth_hz: f64,
}

impl SessionGeometry {
    /// `(tx, rx, subcarrier)` dimensions of one array frame
    pub fn frame_dim(&self) -> (usize, usize, usize) {
        (
            self.antennas.n_tx as usize,
            self.antennas.n_rx as usize,
            self.subcarrier_count as usize,
        )
    }
}

/// A candidate frame disagreeing with a configured override
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideViolation {
    #[error("transmit antennas: override {expected}, frame has {actual}")]
    Transmit { expected: u16, actual: u16 },

    #[error("subcarriers: override {expected}, frame has {actual}")]
    Subcarriers { expected: u16, actual: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeometryState {
    Unlocked,
    Locked(SessionGeometry),
}

/// What happened when a reference frame was offered to the locker
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LockOutcome {
    /// This frame set the session geometry
    Locked,
    /// Geometry was already set; the frame was not inspected
    AlreadyLocked,
    /// Still unlocked, skip this snapshot
    OverrideRejected(OverrideViolation),
}

pub struct GeometryLocker {
    overrides: ShapeOverrides,
    total_rx: u16,
    state: GeometryState,
}

impl GeometryLocker {
    pub fn new(registry: &GeometryRegistry) -> Self {
        Self {
            overrides: registry.overrides,
            total_rx: registry.total_rx(),
            state: GeometryState::Unlocked,
        }
    }

    pub fn state(&self) -> GeometryState {
        self.state
    }

    pub fn geometry(&self) -> Option<&SessionGeometry> {
        match &self.state {
            GeometryState::Locked(geometry) => Some(geometry),
            GeometryState::Unlocked => None,
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self.state, GeometryState::Locked(_))
    }

    fn check_overrides(&self, frame: &CsiFrameRecord) -> Result<(), OverrideViolation> {
        if let Some(expected) = self.overrides.n_tx {
            if frame.n_tx != expected {
                return Err(OverrideViolation::Transmit {
                    expected,
                    actual: frame.n_tx,
                });
            }
        }

        if let Some(expected) = self.overrides.subcarriers {
            if frame.subcarrier_count != expected {
                return Err(OverrideViolation::Subcarriers {
                    expected,
                    actual: frame.subcarrier_count,
                });
            }
        }

        Ok(())
    }

    /// Offer the reference frame of a correlated snapshot
    ///
    /// Receive width never comes from the frame: it is the configured
    /// antennas-per-node times the node count.
    pub fn offer(&mut self, reference_frame: &CsiFrameRecord) -> LockOutcome {
        if self.is_locked() {
            return LockOutcome::AlreadyLocked;
        }

        if let Err(violation) = self.check_overrides(reference_frame) {
            return LockOutcome::OverrideRejected(violation);
        }

        let geometry = SessionGeometry {
            antennas: AntennaConfig::new(reference_frame.n_tx, self.total_rx),
            subcarrier_count: reference_frame.subcarrier_count,
            carrier_freq_hz: reference_frame.carrier_freq_hz,
            bandwidth_hz: reference_frame.bandwidth_hz(),
        };

        tracing::info!(
            n_tx = geometry.antennas.n_tx,
            n_rx = geometry.antennas.n_rx,
            subcarriers = geometry.subcarrier_count,
            carrier_freq_hz = geometry.carrier_freq_hz,
            bandwidth_hz = geometry.bandwidth_hz,
            "Session geometry locked"
        );

        self.state = GeometryState::Locked(geometry);
        LockOutcome::Locked
    }
}

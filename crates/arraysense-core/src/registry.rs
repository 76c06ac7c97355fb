//! Static array geometry: which node antenna lands where in the combined array.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{AntennaConfig, ElementPosition};

/// Layout of one receiver node inside the combined array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeLayout {
    /// Human-readable node label (usually the capture name)
    pub label: String,

    /// `positions[k]` is the global array position of local antenna `k`
    pub positions: Vec<usize>,
}

impl NodeLayout {
    pub fn new(label: impl Into<String>, positions: Vec<usize>) -> Self {
        Self {
            label: label.into(),
            positions,
        }
    }
}

/// Hard constraints a frame must satisfy before it may lock session geometry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeOverrides {
    /// Required transmit-antenna count
    pub n_tx: Option<u16>,
    /// Required subcarrier count
    pub subcarriers: Option<u16>,
}

impl ShapeOverrides {
    /// Build from raw config values where `0` means "no override"
    pub fn from_raw(n_tx: u16, subcarriers: u16) -> Self {
        Self {
            n_tx: (n_tx > 0).then_some(n_tx),
            subcarriers: (subcarriers > 0).then_some(subcarriers),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.n_tx.is_none() && self.subcarriers.is_none()
    }
}

/// Geometry registry for the distributed receive array
///
/// Every node contributes exactly `antennas_per_node` antennas, so the
/// combined receive width is always `antennas_per_node * node_count`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryRegistry {
    pub antennas_per_node: u16,
    pub nodes: Vec<NodeLayout>,
    pub element_positions: Vec<ElementPosition>,
    pub overrides: ShapeOverrides,
}

impl GeometryRegistry {
    pub fn new(antennas_per_node: u16, nodes: Vec<NodeLayout>) -> Self {
        Self {
            antennas_per_node,
            nodes,
            element_positions: Vec::new(),
            overrides: ShapeOverrides::default(),
        }
    }

    pub fn with_element_positions(mut self, positions: Vec<ElementPosition>) -> Self {
        self.element_positions = positions;
        self
    }

    pub fn with_overrides(mut self, overrides: ShapeOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Two Intel AX210 NICs side by side, wired (AUX-2)-(MAIN-2)-(MAIN-1)-(AUX-1)
    pub fn ax210_pair() -> Self {
        let per_node = AntennaConfig::ax210_default().n_rx;
        let spacing = 3.5e-2;
        let element_positions = [-1.5, -0.5, 0.5, 1.5]
            .iter()
            .map(|k| ElementPosition::new(0.0, k * spacing, 0.0))
            .collect();

        Self::new(
            per_node,
            vec![
                NodeLayout::new("nic-1", vec![2, 3]),
                NodeLayout::new("nic-2", vec![1, 0]),
            ],
        )
        .with_element_positions(element_positions)
        .with_overrides(ShapeOverrides::from_raw(2, 57))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Receive width of the combined array
    pub fn total_rx(&self) -> u16 {
        self.antennas_per_node * self.nodes.len() as u16
    }

    /// Check the layout is a permutation of `0..total_rx`
    ///
    /// The assembler trusts the position maps blindly, so this is the only
    /// place collisions or gaps are caught.
    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(Error::Config("no receiver nodes configured".into()));
        }
        if self.antennas_per_node == 0 {
            return Err(Error::Config("antennas_per_node must be positive".into()));
        }

        let width = self.antennas_per_node as usize * self.nodes.len();
        if width > u16::MAX as usize {
            return Err(Error::Config(format!(
                "combined array width {} exceeds {}",
                width,
                u16::MAX
            )));
        }

        let mut owner: Vec<Option<usize>> = vec![None; width];
        for (node_idx, node) in self.nodes.iter().enumerate() {
            if node.positions.len() != self.antennas_per_node as usize {
                return Err(Error::Config(format!(
                    "node {} ({}) maps {} antennas, expected {}",
                    node_idx,
                    node.label,
                    node.positions.len(),
                    self.antennas_per_node
                )));
            }

            for &pos in &node.positions {
                let slot = owner.get_mut(pos).ok_or_else(|| {
                    Error::Config(format!(
                        "node {} ({}) maps to position {} outside array of width {}",
                        node_idx, node.label, pos, width
                    ))
                })?;

                if let Some(other) = slot.replace(node_idx) {
                    return Err(Error::Config(format!(
                        "array position {} claimed by nodes {} and {}",
                        pos, other, node_idx
                    )));
                }
            }
        }

        if !self.element_positions.is_empty() && self.element_positions.len() != width {
            return Err(Error::Config(format!(
                "{} element positions given for an array of width {}",
                self.element_positions.len(),
                width
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ax210_pair_is_valid() {
        let registry = GeometryRegistry::ax210_pair();
        registry.validate().unwrap();
        assert_eq!(registry.total_rx(), 4);
        assert_eq!(registry.element_positions.len(), 4);
        assert_eq!(registry.overrides.n_tx, Some(2));
        assert_eq!(registry.overrides.subcarriers, Some(57));
    }

    #[test]
    fn test_zero_override_means_none() {
        let overrides = ShapeOverrides::from_raw(0, 0);
        assert!(overrides.is_empty());
        assert_eq!(ShapeOverrides::from_raw(0, 242).subcarriers, Some(242));
    }

    #[test]
    fn test_position_collision_rejected() {
        let registry = GeometryRegistry::new(
            2,
            vec![
                NodeLayout::new("a", vec![0, 1]),
                NodeLayout::new("b", vec![1, 2]),
            ],
        );
        let err = registry.validate().unwrap_err();
        assert!(err.to_string().contains("claimed by nodes 0 and 1"));
    }

    #[test]
    fn test_position_out_of_range_rejected() {
        let registry = GeometryRegistry::new(
            2,
            vec![
                NodeLayout::new("a", vec![0, 1]),
                NodeLayout::new("b", vec![2, 4]),
            ],
        );
        assert!(matches!(registry.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_short_position_map_rejected() {
        let registry = GeometryRegistry::new(2, vec![NodeLayout::new("a", vec![0])]);
        assert!(registry.validate().is_err());
    }

    #[test]
    fn test_element_position_count_checked() {
        let registry = GeometryRegistry::new(1, vec![NodeLayout::new("a", vec![0])])
            .with_element_positions(vec![ElementPosition::new(0.0, 0.0, 0.0); 2]);
        assert!(registry.validate().is_err());
    }
}

//! Run configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use arraysense_core::{ElementPosition, GeometryRegistry, NodeLayout, ShapeOverrides};
use arraysense_csi::{CaptureSource, JsonLinesCapture, OutputMode};

use crate::logging::LogConfig;

/// Complete run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Receive array layout
    pub array: ArrayConfig,

    /// Correlation and locking parameters
    pub processing: ProcessingConfig,

    /// Artifact destination
    pub output: OutputConfig,

    #[serde(default)]
    pub logging: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrayConfig {
    /// Receive antennas contributed by every node
    pub antennas_per_node: u16,

    /// `[x, y, z]` in meters for each combined-array position
    #[serde(default)]
    pub element_positions: Vec<ElementPosition>,

    /// One entry per receiver node, in registry order
    pub nodes: Vec<NodeConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Capture export (JSON lines) for this node
    pub source: PathBuf,

    /// `positions[k]` is the array position of local antenna `k`
    pub positions: Vec<usize>,

    /// Defaults to the capture file stem
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl NodeConfig {
    fn label(&self) -> String {
        self.label.clone().unwrap_or_else(|| {
            self.source
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.source.display().to_string())
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Maximum |Δt| between frames of one snapshot, node clock units
    ///
    /// Stationary targets tolerate a large value; moving targets need a
    /// tight one.
    pub timestamp_tolerance: u64,

    /// Only frames with this many TX antennas may lock geometry (0 = any)
    #[serde(default)]
    pub override_tx: u16,

    /// Only frames with this many subcarriers may lock geometry (0 = any)
    #[serde(default)]
    pub override_subcarriers: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Artifact path
    pub path: PathBuf,

    #[serde(default)]
    pub mode: OutputMode,
}

impl Default for FusionConfig {
    fn default() -> Self {
        let spacing = 3.5e-2;
        Self {
            array: ArrayConfig {
                antennas_per_node: 2, // AX210 has 2 per NIC
                element_positions: [-1.5, -0.5, 0.5, 1.5]
                    .iter()
                    .map(|k| ElementPosition::new(0.0, k * spacing, 0.0))
                    .collect(),
                // (AUX-2)-(MAIN-2)-(MAIN-1)-(AUX-1)
                nodes: vec![
                    NodeConfig {
                        source: PathBuf::from("data/subsystemdemo/rx_11_241125_120734.jsonl"),
                        positions: vec![2, 3],
                        label: None,
                    },
                    NodeConfig {
                        source: PathBuf::from("data/subsystemdemo/rx_13_241125_120733.jsonl"),
                        positions: vec![1, 0],
                        label: None,
                    },
                ],
            },
            processing: ProcessingConfig {
                timestamp_tolerance: 100_000,
                override_tx: 2,
                override_subcarriers: 57,
            },
            output: OutputConfig {
                path: PathBuf::from("array-matrix.json"),
                mode: OutputMode::MatrixOnly,
            },
            logging: LogConfig::default(),
        }
    }
}

impl FusionConfig {
    /// Load configuration from file, with `ARRAYSENSE__SECTION__KEY` overrides
    pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(
                config::Environment::with_prefix("ARRAYSENSE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Pretty JSON that [`FusionConfig::from_file`] reads back from a `.json` path
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn registry(&self) -> GeometryRegistry {
        let nodes = self
            .array
            .nodes
            .iter()
            .map(|node| NodeLayout::new(node.label(), node.positions.clone()))
            .collect();

        GeometryRegistry::new(self.array.antennas_per_node, nodes)
            .with_element_positions(self.array.element_positions.clone())
            .with_overrides(ShapeOverrides::from_raw(
                self.processing.override_tx,
                self.processing.override_subcarriers,
            ))
    }

    /// One capture source per node, in registry order
    pub fn sources(&self) -> Vec<Box<dyn CaptureSource>> {
        self.array
            .nodes
            .iter()
            .map(|node| Box::new(JsonLinesCapture::new(&node.source)) as Box<dyn CaptureSource>)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_matches_ax210_pair() {
        let config = FusionConfig::default();
        assert_eq!(config.registry(), {
            let mut expected = GeometryRegistry::ax210_pair();
            expected.nodes[0].label = "rx_11_241125_120734".into();
            expected.nodes[1].label = "rx_13_241125_120733".into();
            expected
        });
        assert_eq!(config.sources().len(), 2);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[array]
antennas_per_node = 1
element_positions = [[0.0, 0.0, 0.0], [0.0, 0.05, 0.0]]

[[array.nodes]]
source = "captures/left.jsonl"
positions = [1]

[[array.nodes]]
source = "captures/right.jsonl"
positions = [0]
label = "right-nic"

[processing]
timestamp_tolerance = 5000

[output]
path = "out.json"
mode = "full"
"#
        )
        .unwrap();

        let config = FusionConfig::from_file(file.path().to_str().unwrap()).unwrap();
        let registry = config.registry();
        registry.validate().unwrap();

        assert_eq!(config.processing.timestamp_tolerance, 5000);
        assert!(registry.overrides.is_empty());
        assert_eq!(registry.nodes[0].label, "left");
        assert_eq!(registry.nodes[1].label, "right-nic");
        assert_eq!(registry.element_positions[1], ElementPosition::new(0.0, 0.05, 0.0));
        assert_eq!(config.output.mode, OutputMode::Full);
    }

    #[test]
    fn test_default_json_loads_back() {
        let default = FusionConfig::default();
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "{}", default.to_json().unwrap()).unwrap();

        let config = FusionConfig::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.registry(), default.registry());
        assert_eq!(config.processing.timestamp_tolerance, 100_000);
        assert_eq!(config.array.nodes[1].source, default.array.nodes[1].source);
        assert_eq!(config.output.mode, OutputMode::MatrixOnly);
    }
}

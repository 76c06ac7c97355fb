//! Stream loading from captured CSI artifacts.
//!
//! Parsing vendor capture files is the job of an external parser. This
//! module consumes what that parser hands over:
//!
//! - JSON-lines exports (one [`CsiFrameRecord`] per line), e.g. dumped from
//!   the PicoScenes toolbox for an Intel AX210 capture
//! - In-memory frame vectors for tests and embedding

use std::path::PathBuf;

use async_trait::async_trait;
use futures::future::try_join_all;

use arraysense_core::{Error, GeometryRegistry, Result};

use crate::frame::{CsiFrameRecord, NodeStream};

/// Trait for capture artifact backends
#[async_trait]
pub trait CaptureSource: Send + Sync {
    /// Short description of where frames come from (file path, label)
    fn describe(&self) -> String;

    /// Read every frame of the capture, in capture order
    async fn read_frames(&self) -> Result<Vec<CsiFrameRecord>>;
}

/// JSON-lines capture export
pub struct JsonLinesCapture {
    path: PathBuf,
}

impl JsonLinesCapture {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Parse an export body; blank lines are skipped
    fn parse_records(source_name: &str, body: &str) -> Result<Vec<CsiFrameRecord>> {
        body.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                serde_json::from_str(line).map_err(|e| Error::MalformedRecord {
                    source_name: source_name.to_string(),
                    line: idx + 1,
                    reason: e.to_string(),
                })
            })
            .collect()
    }
}

#[async_trait]
impl CaptureSource for JsonLinesCapture {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn read_frames(&self) -> Result<Vec<CsiFrameRecord>> {
        let body = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            Error::Capture(format!("cannot read {}: {}", self.path.display(), e))
        })?;

        Self::parse_records(&self.describe(), &body)
    }
}

/// Frames already held in memory
pub struct InMemoryCapture {
    label: String,
    frames: Vec<CsiFrameRecord>,
}

impl InMemoryCapture {
    pub fn new(label: impl Into<String>, frames: Vec<CsiFrameRecord>) -> Self {
        Self {
            label: label.into(),
            frames,
        }
    }
}

#[async_trait]
impl CaptureSource for InMemoryCapture {
    fn describe(&self) -> String {
        self.label.clone()
    }

    async fn read_frames(&self) -> Result<Vec<CsiFrameRecord>> {
        Ok(self.frames.clone())
    }
}

/// Loads one [`NodeStream`] per registry node
pub struct StreamLoader<'a> {
    registry: &'a GeometryRegistry,
}

impl<'a> StreamLoader<'a> {
    pub fn new(registry: &'a GeometryRegistry) -> Self {
        Self { registry }
    }

    /// Load all captures concurrently; `sources[k]` feeds registry node `k`
    pub async fn load(&self, sources: &[Box<dyn CaptureSource>]) -> Result<Vec<NodeStream>> {
        if sources.len() != self.registry.node_count() {
            return Err(Error::NodeCount {
                expected: self.registry.node_count(),
                actual: sources.len(),
            });
        }

        let loads = sources.iter().map(|source| source.read_frames());
        let captures = try_join_all(loads).await?;

        let streams: Vec<NodeStream> = captures
            .into_iter()
            .zip(sources)
            .zip(&self.registry.nodes)
            .enumerate()
            .map(|(node, ((frames, source), layout))| {
                NodeStream::new(node, source.describe(), layout.positions.clone(), frames)
            })
            .collect();

        for stream in &streams {
            let foreign_rx = stream
                .frames
                .iter()
                .filter(|f| f.n_rx != self.registry.antennas_per_node)
                .count();

            match stream.span() {
                Some((first, last)) => tracing::info!(
                    node = stream.node,
                    frames = stream.len(),
                    first = %first.to_datetime(),
                    last = %last.to_datetime(),
                    "Loaded {}",
                    stream.source
                ),
                None => {
                    tracing::warn!(node = stream.node, "Capture {} has no frames", stream.source)
                }
            }

            if foreign_rx > 0 {
                tracing::debug!(
                    node = stream.node,
                    frames = foreign_rx,
                    expected_rx = self.registry.antennas_per_node,
                    "Frames with unexpected receive-antenna count will never be assembled"
                );
            }
        }

        Ok(streams)
    }
}

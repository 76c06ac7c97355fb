//! JSON artifact persistence.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use arraysense_core::Result;
use arraysense_csi::{ArtifactWriter, FusionArtifact};

pub struct JsonArtifactWriter {
    path: PathBuf,
}

impl JsonArtifactWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ArtifactWriter for JsonArtifactWriter {
    fn write(&self, artifact: &FusionArtifact<'_>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer(&mut writer, artifact)?;
        writer.flush()?;
        Ok(())
    }
}

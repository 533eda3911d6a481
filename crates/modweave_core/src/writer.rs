//! Writing generated artifacts to disk.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::StackConfig;
use crate::error::CoreResult;
use crate::generator::GeneratedArtifacts;
use crate::tfvars::TfvarsBuilder;

/// Directory under the terraform directory that receives generated files.
pub const GENERATED_DIR: &str = "generated";

/// Name of the variable values file, kept next to the generated directory.
pub const TFVARS_FILE: &str = "terraform.tfvars";

/// Writes generated Terraform files into `<terraform_dir>/generated`.
///
/// All files of one generation are staged as temporary files first and only
/// moved into place once every one of them has been written.
pub struct ArtifactWriter {
    terraform_dir: PathBuf,
    preserve_tfvars: bool,
}

impl ArtifactWriter {
    pub fn new(terraform_dir: impl Into<PathBuf>) -> Self {
        Self {
            terraform_dir: terraform_dir.into(),
            preserve_tfvars: true,
        }
    }

    /// Whether to keep entries of an existing `terraform.tfvars`.
    ///
    /// When disabled, an existing file is left untouched.
    pub fn preserve_tfvars(mut self, preserve: bool) -> Self {
        self.preserve_tfvars = preserve;
        self
    }

    pub fn generated_dir(&self) -> PathBuf {
        self.terraform_dir.join(GENERATED_DIR)
    }

    pub fn tfvars_path(&self) -> PathBuf {
        self.terraform_dir.join(TFVARS_FILE)
    }

    /// Write the artifacts and return the paths written.
    pub fn write(&self, artifacts: &GeneratedArtifacts) -> CoreResult<Vec<PathBuf>> {
        let dir = self.generated_dir();
        fs::create_dir_all(&dir)?;

        let files = artifacts.files();
        let mut staged = Vec::with_capacity(files.len());
        for (name, content) in files {
            staged.push((stage(&dir, content)?, dir.join(name)));
        }

        let mut written = Vec::with_capacity(staged.len());
        for (temp, path) in staged {
            temp.persist(&path).map_err(std::io::Error::from)?;
            info!("Generated {}", path.display());
            written.push(path);
        }

        Ok(written)
    }

    /// Write `terraform.tfvars` for the stack. Returns the path when a file
    /// was written.
    pub fn write_tfvars(&self, config: &StackConfig) -> CoreResult<Option<PathBuf>> {
        let path = self.tfvars_path();
        let exists = path.exists();

        if !self.preserve_tfvars && exists {
            info!("Skipping tfvars generation to preserve existing {}", path.display());
            return Ok(None);
        }

        let existing = if self.preserve_tfvars && exists {
            debug!("Merging existing {}", path.display());
            Some(fs::read_to_string(&path)?)
        } else {
            None
        };

        let Some(content) = TfvarsBuilder::new(config).render(existing.as_deref()) else {
            return Ok(None);
        };

        fs::create_dir_all(&self.terraform_dir)?;
        stage(&self.terraform_dir, &content)?
            .persist(&path)
            .map_err(std::io::Error::from)?;
        info!("Generated {}", path.display());
        Ok(Some(path))
    }
}

fn stage(dir: &Path, content: &str) -> CoreResult<NamedTempFile> {
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(content.as_bytes())?;
    temp.flush()?;
    Ok(temp)
}

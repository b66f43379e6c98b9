// SPDX-License-Identifier: GPL-3.0-only

//! The active media slot
//!
//! Holds at most one artifact and the one preview handle derived from it.
//! Replacing or clearing the artifact revokes the old handle before anything
//! else happens.

use crate::errors::SubmitError;
use crate::media::{MediaArtifact, PreviewHandle, PreviewRegistry};
use crate::submission::{DetectionEndpoint, SubmissionPipeline};
use tracing::{debug, info};

/// Staged media plus the pipeline that submits it
pub struct CaptureStaging {
    artifact: Option<MediaArtifact>,
    preview: Option<PreviewHandle>,
    previews: PreviewRegistry,
    pipeline: SubmissionPipeline,
}

impl CaptureStaging {
    pub fn new(pipeline: SubmissionPipeline) -> Self {
        Self {
            artifact: None,
            preview: None,
            previews: PreviewRegistry::new(),
            pipeline,
        }
    }

    /// Make `artifact` the active media
    ///
    /// A finished submission result is cleared so it is never shown next to
    /// different media. A submission still in flight keeps running.
    pub fn set_from_source(&mut self, artifact: MediaArtifact) -> &PreviewHandle {
        self.revoke_preview();

        info!(
            filename = artifact.filename(),
            kind = %artifact.kind(),
            size = artifact.len(),
            "Staged media"
        );
        let handle = self.previews.issue(&artifact);
        self.artifact = Some(artifact);
        self.pipeline.reset();
        self.preview.insert(handle)
    }

    /// Drop the active media and return the result view to empty
    pub fn clear(&mut self) {
        self.revoke_preview();
        if self.artifact.take().is_some() {
            debug!("Cleared staged media");
        }
        self.pipeline.reset();
    }

    /// Submit whatever is staged, or fail with `NoMediaSelected`
    pub fn submit(&self, endpoint: &DetectionEndpoint) -> Result<(), SubmitError> {
        self.pipeline.submit(self.artifact.clone(), endpoint)
    }

    pub fn artifact(&self) -> Option<&MediaArtifact> {
        self.artifact.as_ref()
    }

    pub fn preview(&self) -> Option<&PreviewHandle> {
        self.preview.as_ref()
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    pub fn pipeline(&self) -> &SubmissionPipeline {
        &self.pipeline
    }

    fn revoke_preview(&mut self) {
        if let Some(handle) = self.preview.take() {
            self.previews.revoke(&handle);
        }
    }
}

impl Drop for CaptureStaging {
    fn drop(&mut self) {
        self.revoke_preview();
    }
}

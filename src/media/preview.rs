// SPDX-License-Identifier: GPL-3.0-only

//! Revocable preview handles
//!
//! A [`PreviewHandle`] lets a view render the staged artifact without owning
//! it. Revocation empties the shared slot, so every clone of the handle stops
//! resolving at the same moment.

use super::MediaArtifact;
use std::sync::{Arc, RwLock};
use tracing::debug;
use uuid::Uuid;

/// Issues and revokes preview handles, one generation per artifact
#[derive(Debug, Default)]
pub struct PreviewRegistry {
    generation: u64,
    live: usize,
    revoked: usize,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a handle for `artifact`
    pub fn issue(&mut self, artifact: &MediaArtifact) -> PreviewHandle {
        self.generation += 1;
        self.live += 1;

        let handle = PreviewHandle {
            id: Uuid::new_v4(),
            generation: self.generation,
            slot: Arc::new(RwLock::new(Some(artifact.clone()))),
        };
        debug!(url = %handle.url(), generation = self.generation, "Issued preview handle");
        handle
    }

    /// Revoke `handle`; revoking twice is a no-op
    pub fn revoke(&mut self, handle: &PreviewHandle) {
        let mut slot = handle
            .slot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.take().is_some() {
            self.live = self.live.saturating_sub(1);
            self.revoked += 1;
            debug!(url = %handle.url(), "Revoked preview handle");
        }
    }

    /// Handles issued and not yet revoked
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Total revocations so far
    pub fn revoked_count(&self) -> usize {
        self.revoked
    }

    /// Generation of the most recently issued handle
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Reference to a staged artifact for rendering
#[derive(Debug, Clone)]
pub struct PreviewHandle {
    id: Uuid,
    generation: u64,
    slot: Arc<RwLock<Option<MediaArtifact>>>,
}

impl PreviewHandle {
    /// Opaque URL identifying this handle
    pub fn url(&self) -> String {
        format!("preview://{}", self.id)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_revoked(&self) -> bool {
        self.slot
            .read()
            .map(|slot| slot.is_none())
            .unwrap_or(true)
    }

    /// The artifact, unless the handle has been revoked
    pub fn resolve(&self) -> Option<MediaArtifact> {
        self.slot.read().ok().and_then(|slot| slot.clone())
    }
}

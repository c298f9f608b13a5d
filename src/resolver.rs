//! Availability Resolver - decides which backend holds a ready-to-read artifact.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::category::Category;
use crate::config::StoreConfig;
use crate::error::Result;
use crate::observability::{EventLevel, Observer};
use crate::storage::{ArtifactFormat, Backend, Backends, Location, Presence};

/// How the caller wants a dataset located.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalRequest {
    /// Check the object store instead of the local data directory.
    pub remote_preferred: bool,
    /// With `remote_preferred`, fall through to the local directory when the
    /// object store does not have the artifact.
    pub local_fallback: bool,
}

impl RetrievalRequest {
    pub fn local() -> Self {
        Self::default()
    }

    pub fn remote() -> Self {
        Self {
            remote_preferred: true,
            local_fallback: false,
        }
    }

    pub fn with_local_fallback(mut self) -> Self {
        self.local_fallback = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRecord {
    pub location: Location,
    pub presence: Presence,
}

/// Outcome of resolving one artifact: the winning location, if any, and every probe made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub winner: Option<Location>,
    pub probes: Vec<ProbeRecord>,
}

impl Resolution {
    pub fn winning_backend(&self) -> Option<Backend> {
        self.winner.as_ref().map(|l| l.backend)
    }

    /// Backends whose probe failed, with the failure detail.
    pub fn unreachable(&self) -> Vec<(Backend, String)> {
        self.probes
            .iter()
            .filter_map(|p| match &p.presence {
                Presence::Unreachable(detail) => Some((p.location.backend, detail.clone())),
                _ => None,
            })
            .collect()
    }
}

pub struct AvailabilityResolver {
    backends: Backends,
    config: StoreConfig,
    observer: Arc<dyn Observer>,
}

impl AvailabilityResolver {
    pub fn new(backends: Backends, config: StoreConfig, observer: Arc<dyn Observer>) -> Self {
        Self {
            backends,
            config,
            observer,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Existence check for one artifact, without reading its contents.
    pub fn probe(&self, location: &Location, format: ArtifactFormat) -> Presence {
        let artifact = location.artifact(format);
        let presence = match location.backend {
            Backend::Local => self.backends.local.exists(&artifact),
            Backend::Object => self.backends.object.head(location.container(), &artifact),
            Backend::KeyValue => {
                self.observer.record_event(
                    EventLevel::Debug,
                    &format!("{} has no read path, treating {} as absent", location, artifact),
                );
                return Presence::Absent;
            }
        };

        match &presence {
            Presence::Exists => self.observer.record_event(
                EventLevel::Info,
                &format!("Object {} exists in {}", artifact, location),
            ),
            Presence::Absent => self.observer.record_event(
                EventLevel::Info,
                &format!("Object {} not found in {}", artifact, location),
            ),
            Presence::Unreachable(detail) => self.observer.record_event(
                EventLevel::Warning,
                &format!("Could not check {} in {}: {}", artifact, location, detail),
            ),
        }
        presence
    }

    /// Routes a read: object store first when remote retrieval is requested,
    /// otherwise the local directory.
    pub fn resolve(&self, category: Category, format: ArtifactFormat, request: RetrievalRequest) -> Resolution {
        let mut order = Vec::with_capacity(2);
        if request.remote_preferred {
            order.push(Backend::Object);
            if request.local_fallback {
                order.push(Backend::Local);
            }
        } else {
            order.push(Backend::Local);
        }

        let mut probes = Vec::with_capacity(order.len());
        for backend in order {
            let location = self.config.location(backend, category);
            let presence = self.probe(&location, format);
            let found = presence.exists();
            probes.push(ProbeRecord {
                location: location.clone(),
                presence,
            });
            if found {
                return Resolution {
                    winner: Some(location),
                    probes,
                };
            }
        }

        Resolution {
            winner: None,
            probes,
        }
    }

    /// [`resolve`](Self::resolve) for a category given by name; unknown names
    /// fail before any backend is touched.
    pub fn resolve_named(&self, category: &str, format: ArtifactFormat, request: RetrievalRequest) -> Result<Resolution> {
        let category = category.parse::<Category>()?;
        Ok(self.resolve(category, format, request))
    }
}

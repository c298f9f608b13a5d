//! Retrieval Engine - resolve, read from the winning backend, decode.
//!
//! The engine never generates data. Absence is reported back so the caller
//! can apply its own generation policy and retry (see `workflow`).

use std::sync::Arc;

use crate::category::Category;
use crate::codec::{decode_table, JsonProjection};
use crate::config::StoreConfig;
use crate::error::{DataError, Result};
use crate::observability::{EventLevel, Observer};
use crate::resolver::{AvailabilityResolver, RetrievalRequest};
use crate::storage::{ArtifactFormat, Backend, Backends, Location};
use crate::table::RowTable;

/// Outcome of a retrieval.
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval<T> {
    Found { backend: Backend, data: T },
    /// No checked backend holds the artifact. Backends that could not be
    /// probed are listed separately from genuine absence.
    NotFound { unreachable: Vec<(Backend, String)> },
    /// The artifact exists but could not be decoded.
    DecodeError { backend: Backend, detail: String },
}

impl<T: Default> Retrieval<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Retrieval::Found { .. })
    }

    pub fn backend(&self) -> Option<Backend> {
        match self {
            Retrieval::Found { backend, .. } | Retrieval::DecodeError { backend, .. } => Some(*backend),
            Retrieval::NotFound { .. } => None,
        }
    }

    /// The legacy `(success, data)` pair; data is empty unless found.
    pub fn into_parts(self) -> (bool, T) {
        match self {
            Retrieval::Found { data, .. } => (true, data),
            _ => (false, T::default()),
        }
    }

    /// Found data, or the matching error for the other outcomes.
    pub fn into_result(self, artifact: &str) -> Result<T> {
        match self {
            Retrieval::Found { data, .. } => Ok(data),
            Retrieval::NotFound { .. } => Err(DataError::NotFound {
                artifact: artifact.to_string(),
            }),
            Retrieval::DecodeError { backend, detail } => {
                Err(DataError::Decode(format!("{} from {}: {}", artifact, backend, detail)))
            }
        }
    }
}

pub struct RetrievalEngine {
    resolver: AvailabilityResolver,
    backends: Backends,
    observer: Arc<dyn Observer>,
}

impl RetrievalEngine {
    pub fn new(backends: Backends, config: StoreConfig, observer: Arc<dyn Observer>) -> Self {
        Self {
            resolver: AvailabilityResolver::new(backends.clone(), config, observer.clone()),
            backends,
            observer,
        }
    }

    pub fn resolver(&self) -> &AvailabilityResolver {
        &self.resolver
    }

    /// Tabular dataset for `category`.
    ///
    /// `Err` is reserved for failures reading an artifact that the probe
    /// reported present (network, permissions).
    pub fn retrieve(&self, category: Category, request: RetrievalRequest) -> Result<Retrieval<RowTable>> {
        self.retrieve_with(category, request, ArtifactFormat::Csv, decode_table)
    }

    /// [`retrieve`](Self::retrieve) for a category given by name.
    pub fn retrieve_named(&self, category: &str, request: RetrievalRequest) -> Result<Retrieval<RowTable>> {
        let category = category.parse::<Category>()?;
        self.retrieve(category, request)
    }

    /// Stored JSON projection (`{category}.json`) for `category`.
    pub fn retrieve_json(&self, category: Category, request: RetrievalRequest) -> Result<Retrieval<JsonProjection>> {
        self.retrieve_with(category, request, ArtifactFormat::Json, JsonProjection::from_json_str)
    }

    fn retrieve_with<T, F>(
        &self,
        category: Category,
        request: RetrievalRequest,
        format: ArtifactFormat,
        decode: F,
    ) -> Result<Retrieval<T>>
    where
        F: Fn(&str) -> Result<T>,
    {
        let resolution = self.resolver.resolve(category, format, request);
        let artifact = format!("{}.{}", category, format.extension());

        let Some(location) = resolution.winner.clone() else {
            let unreachable = resolution.unreachable();
            if unreachable.is_empty() {
                self.observer.record_event(
                    EventLevel::Error,
                    &format!("{} has failed to retrieve: not found", artifact),
                );
            } else {
                for (backend, detail) in &unreachable {
                    self.observer.record_event(
                        EventLevel::Error,
                        &format!("{} has failed to retrieve: {} unavailable ({})", artifact, backend, detail),
                    );
                }
            }
            return Ok(Retrieval::NotFound { unreachable });
        };

        let raw = match self.read(&location, format) {
            Ok(raw) => raw,
            Err(DataError::MalformedInput(detail)) => {
                return Ok(self.decode_failed(&artifact, &location, detail));
            }
            Err(DataError::NotFound { .. }) => {
                self.observer.record_event(
                    EventLevel::Warning,
                    &format!("{} disappeared from {} before it could be read", artifact, location),
                );
                return Ok(Retrieval::NotFound {
                    unreachable: Vec::new(),
                });
            }
            Err(e) => {
                self.observer.record_event(
                    EventLevel::Error,
                    &format!("Error retrieving {} from {}: {}", artifact, location, e),
                );
                return Err(e);
            }
        };

        match decode(&raw) {
            Ok(data) => {
                self.observer.record_event(
                    EventLevel::Info,
                    &format!("{} has successfully retrieved from {}", artifact, location),
                );
                Ok(Retrieval::Found {
                    backend: location.backend,
                    data,
                })
            }
            Err(DataError::MalformedInput(detail)) => Ok(self.decode_failed(&artifact, &location, detail)),
            Err(other) => Ok(self.decode_failed(&artifact, &location, other.to_string())),
        }
    }

    fn decode_failed<T>(&self, artifact: &str, location: &Location, detail: String) -> Retrieval<T> {
        self.observer.record_event(
            EventLevel::Error,
            &format!("{} from {} could not be decoded: {}", artifact, location, detail),
        );
        Retrieval::DecodeError {
            backend: location.backend,
            detail,
        }
    }

    fn read(&self, location: &Location, format: ArtifactFormat) -> Result<String> {
        let artifact = location.artifact(format);
        match location.backend {
            Backend::Local => self.backends.local.read(&artifact).map_err(|e| match e {
                DataError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
                    DataError::NotFound { artifact: artifact.clone() }
                }
                DataError::Io(io) => DataError::BackendUnavailable {
                    backend: Backend::Local,
                    detail: io.to_string(),
                },
                other => other,
            }),
            Backend::Object => self.backends.object.get(location.container(), &artifact),
            Backend::KeyValue => Err(DataError::BackendUnavailable {
                backend: Backend::KeyValue,
                detail: "key-value store has no read path".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::EventLog;
    use crate::storage::{
        DirectoryObjectStore, DirectoryStore, LocalStore, MemoryKeyValueStore, MemoryObjectStore, ObjectStore, Presence,
    };

    /// Object store whose probe succeeds but whose reads are refused.
    struct DenyingObjectStore;

    impl ObjectStore for DenyingObjectStore {
        fn head(&self, _bucket: &str, _key: &str) -> Presence {
            Presence::Exists
        }
        fn get(&self, _bucket: &str, _key: &str) -> Result<String> {
            Err(DataError::BackendUnavailable {
                backend: Backend::Object,
                detail: "HTTP 403 Forbidden".to_string(),
            })
        }
        fn put(&self, _bucket: &str, _key: &str, _body: &str) -> Result<()> {
            Ok(())
        }
    }

    /// Object store that cannot be reached at all.
    struct OfflineObjectStore;

    impl ObjectStore for OfflineObjectStore {
        fn head(&self, _bucket: &str, _key: &str) -> Presence {
            Presence::Unreachable("connection refused".to_string())
        }
        fn get(&self, _bucket: &str, _key: &str) -> Result<String> {
            unreachable!("get must not be called after a failed probe")
        }
        fn put(&self, _bucket: &str, _key: &str, _body: &str) -> Result<()> {
            Ok(())
        }
    }

    fn engine_with(object: Arc<dyn ObjectStore>) -> (tempfile::TempDir, Arc<DirectoryStore>, Arc<EventLog>, RetrievalEngine) {
        let dir = tempfile::tempdir().unwrap();
        let local = Arc::new(DirectoryStore::new(dir.path()));
        let log = Arc::new(EventLog::default());
        let backends = Backends::new(local.clone(), object, Arc::new(MemoryKeyValueStore::new()));
        let engine = RetrievalEngine::new(backends, StoreConfig::default(), log.clone());
        (dir, local, log, engine)
    }

    #[test]
    fn test_found_local_table() {
        let (_dir, local, _log, engine) = engine_with(Arc::new(MemoryObjectStore::new()));
        local.write("train.csv", "train_number,to_city\nT000001,Oslo\n").unwrap();

        match engine.retrieve(Category::Train, RetrievalRequest::local()).unwrap() {
            Retrieval::Found { backend, data } => {
                assert_eq!(backend, Backend::Local);
                assert_eq!(data.len(), 1);
                assert_eq!(data.record(0).unwrap().get("to_city"), Some("Oslo"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_absent_is_not_found_with_empty_table() {
        let (_dir, _local, log, engine) = engine_with(Arc::new(MemoryObjectStore::new()));
        let outcome = engine.retrieve(Category::Bus, RetrievalRequest::local()).unwrap();
        assert_eq!(outcome, Retrieval::NotFound { unreachable: vec![] });
        assert_eq!(outcome.into_parts(), (false, RowTable::empty()));
        assert_eq!(log.messages_at(EventLevel::Error), vec!["bus.csv has failed to retrieve: not found"]);
    }

    #[test]
    fn test_malformed_artifact_is_decode_error() {
        let (_dir, local, _log, engine) = engine_with(Arc::new(MemoryObjectStore::new()));
        local.write("flights.csv", "flights_number,to_city\nF000001\n").unwrap();

        let outcome = engine.retrieve(Category::Flights, RetrievalRequest::local()).unwrap();
        assert!(matches!(outcome, Retrieval::DecodeError { backend: Backend::Local, .. }));
        assert!(matches!(outcome.into_result("flights.csv"), Err(DataError::Decode(_))));
    }

    #[test]
    fn test_non_utf8_artifact_is_decode_error() {
        let (dir, _local, log, engine) = engine_with(Arc::new(MemoryObjectStore::new()));
        std::fs::write(dir.path().join("bus.csv"), b"bus_number\n\xff\xfe\n").unwrap();

        let outcome = engine.retrieve(Category::Bus, RetrievalRequest::local()).unwrap();
        match outcome {
            Retrieval::DecodeError { backend, detail } => {
                assert_eq!(backend, Backend::Local);
                assert!(detail.contains("UTF-8"), "{}", detail);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(log.messages_at(EventLevel::Error).len(), 1);
    }

    #[test]
    fn test_non_utf8_object_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("web-app-python")).unwrap();
        std::fs::write(dir.path().join("web-app-python/train.json"), b"{\"T1\":\xff}").unwrap();
        let (_dir, _local, _log, engine) = engine_with(Arc::new(DirectoryObjectStore::new(dir.path())));

        let outcome = engine.retrieve_json(Category::Train, RetrievalRequest::remote()).unwrap();
        assert!(matches!(outcome, Retrieval::DecodeError { backend: Backend::Object, .. }));
    }

    #[test]
    fn test_unreachable_remote_is_reported_apart_from_absence() {
        let (_dir, _local, log, engine) = engine_with(Arc::new(OfflineObjectStore));
        let outcome = engine.retrieve(Category::Flights, RetrievalRequest::remote()).unwrap();
        assert_eq!(
            outcome,
            Retrieval::NotFound {
                unreachable: vec![(Backend::Object, "connection refused".to_string())]
            }
        );
        assert_eq!(log.messages_at(EventLevel::Warning).len(), 1);
    }

    #[test]
    fn test_read_failure_after_probe_propagates() {
        let (_dir, _local, _log, engine) = engine_with(Arc::new(DenyingObjectStore));
        let err = engine.retrieve(Category::Train, RetrievalRequest::remote()).unwrap_err();
        assert!(matches!(err, DataError::BackendUnavailable { backend: Backend::Object, .. }));
    }

    #[test]
    fn test_retrieve_json_from_object_store() {
        let object = Arc::new(MemoryObjectStore::new());
        object
            .put("web-app-python", "bus.json", r#"{"B000001":{"to_city":"Cork","economy":300}}"#)
            .unwrap();
        let (_dir, _local, _log, engine) = engine_with(object);

        let json = engine
            .retrieve_json(Category::Bus, RetrievalRequest::remote())
            .unwrap()
            .into_result("bus.json")
            .unwrap();
        assert_eq!(json.len(), 1);
        assert_eq!(json.get("B000001").unwrap()["economy"], 300);
    }

    #[test]
    fn test_local_json_requires_json_file() {
        let (_dir, local, _log, engine) = engine_with(Arc::new(MemoryObjectStore::new()));
        local.write("bus.csv", "bus_number\nB000001\n").unwrap();
        let outcome = engine.retrieve_json(Category::Bus, RetrievalRequest::local()).unwrap();
        assert!(!outcome.is_found());
    }
}

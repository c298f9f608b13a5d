//! Caller-side "ensure data exists" workflow.
//!
//! Retrieval stays a two-step contract: the engine reports absence, and this
//! service decides how much to generate, where to persist it, and retries once.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::category::Category;
use crate::config::StoreConfig;
use crate::error::{DataError, Result};
use crate::generator::SyntheticGenerator;
use crate::observability::{EventLevel, Observer};
use crate::resolver::RetrievalRequest;
use crate::retrieval::{Retrieval, RetrievalEngine};
use crate::storage::{ArtifactFormat, Backend, Backends};
use crate::table::RowTable;
use crate::writer::{WriteReport, Writer};

/// What to generate and where to put it when a dataset is missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationPolicy {
    pub row_count: usize,
    pub targets: BTreeSet<Backend>,
    pub also_json: bool,
    /// Replace artifacts that already exist on a target.
    pub overwrite: bool,
    pub seed: Option<u64>,
}

impl GenerationPolicy {
    pub fn new(row_count: usize, targets: impl IntoIterator<Item = Backend>) -> Self {
        Self {
            row_count,
            targets: targets.into_iter().collect(),
            also_json: false,
            overwrite: false,
            seed: None,
        }
    }

    pub fn with_json(mut self, also_json: bool) -> Self {
        self.also_json = also_json;
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }
}

pub struct DatasetService {
    engine: RetrievalEngine,
    writer: Writer,
    generator: SyntheticGenerator,
    observer: Arc<dyn Observer>,
}

impl DatasetService {
    pub fn new(backends: Backends, config: StoreConfig, observer: Arc<dyn Observer>) -> Self {
        Self {
            engine: RetrievalEngine::new(backends.clone(), config.clone(), observer.clone()),
            writer: Writer::new(backends, config, observer.clone()),
            generator: SyntheticGenerator::new(),
            observer,
        }
    }

    pub fn with_generator(mut self, generator: SyntheticGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn engine(&self) -> &RetrievalEngine {
        &self.engine
    }

    pub fn writer(&self) -> &Writer {
        &self.writer
    }

    pub fn config(&self) -> &StoreConfig {
        self.engine.resolver().config()
    }

    /// Default policy: configured row count, local target, CSV only.
    pub fn default_policy(&self) -> GenerationPolicy {
        GenerationPolicy::new(self.config().default_row_count, [Backend::Local])
    }

    /// Generates a fresh table and fans it out to the policy's targets.
    pub fn generate_and_persist(&self, category: Category, policy: &GenerationPolicy) -> Result<WriteReport> {
        if policy.row_count < 1 {
            return Err(DataError::InvalidRowCount(policy.row_count));
        }
        if !policy.overwrite {
            self.refuse_existing(category, &policy.targets)?;
        }

        let table = self.generator.generate(category, policy.row_count, policy.seed);
        self.observer.record_event(
            EventLevel::Info,
            &format!("Generated {} {} rows", table.len(), category),
        );

        let report = self.writer.persist(category, &table, &policy.targets, policy.also_json);
        if report.is_success() {
            self.observer.record_event(
                EventLevel::Info,
                &format!("Successfully generated the {}.csv file", category),
            );
        }
        Ok(report)
    }

    /// Retrieve; on absence generate, persist, and retrieve exactly once more.
    pub fn ensure(
        &self,
        category: Category,
        request: RetrievalRequest,
        policy: &GenerationPolicy,
    ) -> Result<Retrieval<RowTable>> {
        let first = self.engine.retrieve(category, request)?;
        if !matches!(first, Retrieval::NotFound { .. }) {
            return Ok(first);
        }

        self.observer.record_event(
            EventLevel::Info,
            &format!("{}.csv not available, generating {} rows", category, policy.row_count),
        );
        self.generate_and_persist(category, policy)?.into_result()?;
        self.engine.retrieve(category, request)
    }

    /// Number of entries in the stored JSON projection.
    pub fn json_length(&self, category: Category, request: RetrievalRequest) -> Result<usize> {
        let artifact = format!("{}.json", category);
        let projection = self.engine.retrieve_json(category, request)?.into_result(&artifact)?;
        Ok(projection.len())
    }

    fn refuse_existing(&self, category: Category, targets: &BTreeSet<Backend>) -> Result<()> {
        let resolver = self.engine.resolver();
        for &backend in targets {
            let location = self.config().location(backend, category);
            if resolver.probe(&location, ArtifactFormat::Csv).exists() {
                self.observer.record_event(
                    EventLevel::Error,
                    &format!("Error in generating the {}.csv - Overwrite is not enabled", category),
                );
                return Err(DataError::OverwriteRefused {
                    artifact: location.artifact(ArtifactFormat::Csv),
                    backend,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::NullObserver;
    use crate::storage::{DirectoryStore, MemoryKeyValueStore, MemoryObjectStore, ObjectStore};

    fn service() -> (tempfile::TempDir, Arc<MemoryObjectStore>, DatasetService) {
        let dir = tempfile::tempdir().unwrap();
        let object = Arc::new(MemoryObjectStore::new());
        let backends = Backends::new(
            Arc::new(DirectoryStore::new(dir.path())),
            object.clone(),
            Arc::new(MemoryKeyValueStore::new()),
        );
        let service = DatasetService::new(backends, StoreConfig::default(), Arc::new(NullObserver));
        (dir, object, service)
    }

    #[test]
    fn test_zero_rows_rejected_before_io() {
        let (_dir, object, service) = service();
        let policy = GenerationPolicy::new(0, [Backend::Object]);
        assert!(matches!(
            service.generate_and_persist(Category::Bus, &policy),
            Err(DataError::InvalidRowCount(0))
        ));
        assert!(object.is_empty());
    }

    #[test]
    fn test_overwrite_required_for_existing_artifact() {
        let (_dir, _object, service) = service();
        let policy = GenerationPolicy::new(3, [Backend::Local]);
        assert!(service.generate_and_persist(Category::Train, &policy).unwrap().is_success());

        let err = service.generate_and_persist(Category::Train, &policy).unwrap_err();
        assert!(matches!(err, DataError::OverwriteRefused { backend: Backend::Local, .. }));

        let report = service
            .generate_and_persist(Category::Train, &policy.clone().with_overwrite(true))
            .unwrap();
        assert!(report.is_success());
    }

    #[test]
    fn test_ensure_returns_existing_without_generating() {
        let (_dir, object, service) = service();
        object
            .put("web-app-python", "flights.csv", "flights_number,to_city\nF000001,Rome\n")
            .unwrap();

        let policy = GenerationPolicy::new(5, [Backend::Object]);
        let outcome = service.ensure(Category::Flights, RetrievalRequest::remote(), &policy).unwrap();
        let (found, table) = outcome.into_parts();
        assert!(found);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_ensure_generates_into_object_store() {
        let (_dir, object, service) = service();
        let policy = GenerationPolicy::new(6, [Backend::Object]).with_json(true);

        let outcome = service.ensure(Category::Bus, RetrievalRequest::remote(), &policy).unwrap();
        assert!(matches!(outcome, Retrieval::Found { backend: Backend::Object, ref data } if data.len() == 6));
        assert_eq!(object.len(), 2);
        assert!(service.json_length(Category::Bus, RetrievalRequest::remote()).unwrap() <= 6);
    }

    #[test]
    fn test_json_length_missing_is_not_found() {
        let (_dir, _object, service) = service();
        assert!(matches!(
            service.json_length(Category::Train, RetrievalRequest::local()),
            Err(DataError::NotFound { .. })
        ));
    }
}

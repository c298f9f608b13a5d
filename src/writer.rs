//! Writer - best-effort fan-out of one table to several backends.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::category::Category;
use crate::codec::{encode_table_csv, project_to_json, JsonProjection};
use crate::config::StoreConfig;
use crate::error::{DataError, Result, TargetFailure};
use crate::observability::{EventLevel, Observer};
use crate::storage::{ArtifactFormat, Backend, Backends, KvItem};
use crate::table::RowTable;

/// Per-target outcome of a fan-out write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReport {
    pub category: Category,
    pub attempted: Vec<Backend>,
    pub failures: Vec<TargetFailure>,
}

impl WriteReport {
    /// False if any target failed.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn succeeded(&self) -> Vec<Backend> {
        self.attempted
            .iter()
            .copied()
            .filter(|b| !self.failures.iter().any(|f| f.backend == *b))
            .collect()
    }

    pub fn into_result(self) -> Result<()> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(DataError::PartialWriteFailure(self.failures))
        }
    }
}

pub struct Writer {
    backends: Backends,
    config: StoreConfig,
    observer: Arc<dyn Observer>,
}

impl Writer {
    pub fn new(backends: Backends, config: StoreConfig, observer: Arc<dyn Observer>) -> Self {
        Self {
            backends,
            config,
            observer,
        }
    }

    /// Writes `table` to every target independently; one failing target does
    /// not stop the others. With `also_json` the identifier-keyed projection is
    /// written next to the CSV on the local and object targets.
    pub fn persist(
        &self,
        category: Category,
        table: &RowTable,
        targets: &BTreeSet<Backend>,
        also_json: bool,
    ) -> WriteReport {
        let csv = encode_table_csv(table).map_err(|e| e.to_string());
        let json = if also_json {
            Some(self.json_body(category, table).map_err(|e| e.to_string()))
        } else {
            None
        };

        let mut report = WriteReport {
            category,
            attempted: Vec::with_capacity(targets.len()),
            failures: Vec::new(),
        };

        for &backend in targets {
            report.attempted.push(backend);
            let outcome = match backend {
                Backend::Local | Backend::Object => {
                    self.write_documents(backend, category, &csv, json.as_ref())
                }
                Backend::KeyValue => self.write_items(category, table),
            };

            match outcome {
                Ok(()) => self.observer.record_event(
                    EventLevel::Info,
                    &format!("Successfully wrote {} to {}", category, backend),
                ),
                Err(detail) => {
                    self.observer.record_event(
                        EventLevel::Error,
                        &format!("Error writing {} to {} - {}", category, backend, detail),
                    );
                    report.failures.push(TargetFailure { backend, detail });
                }
            }
        }

        report
    }

    fn json_body(&self, category: Category, table: &RowTable) -> Result<String> {
        let projection: JsonProjection = project_to_json(table, &category.id_column(), self.config.key_mode)?;
        projection.to_json_string()
    }

    /// CSV then (optionally) JSON to a document-style backend.
    fn write_documents(
        &self,
        backend: Backend,
        category: Category,
        csv: &std::result::Result<String, String>,
        json: Option<&std::result::Result<String, String>>,
    ) -> std::result::Result<(), String> {
        let location = self.config.location(backend, category);
        let put = |format: ArtifactFormat, body: &str| -> Result<()> {
            let artifact = location.artifact(format);
            match backend {
                Backend::Local => self.backends.local.write(&artifact, body),
                _ => self.backends.object.put(location.container(), &artifact, body),
            }
        };

        let csv = csv.as_ref().map_err(|e| format!("encoding failed: {}", e))?;
        put(ArtifactFormat::Csv, csv).map_err(|e| e.to_string())?;

        if let Some(json) = json {
            let json = json.as_ref().map_err(|e| format!("JSON projection failed: {}", e))?;
            put(ArtifactFormat::Json, json).map_err(|e| e.to_string())?;
        }
        Ok(())
    }

    /// One item per row, every field as a string attribute, keyed by the identifier.
    fn write_items(&self, category: Category, table: &RowTable) -> std::result::Result<(), String> {
        let table_name = self.config.kv_table(category);
        let id_column = category.id_column();

        let mut failed = 0usize;
        let mut first_error = None;
        for record in table.rows() {
            let item = KvItem {
                key: record.get(&id_column).unwrap_or_default().to_string(),
                attributes: record
                    .fields()
                    .map(|(c, v)| (c.to_string(), v.to_string()))
                    .collect::<BTreeMap<_, _>>(),
            };
            if let Err(e) = self.backends.kv.put_item(&table_name, &item) {
                failed += 1;
                first_error.get_or_insert_with(|| e.to_string());
            }
        }

        match first_error {
            None => Ok(()),
            Some(e) => Err(format!("{} of {} items failed, first error: {}", failed, table.len(), e)),
        }
    }
}

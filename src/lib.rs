pub mod category;
pub mod codec;
pub mod config;
pub mod error;
pub mod generator;
pub mod observability;
pub mod resolver;
pub mod retrieval;
pub mod storage;
pub mod table;
pub mod workflow;
pub mod writer;

pub use category::Category;
pub use codec::{decode_table, encode_table_csv, project_to_json, JsonProjection, KeyMode};
pub use config::StoreConfig;
pub use error::{DataError, Result};
pub use generator::SyntheticGenerator;
pub use resolver::{AvailabilityResolver, RetrievalRequest};
pub use retrieval::{Retrieval, RetrievalEngine};
pub use storage::{Backend, Backends};
pub use table::RowTable;
pub use workflow::{DatasetService, GenerationPolicy};
pub use writer::{WriteReport, Writer};

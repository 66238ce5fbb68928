//! Vector store client module
//!
//! Everything between the pipelines and the vector database: the validated
//! connection (`Connector`), the wire contract (`VectorBackend` with HTTP and
//! in-memory implementations), and the lifecycle-managing `VectorStore` that
//! owns schema, index and load/ready state.

pub mod backend;
mod config;
mod connector;
mod error;
pub mod memory;
mod milvus;
mod store;

#[cfg(test)]
mod tests;

pub use backend::{
    CollectionDescriptor, LoadState, SearchRequest, VectorBackend, VectorHit,
    INVERTED_INDEX_FIELDS, SCALAR_FIELDS,
};
pub use config::{HnswParams, MetricType, VectorDbConfig, VectorStoreConfig};
pub use connector::Connector;
pub use error::{VectorError, VectorResult};
pub use memory::InMemoryBackend;
pub use milvus::MilvusHttpBackend;
pub use store::VectorStore;

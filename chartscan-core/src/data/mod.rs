//! Series sources and preparation

pub mod memory;
pub mod parquet_store;
pub mod prepare;
pub mod provider;
pub mod synthetic;

pub use memory::MemorySource;
pub use parquet_store::ParquetStore;
pub use prepare::{prepare, DataIntegrityWarning, Prepared};
pub use provider::{RawRow, SeriesSource, SourceError};

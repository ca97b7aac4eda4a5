pub mod file_store;
pub mod ingest;
pub mod memory;

pub use file_store::CsvFileStore;
pub use ingest::Ingestor;
pub use memory::MemoryStore;

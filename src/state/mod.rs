pub mod event_store;
pub mod ingest;

pub use event_store::EventStore;
pub use ingest::IngestReport;

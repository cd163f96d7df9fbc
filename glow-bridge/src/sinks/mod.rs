pub mod log;
pub mod memory;
pub mod ndjson;

pub use log::LogEntitySink;
pub use memory::{EntitySnapshot, MemoryEntityStore};
pub use ndjson::NdjsonEntitySink;

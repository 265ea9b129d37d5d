pub mod batch;
pub mod error;
pub mod registry;
pub mod source;

pub use batch::{AssemblerConfig, Batch, BatchAssembler};
pub use error::Error;
pub use registry::{DatasetRegistry, DrawOptions, Entry, RegistryBuilder};
pub use source::{DirectorySource, MemorySource, StructureDecoder, StructureSource};

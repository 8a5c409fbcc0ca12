// Adapters layer: concrete store backends and input readers behind the domain ports.

pub mod csv_import;
pub mod json_file;
pub mod memory;
pub mod tables;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

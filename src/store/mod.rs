pub mod client;
pub mod document;
pub mod file;
pub mod memory;

pub use client::{
    FieldWrite, Principal, StoreClient, WriteBatch, WriteOp, MAX_BATCH_OPERATIONS,
};
pub use document::Document;
pub use file::FileStore;
pub use memory::MemoryStore;

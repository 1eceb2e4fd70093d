pub mod reference_store;

pub use reference_store::{
    FileReferenceStore, KvReferenceStore, MemoryReferenceStore, ReferenceStore,
};

pub mod document;
pub mod job;
pub mod reference;

pub use document::{Document, RewriteOutcome};
pub use job::{Job, JobStatus};
pub use reference::{ReferenceContext, ReferenceSlot, SlotName};

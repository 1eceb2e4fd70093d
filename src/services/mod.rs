pub mod archive;
pub mod llm_service;
pub mod prompt;
pub mod rewrite_client;
pub mod validation;

pub use archive::ArchiveAssembler;
pub use llm_service::LlmService;
pub use rewrite_client::{RetryPolicy, RewriteClient, RewriteService};
pub use validation::{admit, AdmittedBatch, ValidationLimits};

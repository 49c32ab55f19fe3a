pub mod card;
pub mod credential;
pub mod error;
pub mod fetch;
pub mod filename;
pub mod http;
pub mod progress;
pub mod report;
pub mod source;
pub mod template;
pub mod tokens;
pub mod transcode;

#[cfg(test)]
mod test_support;

// Re-export main types for convenience
pub use card::{Card, JsonOptions, Metadata, Sheet};
pub use credential::{CredentialProvider, EnvCredentials, Identity};
pub use error::{
    CodecError, CredentialError, FailureKind, FetchError, IntegrityError, SourceError,
    TaskError, TemplateError, WriteError,
};
pub use fetch::{FailedFetch, FetchJob, FetchReport};
pub use filename::{card_file_name, sanitize_stem};
pub use http::{HttpClient, HttpResponse, ReqwestClient, TransportOptions};
pub use progress::{NoopReporter, ProgressEvent, ProgressReporter, SharedProgressReporter};
pub use report::render_report;
pub use source::{
    FetchTask, IntegrationStatus, Router, SkippedSource, Source, SourceId, default_router,
};
pub use tokens::{DEFAULT_FORMAT, TOKENS, compile_name_format};
pub use transcode::{decode_card, decode_card_to_file, inject_sheet};

pub mod access;
pub mod admin;
pub mod call;
pub mod config;
pub mod error;
pub mod eventlog;
pub mod fanout;
pub mod interceptor;
pub mod pipeline;
pub mod stats;
pub mod time;

// Re-export the pieces a transport needs to wire the pipeline in
pub use call::{CallContext, Metadata, ServerStream, StreamHandler, UnaryHandler};
pub use config::{OverflowPolicy, PipelineConfig};
pub use error::{CallError, PolicyError, StatusCode};
pub use pipeline::Pipeline;

pub mod cancel;
pub mod controller;
pub mod policy;

pub use cancel::CancellationToken;
pub use controller::PipelineController;
pub use policy::{Continuation, FailurePolicy};

//! Local and remote workflow executors.
//!
//! Both executors consume the same [`flowtrace_types::envelope::WorkflowInput`]
//! contract. The local executor runs a registered in-process handler; the
//! remote executor posts the envelope to an n8n webhook through the
//! [`remote::RemoteEngine`] port, resolving URLs through an injectable
//! [`cache::WebhookUrlCache`].

pub mod cache;
pub mod local;
pub mod remote;

pub use cache::WebhookUrlCache;
pub use local::{FnHandler, LocalExecutor, LocalHandler};
pub use remote::{RemoteEngine, RemoteExecutor, RemoteExecutionStatus, RemoteReply};

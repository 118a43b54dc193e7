//! Session submission
//!
//! - [`filters`]: which sessions go where
//! - [`payload`]: server JSON shape of a recording
//! - [`api`]: the RPC seam and its HTTP implementation
//! - [`dispatcher`]: the task that submits completed recordings

pub mod api;
pub mod dispatcher;
pub mod filters;
pub mod payload;

pub use api::{game_url, ClientConnectReply, HttpApi, SubmissionApi, DEFAULT_TIMEOUT};
pub use dispatcher::{DispatchSettings, LastSubmission, ServerInfo};
pub use payload::GamePayload;

//! `postgrest-probe` runs a fixed diagnostic checklist against a hosted
//! PostgREST API and logs what comes back.
//!
//! The client exposes the two calls the checklist needs:
//! - [`PostgrestClient::rpc`]
//! - [`PostgrestClient::query`]
//!
//! [`probe::run_checklist`] drives them one at a time.

mod client;
mod config;
mod decode;
mod error;
mod options;
mod params;
pub mod probe;
mod types;

pub use client::{project_ref_to_url, PostgrestClient};
pub use config::ProbeConfig;
pub use error::PostgrestError;
pub use options::ClientOptions;
pub use params::{Filter, ProbeRequest, Query, RpcArgs};
pub use types::{ServiceError, ServiceResponse};

pub type Result<T> = std::result::Result<T, PostgrestError>;

//! Uptime Console Library
//!
//! This library provides the client-side data layer for a URL uptime
//! monitoring service: a typed transport, an identity gate, shared
//! caches for the monitor list and per-monitor details, and the
//! mutation pipeline that keeps them coherent.

pub mod config;
pub mod console;
pub mod detail_cache;
pub mod errors;
pub mod identity;
pub mod list_cache;
pub mod model;
pub mod mutations;
pub mod transport;
pub mod view;

pub use config::Config;
pub use console::{Cli, Command, Console, IdentityAction};
pub use detail_cache::DetailCache;
pub use errors::{ApiError, Result};
pub use identity::{FileIdentityStore, IdentityGate, IdentityStore};
pub use list_cache::{ListSnapshot, ListSubscription, MonitorListCache};
pub use model::{
    CheckLog, CreateMonitorRequest, Endpoint, EndpointDetail, EndpointStatus, Monitor,
    MonitorDetail,
};
pub use mutations::{CheckInterval, CreateForm, MutationOutcome, MutationPipeline};
pub use transport::{ApiClient, IDENTITY_HEADER};
pub use view::StatusFilter;

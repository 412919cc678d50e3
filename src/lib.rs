// Campus Client - authenticated HTTP core for the campus portal
//
// The portal's endpoint wrappers all go through [`PortalClient::send`]:
// it attaches the current access credential, refreshes it exactly once
// under concurrent expiry, replays waiting requests, and classifies
// terminal failures for the rest of the application.

pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod http_client;

pub use auth::{
    CredentialRefresher, HttpRefresher, NoopHooks, RefreshCoordinator, SessionHooks, SessionStore,
};
pub use config::ClientConfig;
pub use error::{ApiError, RefreshDenied};
pub use events::{FailureBus, FailureEvent};
pub use http_client::{PendingRequest, PortalClient};

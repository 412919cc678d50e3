// Authentication module
// Session state, the refresh exchange, and single-flight coordination

mod coordinator;
mod refresher;
mod session;
mod types;

pub use coordinator::{NoopHooks, RefreshCoordinator, SessionHooks};
pub use refresher::{CredentialRefresher, HttpRefresher};
pub use session::SessionStore;

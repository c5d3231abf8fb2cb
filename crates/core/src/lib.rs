//! Authenticated-session lifecycle manager for end-to-end suites behind
//! federated (SAML-style) single sign-on.
//!
//! Logging in involves a second factor and a third-party identity provider
//! that cannot be driven headlessly, so individual tests must not each log
//! in. This crate obtains a valid authenticated browser state once,
//! persists it atomically, validates it by live probe before every reuse,
//! and hands it to any number of concurrent test runs.
//!
//! The pieces, leaves first:
//!
//! - [`store::SessionStore`] - one atomic JSON record per identity
//! - [`validate::ProbeValidator`] - replays a record into a disposable
//!   browser context and classifies the result
//! - [`acquire::SessionAcquirer`] - live capture from an externally
//!   supervised browser, or a cancellable human-in-the-loop login drive
//! - [`provider::SessionProvider`] - the façade test runs call
//!
//! Test runs only ever touch [`provider::SessionProvider::get_session`]:
//! it returns a validated session or an error the test must fail on.

pub mod acquire;
pub mod config;
pub mod error;
pub mod launch;
pub mod probe;
pub mod provider;
pub mod store;
pub mod validate;

pub use acquire::{Acquire, AcquireInput, AcquirePlan, SessionAcquirer, resolve_acquire_plan};
pub use ak_protocol::{AuthSession, Cookie, OriginState, ValidationOutcome, ValidationReport};
pub use config::{IdentifierField, ManagerConfig};
pub use error::{AkError, Result};
pub use provider::SessionProvider;
pub use store::SessionStore;
pub use validate::{ProbeValidator, Validate};

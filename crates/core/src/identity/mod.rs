//! Identity reconciliation for OpenID Connect logins.
//!
//! Two independent operations run from the login callback:
//! 1. [`PersonReconciler`] links the user to a person record
//! 2. [`UsernameResolver`] maps a provider username to an existing user

pub mod reconciler;
pub mod resolver;

pub use reconciler::{PersonReconciler, ReconcileOutcome};
pub use resolver::UsernameResolver;

//! Identity resolution and session lifecycle for the Findrr job board client.
//!
//! ARCHITECTURE
//! ============
//! Leaf-first: `resource` is a generic reactive wrapper around one async read;
//! `session` establishes and tears down provider sessions; `resolver` maps an
//! authenticated principal to exactly one profile kind; `cache` keeps the last
//! resolved user for offline continuity; `store` composes all of them into the
//! single subscribable value every screen consumes.
//!
//! The identity/document backend is reached only through the
//! [`provider::IdentityProvider`] seam, so every component can be driven by an
//! in-memory provider in tests.

pub mod browser;
pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod resolver;
pub mod resource;
pub mod session;
pub mod storage;
pub mod store;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use cache::UserCache;
pub use config::IdentityConfig;
pub use model::{Principal, ProfileDocument, Session, User, UserType};
pub use resolver::IdentityResolver;
pub use session::SessionClient;
pub use store::{IdentitySnapshot, IdentityStore, LoadOutcome};

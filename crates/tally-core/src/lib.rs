//! Tally Core — domain models, repository traits and the shared error
//! type.
//!
//! Every other crate in the workspace depends on this one. It has no
//! knowledge of the storage engine; services are written against the
//! traits in [`repository`].

pub mod error;
pub mod models;
pub mod repository;

pub use error::{TallyError, TallyResult};

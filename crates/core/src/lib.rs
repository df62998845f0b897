//! neocli-core: Neocities API client library
//!
//! Provides credential resolution, a blocking client for the Neocities
//! HTTP API, and the directory walk / tree reconciliation behind the
//! `neocli` command-line tool.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod listing;
pub mod scan;
pub mod sync;

pub use api::{NeocitiesApi, SiteInfo};
pub use auth::Credentials;
pub use error::{BatchFailure, BatchReport, Error, Result};
pub use listing::{Listing, RemoteEntry};
pub use scan::Scanner;
pub use sync::BatchPolicy;

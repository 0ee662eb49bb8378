//! # Cards Core
//!
//! Domain model, storage and clients for the Cards work tracker.
//!
//! Cards move through `ToDo -> In Progress -> Done`, carry a priority and
//! lifecycle timestamps, and can be listed through an AND-combined filter
//! set. The same operations are exposed through a blocking [`CardClient`]
//! and a concurrent [`AsyncCardClient`], which share one request table and
//! one error mapping.

pub mod api;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod service;
pub mod storage;

// Re-export commonly used types
pub use client::{AsyncCardClient, CardClient, ClientError, ClientResult};
pub use config::Config;
pub use domain::{
    card::{Card, CardId, CardUpdate, NewCard, Priority, State},
    filter::{FilterCriteria, FilterSet, FilteredCards},
};
pub use error::{CardsError, Result};
pub use service::CardService;
pub use storage::Storage;

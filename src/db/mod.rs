//! MongoDB-backed persistence.
//!
//! `mongo` holds the typed client/collection wrapper; `schemas` the
//! document types for the three entity collections.

pub mod mongo;
pub mod schemas;

pub use mongo::{IntoIndexes, MongoClient, MongoCollection, MutMetadata};

//! The network seam.
//!
//! Controllers never talk HTTP themselves. They hand commands to a
//! [`RemoteService`]; production code uses [`GraphqlClient`], tests plug in
//! an in-memory service.

mod client;
mod decode;
pub mod graphql;

pub use client::{interpret_response, GraphqlClient};
pub use decode::{decode_list_page, decode_record, parse_date};

use crate::error::RemoteError;
use crate::models::{ListPage, RecordSnapshot};
use crate::schema::ResourceSchema;
use async_trait::async_trait;

/// Mutation arguments, keyed by wire field name.
pub type Variables = serde_json::Map<String, serde_json::Value>;

/// Query and mutation contract of the bookkeeping service.
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Every record of `schema`'s resource plus the options for its
    /// reference fields.
    async fn list(&self, schema: &'static ResourceSchema) -> Result<ListPage, RemoteError>;

    /// Create a record. References in `variables` are identifiers.
    async fn create(
        &self,
        schema: &'static ResourceSchema,
        variables: Variables,
    ) -> Result<RecordSnapshot, RemoteError>;

    /// Update the record `id` with the fields in `variables`.
    async fn update(
        &self,
        schema: &'static ResourceSchema,
        id: &str,
        variables: Variables,
    ) -> Result<RecordSnapshot, RemoteError>;

    /// Delete the record `id`.
    async fn delete(&self, schema: &'static ResourceSchema, id: &str) -> Result<(), RemoteError>;

    /// Exchange credentials for a session token.
    async fn login(&self, username: &str, password: &str) -> Result<String, RemoteError>;
}

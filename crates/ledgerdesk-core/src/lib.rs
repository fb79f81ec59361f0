//! Core session handling and resource synchronization for ledgerdesk.
//!
//! This crate provides the pieces every front end shares: the durable
//! session, the request interceptor and route guard built on it, the five
//! resource schemas, the GraphQL client, and the generic controller that
//! keeps a cached record list in step with the remote service.

pub mod auth;
pub mod controller;
pub mod error;
pub mod guard;
pub mod interceptor;
pub mod models;
pub mod notify;
pub mod remote;
pub mod schema;
pub mod session;

pub use auth::Authenticator;
pub use controller::{execute, Command, ControllerState, Mode, MutationKind, Outcome, ResourceController};
pub use error::{DraftError, RemoteError, SessionError, ValidationError};
pub use guard::{Route, RouteGuard};
pub use interceptor::RequestInterceptor;
pub use models::{Draft, FieldValue, ListPage, RecordSnapshot, ReferenceOption, ReferenceValue};
pub use notify::{Notice, NoticeBuffer, NoticeLevel, Notifier, TracingNotifier};
pub use remote::{GraphqlClient, RemoteService, Variables};
pub use schema::{FieldDef, FieldKind, Resource, ResourceSchema, ScalarType};
pub use session::{FileSessionStore, MemorySessionStore, SessionStore};

//! Federation subgraph support on top of [`apollo_compiler`].
//!
//! Given the root fields a service exposes, this crate
//!
//! * discovers the entity types (object types carrying `@key`) reachable from them,
//! * assembles the subgraph schema, adding the `_Entity` union and the `_service` and
//!   `_entities` root fields a federation gateway relies on,
//! * renders the canonical SDL the gateway fetches through `_service { sdl }`,
//! * resolves `_entities` representations through a registered resolver, isolating
//!   failures to the representation that caused them.
//!
//! ```
//! use federated_subgraph::BoxError;
//! use federated_subgraph::Federation;
//! use federated_subgraph::Representation;
//! use federated_subgraph::graphql::Request;
//! use serde_json_bytes::json;
//!
//! let federation = Federation::new();
//! federation
//!     .build_subgraph_schema_from_sdl(
//!         r#"
//!         type Query { me: User }
//!         type User @key(fields: "id") { id: ID! name: String }
//!         "#,
//!         "users.graphql",
//!     )
//!     .unwrap();
//! federation
//!     .set_entity_resolver(|representation: &Representation| -> Result<_, BoxError> {
//!         let (_, id) = representation.primary_key().ok_or("no key")?;
//!         Ok(json!({ "id": id.to_json(), "name": "Bilbo" })
//!             .as_object()
//!             .cloned()
//!             .unwrap_or_default())
//!     })
//!     .unwrap();
//!
//! let response = federation.execute(
//!     &Request::builder()
//!         .query(r#"{ _entities(representations: [{ __typename: "User", id: "1" }]) { ... on User { name } } }"#)
//!         .build(),
//! );
//! assert_eq!(
//!     response.to_json(),
//!     json!({ "data": { "_entities": [{ "name": "Bilbo" }] } })
//! );
//! ```

#![warn(
    rustdoc::broken_intra_doc_links,
    unreachable_pub,
    unreachable_patterns,
    unused,
    dead_code,
    while_true,
    unconditional_panic,
    clippy::all
)]

pub mod entity;
pub mod error;
mod execution;
mod federation;
pub mod graphql;
pub mod keys;
pub mod protocol;
pub mod representation;
mod resolvers;
pub mod sdl;
pub mod subgraph;
pub mod walker;

pub use crate::entity::EntityUnion;
pub use crate::error::BoxError;
pub use crate::error::EntityError;
pub use crate::error::FederationError;
pub use crate::federation::Federation;
pub use crate::representation::Entity;
pub use crate::representation::KeyValue;
pub use crate::representation::Representation;
pub use crate::resolvers::BatchEntityResolver;
pub use crate::resolvers::EntityResolver;
pub use crate::resolvers::FieldResolver;
pub use crate::subgraph::Fields;
pub use crate::subgraph::Subgraph;

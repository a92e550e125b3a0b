//! The subgraph orchestrator: builds snapshots, registers resolvers and serves requests.
use std::sync::Arc;

use apollo_compiler::Schema;
use apollo_compiler::response::GraphQLError;
use apollo_compiler::response::JsonValue;
use itertools::Itertools;
use parking_lot::Mutex;
use parking_lot::RwLock;

use crate::error::EntityError;
use crate::error::FederationError;
use crate::execution::ExecutionContext;
use crate::execution::execute;
use crate::graphql::Request;
use crate::graphql::Response;
use crate::representation::Entity;
use crate::representation::resolve_representations;
use crate::resolvers::BatchEntityResolver;
use crate::resolvers::EntityResolver;
use crate::resolvers::EntityResolverKind;
use crate::resolvers::FieldResolver;
use crate::resolvers::FieldResolvers;
use crate::subgraph::Fields;
use crate::subgraph::Subgraph;

/// Serves one federated subgraph.
///
/// Builds replace the current [`Subgraph`] snapshot as a whole; requests in flight keep
/// the snapshot they started with. Builds are serialized, while any number of requests
/// can run concurrently with them and with each other.
#[derive(Default)]
pub struct Federation {
    current: RwLock<Option<Arc<Subgraph>>>,
    build_lock: Mutex<()>,
    entity_resolver: RwLock<Option<EntityResolverKind>>,
    field_resolvers: RwLock<Arc<FieldResolvers>>,
}

impl Federation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the subgraph schema for the given root fields and makes it current.
    pub fn build_subgraph_schema(
        &self,
        types: &Schema,
        query_fields: Fields,
        mutation_fields: Fields,
    ) -> Result<Arc<Subgraph>, FederationError> {
        let _guard = self.build_lock.lock();
        let subgraph = Arc::new(Subgraph::build(types, query_fields, mutation_fields)?);
        self.swap(subgraph.clone());
        Ok(subgraph)
    }

    /// Same as [`Federation::build_subgraph_schema`], from a schema document whose root
    /// types declare the fields to serve.
    pub fn build_subgraph_schema_from_sdl(
        &self,
        sdl: &str,
        path: &str,
    ) -> Result<Arc<Subgraph>, FederationError> {
        let _guard = self.build_lock.lock();
        let subgraph = Arc::new(Subgraph::parse(sdl, path)?);
        self.swap(subgraph.clone());
        Ok(subgraph)
    }

    fn swap(&self, subgraph: Arc<Subgraph>) {
        let entities = subgraph.entities().member_names().join(", ");
        let previous = self.current.write().replace(subgraph);
        tracing::info!(%entities, rebuilt = previous.is_some(), "subgraph schema is ready");
    }

    /// The current snapshot, if a build succeeded.
    pub fn subgraph(&self) -> Option<Arc<Subgraph>> {
        self.current.read().clone()
    }

    /// The canonical SDL of the current snapshot.
    pub fn print_sdl(&self) -> Result<String, FederationError> {
        self.subgraph()
            .map(|subgraph| subgraph.sdl().to_string())
            .ok_or(FederationError::NotBuilt)
    }

    /// Registers the resolver called once per representation.
    ///
    /// Replaces a previously registered single resolver; fails if a batch resolver is
    /// registered.
    pub fn set_entity_resolver(
        &self,
        resolver: impl EntityResolver,
    ) -> Result<(), FederationError> {
        self.register_entity_resolver(EntityResolverKind::Single(Arc::new(resolver)))
    }

    /// Registers the resolver called once per `_entities` call with every representation.
    ///
    /// Replaces a previously registered batch resolver; fails if a single resolver is
    /// registered.
    pub fn set_batch_entity_resolver(
        &self,
        resolver: impl BatchEntityResolver,
    ) -> Result<(), FederationError> {
        self.register_entity_resolver(EntityResolverKind::Batch(Arc::new(resolver)))
    }

    fn register_entity_resolver(
        &self,
        resolver: EntityResolverKind,
    ) -> Result<(), FederationError> {
        let mut registered = self.entity_resolver.write();
        if let Some(existing) = registered.as_ref() {
            if existing.kind() != resolver.kind() {
                return Err(FederationError::ConflictingEntityResolvers {
                    registered: existing.kind(),
                });
            }
        }
        tracing::debug!(kind = resolver.kind(), "registered entity resolver");
        *registered = Some(resolver);
        Ok(())
    }

    /// Registers the resolver of `type_name.field_name`, replacing any previous one.
    ///
    /// Root fields other than `_service` and `_entities` need one. Other fields default to
    /// reading the same-named entry of their parent object.
    pub fn set_field_resolver(
        &self,
        type_name: &str,
        field_name: &str,
        resolver: impl FieldResolver,
    ) {
        let mut field_resolvers = self.field_resolvers.write();
        Arc::make_mut(&mut field_resolvers).insert(type_name, field_name, Arc::new(resolver));
    }

    /// Runs a GraphQL request against the current snapshot.
    pub fn execute(&self, request: &Request) -> Response {
        let Some(subgraph) = self.subgraph() else {
            return Response::from_errors(vec![GraphQLError::new(
                FederationError::NotBuilt.to_string(),
                None,
                &Default::default(),
            )]);
        };
        let field_resolvers = self.field_resolvers.read().clone();
        let entity_resolver = self.entity_resolver.read().clone();
        let context = ExecutionContext {
            subgraph: &subgraph,
            field_resolvers: &field_resolvers,
            entity_resolver: entity_resolver.as_ref(),
        };
        execute(&context, request)
    }

    /// Resolves `_entities` representations without going through GraphQL.
    pub fn resolve_entities(
        &self,
        representations: &JsonValue,
    ) -> Result<Vec<Result<Entity, EntityError>>, FederationError> {
        let subgraph = self.subgraph().ok_or(FederationError::NotBuilt)?;
        let entity_resolver = self.entity_resolver.read().clone();
        resolve_representations(
            subgraph.schema(),
            subgraph.entities(),
            entity_resolver.as_ref(),
            representations,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;
    use std::sync::atomic::Ordering;

    use apollo_compiler::response::JsonMap;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::BoxError;
    use crate::representation::Representation;

    fn resolve_one(_: &Representation) -> Result<JsonMap, BoxError> {
        Ok(JsonMap::new())
    }

    fn resolve_all(
        representations: &[Representation],
    ) -> Result<Vec<Result<JsonMap, BoxError>>, BoxError> {
        Ok(representations.iter().map(|_| Ok(JsonMap::new())).collect())
    }

    #[test]
    fn entity_resolver_kinds_are_exclusive() {
        let federation = Federation::new();
        federation.set_entity_resolver(resolve_one).unwrap();
        federation.set_entity_resolver(resolve_one).unwrap();
        assert_eq!(
            federation.set_batch_entity_resolver(resolve_all),
            Err(FederationError::ConflictingEntityResolvers {
                registered: "single"
            })
        );

        let federation = Federation::new();
        federation.set_batch_entity_resolver(resolve_all).unwrap();
        assert_eq!(
            federation.set_entity_resolver(resolve_one),
            Err(FederationError::ConflictingEntityResolvers {
                registered: "batch"
            })
        );
    }

    #[test]
    fn nothing_is_served_before_the_first_build() {
        let federation = Federation::new();
        assert_eq!(federation.print_sdl(), Err(FederationError::NotBuilt));
        assert_eq!(
            federation.resolve_entities(&JsonValue::Array(Vec::new())),
            Err(FederationError::NotBuilt)
        );
        let response = federation.execute(&Request::builder().query("{ __typename }").build());
        assert!(response.data.is_none());
        assert_eq!(
            response.errors[0].message,
            "the subgraph schema has not been built yet"
        );
    }

    #[test]
    fn failed_build_keeps_the_previous_snapshot() {
        let federation = Federation::new();
        let first = federation
            .build_subgraph_schema_from_sdl("type Query { hello: String }", "hello.graphql")
            .unwrap();
        assert!(federation
            .build_subgraph_schema_from_sdl("type Query { hello: Missing }", "broken.graphql")
            .is_err());
        assert!(Arc::ptr_eq(&first, &federation.subgraph().unwrap()));

        let second = federation
            .build_subgraph_schema_from_sdl(
                "type Query { hello: String bye: String }",
                "hello.graphql",
            )
            .unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(federation.print_sdl().unwrap().contains("  bye: String\n"));
        assert!(!first.sdl().contains("bye"));
    }

    #[test]
    fn readers_see_whole_snapshots_while_rebuilding() {
        const SMALL: &str = "type Query { a: String }";
        const LARGE: &str = "type Query { a: String b: String }";
        let expected = [
            Subgraph::parse(SMALL, "small.graphql").unwrap().sdl().to_string(),
            Subgraph::parse(LARGE, "large.graphql").unwrap().sdl().to_string(),
        ];
        let federation = Federation::new();
        federation.build_subgraph_schema_from_sdl(SMALL, "small.graphql").unwrap();
        let done = AtomicBool::new(false);

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for round in 0..200 {
                    let sdl = if round % 2 == 0 { LARGE } else { SMALL };
                    federation.build_subgraph_schema_from_sdl(sdl, "rebuild.graphql").unwrap();
                }
                done.store(true, Ordering::SeqCst);
            });
            scope.spawn(|| {
                let request = Request::builder().query("{ _service { sdl } }").build();
                while !done.load(Ordering::SeqCst) {
                    let printed = federation.print_sdl().unwrap();
                    assert!(expected.contains(&printed), "torn SDL: {printed}");

                    let response = federation.execute(&request);
                    assert!(response.errors.is_empty(), "{:?}", response.errors);
                    let served = response
                        .data
                        .as_ref()
                        .and_then(|data| data.get("_service"))
                        .and_then(|service| service.get("sdl"))
                        .and_then(|sdl| sdl.as_str())
                        .unwrap()
                        .to_string();
                    assert!(expected.contains(&served), "torn SDL: {served}");
                }
            });
        });
        assert_eq!(federation.print_sdl().unwrap(), expected[0]);
    }

    #[test]
    fn federation_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Federation>();
        assert_send_sync::<Subgraph>();
    }
}

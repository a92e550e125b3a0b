//! Assembly of the subgraph schema and the immutable snapshot serving it.
use std::sync::OnceLock;

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::Schema;
use apollo_compiler::collections::IndexMap;
use apollo_compiler::collections::IndexSet;
use apollo_compiler::schema::Component;
use apollo_compiler::schema::ComponentName;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::schema::FieldDefinition;
use apollo_compiler::schema::InputValueDefinition;
use apollo_compiler::schema::ObjectType;
use apollo_compiler::ty;
use apollo_compiler::validation::Valid;

use crate::entity::EntityUnion;
use crate::entity::build_entity_union;
use crate::error::FederationError;
use crate::protocol::ENTITIES_QUERY;
use crate::protocol::ENTITY_UNION_NAME;
use crate::protocol::FEDERATION_DIRECTIVE_NAMES;
use crate::protocol::FEDERATION_PREAMBLE;
use crate::protocol::FEDERATION_TYPE_NAMES;
use crate::protocol::MUTATION_TYPE;
use crate::protocol::QUERY_TYPE;
use crate::protocol::REPRESENTATIONS_ARGUMENT;
use crate::protocol::SERVICE_SDL_QUERY;
use crate::protocol::SERVICE_TYPE_DEFINITION;
use crate::sdl::print_sdl;
use crate::walker::TypeGraph;
use crate::walker::object_types_of_fields;

/// Root fields, keyed by field name.
pub type Fields = IndexMap<Name, Component<FieldDefinition>>;

/// One successful build: the validated schema and everything derived from it.
///
/// Snapshots are never mutated. A rebuild produces a new one.
#[derive(Debug)]
pub struct Subgraph {
    schema: Valid<Schema>,
    entities: EntityUnion,
    types: TypeGraph,
    sdl: OnceLock<String>,
}

impl Subgraph {
    /// Builds the subgraph schema serving `query_fields` and `mutation_fields`.
    ///
    /// `types` holds the definitions of every named type the fields reference.
    pub fn build(
        types: &Schema,
        mut query_fields: Fields,
        mutation_fields: Fields,
    ) -> Result<Self, FederationError> {
        let seeds = object_types_of_fields(
            types,
            query_fields
                .values()
                .chain(mutation_fields.values())
                .map(|field| field.ty.inner_named_type()),
        );
        let mut graph = TypeGraph::default();
        graph.walk(types, &seeds, true);

        let entities = build_entity_union(&graph.objects);

        // catches types only reachable from the roots themselves
        let roots = [
            root_object(QUERY_TYPE, &query_fields),
            root_object(MUTATION_TYPE, &mutation_fields),
        ];
        graph.walk(types, &roots, false);

        query_fields.insert(SERVICE_SDL_QUERY, service_field());
        if !entities.is_empty() {
            query_fields.insert(ENTITIES_QUERY, entities_field());
        }

        let mut schema = types.clone();
        populate_federation_definitions(&mut schema, &entities)?;
        schema.types.insert(
            QUERY_TYPE,
            ExtendedType::Object(root_object(QUERY_TYPE, &query_fields)),
        );
        let has_mutation = !mutation_fields.is_empty();
        if has_mutation {
            schema.types.insert(
                MUTATION_TYPE,
                ExtendedType::Object(root_object(MUTATION_TYPE, &mutation_fields)),
            );
        }
        let schema_definition = schema.schema_definition.make_mut();
        schema_definition.query = Some(ComponentName::from(QUERY_TYPE));
        schema_definition.mutation = has_mutation.then(|| ComponentName::from(MUTATION_TYPE));
        schema_definition.subscription = None;

        let schema = schema
            .validate()
            .map_err(|with_errors| FederationError::SchemaAssembly {
                message: with_errors.errors.to_string(),
            })?;
        tracing::debug!(
            entities = entities.members().len(),
            objects = graph.objects.len(),
            interfaces = graph.interfaces.len(),
            "assembled subgraph schema"
        );
        Ok(Self {
            schema,
            entities,
            types: graph,
            sdl: OnceLock::new(),
        })
    }

    /// Builds from a schema document, serving the fields of its query and mutation root
    /// types.
    ///
    /// Orphan `extend type` definitions are adopted, so federation 1 style documents work.
    pub fn parse(sdl: &str, path: &str) -> Result<Self, FederationError> {
        let types = Schema::builder()
            .adopt_orphan_extensions()
            .parse(sdl, path)
            .build()
            .map_err(|with_errors| FederationError::InvalidGraphQL {
                message: with_errors.errors.to_string(),
            })?;
        let root_fields = |root: Option<&ComponentName>| -> Fields {
            root.and_then(|root| types.get_object(&root.name))
                .map(|object| object.fields.clone())
                .unwrap_or_default()
        };
        let query_fields = root_fields(types.schema_definition.query.as_ref());
        let mutation_fields = root_fields(types.schema_definition.mutation.as_ref());
        Self::build(&types, query_fields, mutation_fields)
    }

    pub fn schema(&self) -> &Valid<Schema> {
        &self.schema
    }

    pub fn entities(&self) -> &EntityUnion {
        &self.entities
    }

    /// Object types and interfaces discovered from the root fields.
    pub fn types(&self) -> &TypeGraph {
        &self.types
    }

    /// The canonical SDL, rendered on first use.
    pub fn sdl(&self) -> &str {
        self.sdl
            .get_or_init(|| print_sdl(&self.schema, &self.entities))
    }
}

fn root_object(name: Name, fields: &Fields) -> Node<ObjectType> {
    Node::new(ObjectType {
        description: None,
        name,
        implements_interfaces: IndexSet::default(),
        directives: Default::default(),
        fields: fields.clone(),
    })
}

/// `_service: _Service!`
fn service_field() -> Component<FieldDefinition> {
    Component::new(FieldDefinition {
        description: None,
        name: SERVICE_SDL_QUERY,
        arguments: Vec::new(),
        ty: ty!(_Service!),
        directives: Default::default(),
    })
}

/// `_entities(representations: [_Any!]!): [_Entity]`
fn entities_field() -> Component<FieldDefinition> {
    Component::new(FieldDefinition {
        description: None,
        name: ENTITIES_QUERY,
        arguments: vec![Node::new(InputValueDefinition {
            description: None,
            name: REPRESENTATIONS_ARGUMENT,
            ty: ty!([_Any!]!).into(),
            default_value: None,
            directives: Default::default(),
        })],
        ty: ty!([_Entity]),
        directives: Default::default(),
    })
}

/// Adds the federation scalars, directives and `_Service` unless the host schema already
/// defines them, then the `_Entity` union when there are entities.
fn populate_federation_definitions(
    schema: &mut Schema,
    entities: &EntityUnion,
) -> Result<(), FederationError> {
    let definitions = Schema::parse(
        format!("{FEDERATION_PREAMBLE}{SERVICE_TYPE_DEFINITION}"),
        "federation.graphql",
    )
    .map_err(|with_errors| FederationError::SchemaAssembly {
        message: with_errors.errors.to_string(),
    })?;

    for type_name in FEDERATION_TYPE_NAMES {
        if let Some(definition) = definitions.types.get(&type_name) {
            schema
                .types
                .entry(type_name)
                .or_insert_with(|| definition.clone());
        }
    }
    for directive_name in FEDERATION_DIRECTIVE_NAMES {
        if let Some(definition) = definitions.directive_definitions.get(&directive_name) {
            schema
                .directive_definitions
                .entry(directive_name)
                .or_insert_with(|| definition.clone());
        }
    }
    if let Some(union_type) = entities.to_union_type() {
        schema
            .types
            .insert(ENTITY_UNION_NAME, ExtendedType::Union(union_type));
    }
    Ok(())
}

//! Host callbacks resolving root fields, object fields and entities.
use std::collections::HashMap;
use std::sync::Arc;

use apollo_compiler::response::JsonMap;
use apollo_compiler::response::JsonValue;

use crate::error::BoxError;
use crate::representation::Representation;

/// Resolves one field of one type.
///
/// `parent` is the JSON object the field is selected on (empty for root fields) and
/// `arguments` the coerced field arguments. Closures taking `(&JsonMap, &JsonMap)` implement
/// this trait.
pub trait FieldResolver: Send + Sync + 'static {
    fn resolve(&self, parent: &JsonMap, arguments: &JsonMap) -> Result<JsonValue, BoxError>;
}

impl<F> FieldResolver for F
where
    F: Fn(&JsonMap, &JsonMap) -> Result<JsonValue, BoxError> + Send + Sync + 'static,
{
    fn resolve(&self, parent: &JsonMap, arguments: &JsonMap) -> Result<JsonValue, BoxError> {
        self(parent, arguments)
    }
}

/// Resolves entities one representation at a time.
pub trait EntityResolver: Send + Sync + 'static {
    fn resolve_entity(&self, representation: &Representation) -> Result<JsonMap, BoxError>;
}

impl<F> EntityResolver for F
where
    F: Fn(&Representation) -> Result<JsonMap, BoxError> + Send + Sync + 'static,
{
    fn resolve_entity(&self, representation: &Representation) -> Result<JsonMap, BoxError> {
        self(representation)
    }
}

/// Resolves all the representations of an `_entities` call at once.
///
/// The returned list must have one result per representation, in the same order. An `Err`
/// for the whole batch fails every representation passed in.
pub trait BatchEntityResolver: Send + Sync + 'static {
    fn resolve_entities(
        &self,
        representations: &[Representation],
    ) -> Result<Vec<Result<JsonMap, BoxError>>, BoxError>;
}

impl<F> BatchEntityResolver for F
where
    F: Fn(&[Representation]) -> Result<Vec<Result<JsonMap, BoxError>>, BoxError>
        + Send
        + Sync
        + 'static,
{
    fn resolve_entities(
        &self,
        representations: &[Representation],
    ) -> Result<Vec<Result<JsonMap, BoxError>>, BoxError> {
        self(representations)
    }
}

/// The registered entity resolver. Only one kind can be registered at a time.
#[derive(Clone)]
pub(crate) enum EntityResolverKind {
    Single(Arc<dyn EntityResolver>),
    Batch(Arc<dyn BatchEntityResolver>),
}

impl EntityResolverKind {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            EntityResolverKind::Single(_) => "single",
            EntityResolverKind::Batch(_) => "batch",
        }
    }
}

/// Field resolvers keyed by type name, then field name.
#[derive(Clone, Default)]
pub(crate) struct FieldResolvers {
    by_type: HashMap<String, HashMap<String, Arc<dyn FieldResolver>>>,
}

impl FieldResolvers {
    pub(crate) fn get(&self, type_name: &str, field_name: &str) -> Option<&Arc<dyn FieldResolver>> {
        self.by_type.get(type_name)?.get(field_name)
    }

    pub(crate) fn insert(
        &mut self,
        type_name: &str,
        field_name: &str,
        resolver: Arc<dyn FieldResolver>,
    ) -> Option<Arc<dyn FieldResolver>> {
        self.by_type
            .entry(type_name.to_string())
            .or_default()
            .insert(field_name.to_string(), resolver)
    }
}

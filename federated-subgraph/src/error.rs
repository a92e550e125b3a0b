//! Federation errors.
use displaydoc::Display;
use thiserror::Error;

/// Boxed error returned by host resolver callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while building a subgraph schema or serving a call against it.
///
/// Build-time shape problems ([`FederationError::InvalidDirectiveShape`],
/// [`FederationError::NoEntityTypesFound`]) are logged and degrade to an empty result;
/// they are only returned by the lower-level extraction functions.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FederationError {
    /// invalid @key directive on type '{type_name}': {message}
    InvalidDirectiveShape {
        /// The type carrying the malformed directive.
        type_name: String,
        /// What is wrong with it.
        message: String,
    },

    /// no entity types found
    NoEntityTypesFound,

    /// invalid representations: {message}
    InvalidRepresentations {
        /// Why the `representations` argument was rejected.
        message: String,
    },

    /// could not assemble subgraph schema: {message}
    SchemaAssembly {
        /// Validation diagnostics of the assembled schema.
        message: String,
    },

    /// invalid GraphQL: {message}
    InvalidGraphQL { message: String },

    /// an entity resolver of another kind is already registered ({registered})
    ConflictingEntityResolvers {
        /// Kind of the resolver already in place.
        registered: &'static str,
    },

    /// no entity resolver registered
    MissingEntityResolver,

    /// the subgraph schema has not been built yet
    NotBuilt,
}

impl FederationError {
    pub fn extension_code(&self) -> &'static str {
        match self {
            FederationError::InvalidDirectiveShape { .. } => "INVALID_DIRECTIVE_SHAPE",
            FederationError::NoEntityTypesFound => "NO_ENTITY_TYPES_FOUND",
            FederationError::InvalidRepresentations { .. } => "INVALID_REPRESENTATIONS",
            FederationError::SchemaAssembly { .. } => "SCHEMA_ASSEMBLY_ERROR",
            FederationError::InvalidGraphQL { .. } => "INVALID_GRAPHQL",
            FederationError::ConflictingEntityResolvers { .. } => "CONFLICTING_ENTITY_RESOLVERS",
            FederationError::MissingEntityResolver => "MISSING_ENTITY_RESOLVER",
            FederationError::NotBuilt => "SUBGRAPH_NOT_BUILT",
        }
    }
}

/// Failure to resolve one representation of an `_entities` call.
///
/// These never abort the sibling representations of the same call.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EntityError {
    /// representation has no string '__typename'
    MissingTypename,

    /// '{type_name}' is not an entity type of this subgraph
    UnknownEntityType { type_name: String },

    /// representation of '{type_name}' has no key fields
    MissingKeyFields { type_name: String },

    /// key field '{field}' does not exist on type '{type_name}'
    KeyFieldNotFound { type_name: String, field: String },

    /// key field '{field}' of '{type_name}' must be a string, an integer or a float
    AmbiguousKeyValueType { type_name: String, field: String },

    /// could not resolve '{type_name}' entity: {message}
    ResolverFailed { type_name: String, message: String },

    /// batch entity resolver returned {actual} results for {expected} representations
    BatchLengthMismatch { expected: usize, actual: usize },
}

impl EntityError {
    pub fn extension_code(&self) -> &'static str {
        match self {
            EntityError::MissingTypename => "MISSING_TYPENAME",
            EntityError::UnknownEntityType { .. } => "UNKNOWN_ENTITY_TYPE",
            EntityError::MissingKeyFields { .. } => "MISSING_KEY_FIELDS",
            EntityError::KeyFieldNotFound { .. } => "KEY_FIELD_NOT_FOUND",
            EntityError::AmbiguousKeyValueType { .. } => "AMBIGUOUS_KEY_VALUE_TYPE",
            EntityError::ResolverFailed { .. } => "ENTITY_RESOLVER_FAILED",
            EntityError::BatchLengthMismatch { .. } => "BATCH_LENGTH_MISMATCH",
        }
    }
}

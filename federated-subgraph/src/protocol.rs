//! Names and fixed definitions of the federation subgraph protocol.

use apollo_compiler::Name;
use apollo_compiler::name;

pub const ENTITY_UNION_NAME: Name = name!("_Entity");
pub const ANY_SCALAR_NAME: Name = name!("_Any");
pub const FIELDSET_SCALAR_NAME: Name = name!("_FieldSet");
pub const SERVICE_TYPE: Name = name!("_Service");

pub const ENTITIES_QUERY: Name = name!("_entities");
pub const SERVICE_SDL_QUERY: Name = name!("_service");
pub const REPRESENTATIONS_ARGUMENT: Name = name!("representations");
pub const SDL_FIELD: Name = name!("sdl");

pub const QUERY_TYPE: Name = name!("Query");
pub const MUTATION_TYPE: Name = name!("Mutation");

pub const KEY_DIRECTIVE_NAME: Name = name!("key");
pub const EXTERNAL_DIRECTIVE_NAME: Name = name!("external");
pub const REQUIRES_DIRECTIVE_NAME: Name = name!("requires");
pub const PROVIDES_DIRECTIVE_NAME: Name = name!("provides");
pub const EXTENDS_DIRECTIVE_NAME: Name = name!("extends");
pub const FIELDS_ARGUMENT_NAME: Name = name!("fields");

pub const TYPENAME_FIELD: &str = "__typename";

/// Directives declared by [`FEDERATION_PREAMBLE`].
pub const FEDERATION_DIRECTIVE_NAMES: [Name; 5] = [
    EXTERNAL_DIRECTIVE_NAME,
    REQUIRES_DIRECTIVE_NAME,
    PROVIDES_DIRECTIVE_NAME,
    KEY_DIRECTIVE_NAME,
    EXTENDS_DIRECTIVE_NAME,
];

/// Types the subgraph schema owns on behalf of the protocol.
pub const FEDERATION_TYPE_NAMES: [Name; 4] = [
    ANY_SCALAR_NAME,
    FIELDSET_SCALAR_NAME,
    SERVICE_TYPE,
    ENTITY_UNION_NAME,
];

pub(crate) const BUILT_IN_SCALAR_NAMES: [&str; 5] = ["String", "Int", "Float", "Boolean", "ID"];

pub(crate) const BUILT_IN_DIRECTIVE_NAMES: [&str; 7] = [
    "skip",
    "include",
    "deprecated",
    "specifiedBy",
    "oneOf",
    "defer",
    "stream",
];

/// Appended verbatim to every rendered subgraph SDL.
pub const FEDERATION_PREAMBLE: &str = r#"#### Apollo Federation ####

scalar _Any
scalar _FieldSet

directive @external on FIELD_DEFINITION
directive @requires(fields: _FieldSet!) on FIELD_DEFINITION
directive @provides(fields: _FieldSet!) on FIELD_DEFINITION
directive @key(fields: _FieldSet!) repeatable on OBJECT | INTERFACE

# this is an optional directive discussed below
directive @extends on OBJECT | INTERFACE
"#;

pub(crate) const SERVICE_TYPE_DEFINITION: &str = r#"
type _Service {
  sdl: String
}
"#;

pub(crate) fn is_built_in_scalar(name: &str) -> bool {
    BUILT_IN_SCALAR_NAMES.contains(&name)
}

pub(crate) fn is_built_in_directive(name: &str) -> bool {
    BUILT_IN_DIRECTIVE_NAMES.contains(&name)
}

pub(crate) fn is_federation_directive(name: &str) -> bool {
    FEDERATION_DIRECTIVE_NAMES.iter().any(|n| n.as_str() == name)
}

pub(crate) fn is_federation_type(name: &str) -> bool {
    FEDERATION_TYPE_NAMES.iter().any(|n| n.as_str() == name)
}

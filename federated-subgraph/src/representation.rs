//! Resolution of the `representations` argument of `_entities`.
//!
//! The argument is validated as a whole first: anything other than a list of objects fails
//! the call. After that every representation succeeds or fails on its own, and the result
//! always has one entry per representation, in input order.
use std::fmt;

use apollo_compiler::Name;
use apollo_compiler::Schema;
use apollo_compiler::response::JsonMap;
use apollo_compiler::response::JsonValue;
use apollo_compiler::schema::ExtendedType;

use crate::entity::EntityUnion;
use crate::error::EntityError;
use crate::error::FederationError;
use crate::protocol::TYPENAME_FIELD;
use crate::resolvers::BatchEntityResolver;
use crate::resolvers::EntityResolverKind;

/// A key field value.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyValue {
    Str(String),
    Int(i64),
    Float(f64),
}

impl KeyValue {
    /// `None` for anything that is not a string, a 64-bit integer or a 64-bit float.
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::String(string) => Some(KeyValue::Str(string.as_str().to_string())),
            JsonValue::Number(number) => {
                if let Some(int) = number.as_i64() {
                    Some(KeyValue::Int(int))
                } else if number.is_f64() {
                    number.as_f64().map(KeyValue::Float)
                } else {
                    // u64 beyond i64::MAX
                    None
                }
            }
            _ => None,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            KeyValue::Str(string) => JsonValue::from(string.as_str()),
            KeyValue::Int(int) => JsonValue::from(*int),
            KeyValue::Float(float) => JsonValue::from(*float),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            KeyValue::Str(string) => Some(string),
            _ => None,
        }
    }

    /// Whether `value` holds the same key, comparing numbers across int and float.
    pub fn matches(&self, value: &JsonValue) -> bool {
        match (self, KeyValue::from_json(value)) {
            (KeyValue::Str(a), Some(KeyValue::Str(b))) => *a == b,
            (KeyValue::Int(a), Some(KeyValue::Int(b))) => *a == b,
            (KeyValue::Float(a), Some(KeyValue::Float(b))) => *a == b,
            (KeyValue::Int(a), Some(KeyValue::Float(b))) => (*a as f64) == b,
            (KeyValue::Float(a), Some(KeyValue::Int(b))) => *a == (b as f64),
            _ => false,
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Str(string) => f.write_str(string),
            KeyValue::Int(int) => write!(f, "{int}"),
            KeyValue::Float(float) => write!(f, "{float}"),
        }
    }
}

/// A reference to one entity: its typename plus its key fields, in the order they were sent.
#[derive(Debug, Clone, PartialEq)]
pub struct Representation {
    pub type_name: Name,
    pub keys: Vec<(String, KeyValue)>,
}

impl Representation {
    /// The first key field. Enough for types keyed by a single field.
    pub fn primary_key(&self) -> Option<(&str, &KeyValue)> {
        self.keys.first().map(|(name, value)| (name.as_str(), value))
    }

    pub fn key(&self, name: &str) -> Option<&KeyValue> {
        self.keys
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Whether every key field has the same value in `object`.
    pub fn matches(&self, object: &JsonMap) -> bool {
        self.keys.iter().all(|(name, value)| {
            object
                .get(name.as_str())
                .is_some_and(|candidate| value.matches(candidate))
        })
    }
}

/// A resolved entity, tagged with the concrete type it was requested as.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub type_name: Name,
    pub data: JsonMap,
}

/// Checks the shape of the whole `representations` argument.
///
/// Each item must be an object, or a string holding a JSON-encoded object.
pub fn parse_representations(representations: &JsonValue) -> Result<Vec<JsonMap>, FederationError> {
    let invalid = |message: String| FederationError::InvalidRepresentations { message };
    let items = representations
        .as_array()
        .ok_or_else(|| invalid("expected a list of representations".to_string()))?;
    items
        .iter()
        .enumerate()
        .map(|(index, item)| match item {
            JsonValue::Object(object) => Ok(object.clone()),
            JsonValue::String(encoded) => {
                match serde_json::from_str::<JsonValue>(encoded.as_str()) {
                    Ok(JsonValue::Object(object)) => Ok(object),
                    _ => Err(invalid(format!(
                        "representation {index} is a string but does not encode an object"
                    ))),
                }
            }
            _ => Err(invalid(format!("representation {index} is not an object"))),
        })
        .collect()
}

/// Turns one representation object into a typed [`Representation`].
pub(crate) fn extract_representation(
    schema: &Schema,
    entities: &EntityUnion,
    object: &JsonMap,
) -> Result<Representation, EntityError> {
    let type_name = object
        .get(TYPENAME_FIELD)
        .and_then(|value| value.as_str())
        .ok_or(EntityError::MissingTypename)?;
    let entity_type = entities
        .member(type_name)
        .ok_or_else(|| EntityError::UnknownEntityType {
            type_name: type_name.to_string(),
        })?;
    let fields = match schema.types.get(&entity_type.name) {
        Some(ExtendedType::Object(object_type)) => &object_type.fields,
        _ => {
            return Err(EntityError::UnknownEntityType {
                type_name: type_name.to_string(),
            })
        }
    };

    let mut keys = Vec::with_capacity(object.len().saturating_sub(1));
    for (name, value) in object.iter() {
        let name = name.as_str();
        if name == TYPENAME_FIELD {
            continue;
        }
        if !fields.contains_key(name) {
            return Err(EntityError::KeyFieldNotFound {
                type_name: type_name.to_string(),
                field: name.to_string(),
            });
        }
        let value = KeyValue::from_json(value).ok_or_else(|| EntityError::AmbiguousKeyValueType {
            type_name: type_name.to_string(),
            field: name.to_string(),
        })?;
        keys.push((name.to_string(), value));
    }
    if keys.is_empty() {
        return Err(EntityError::MissingKeyFields {
            type_name: type_name.to_string(),
        });
    }
    Ok(Representation {
        type_name: entity_type.name.clone(),
        keys,
    })
}

/// Resolves every representation through `resolver`.
///
/// Only a malformed argument or a missing resolver fail the whole call.
pub(crate) fn resolve_representations(
    schema: &Schema,
    entities: &EntityUnion,
    resolver: Option<&EntityResolverKind>,
    representations: &JsonValue,
) -> Result<Vec<Result<Entity, EntityError>>, FederationError> {
    let objects = parse_representations(representations)?;
    let resolver = resolver.ok_or(FederationError::MissingEntityResolver)?;
    let extracted: Vec<Result<Representation, EntityError>> = objects
        .iter()
        .map(|object| extract_representation(schema, entities, object))
        .collect();
    tracing::debug!(
        representations = extracted.len(),
        resolver = resolver.kind(),
        "resolving entities"
    );

    let resolved = match resolver {
        EntityResolverKind::Single(resolver) => extracted
            .into_iter()
            .map(|representation| {
                let representation = representation?;
                let data = resolver
                    .resolve_entity(&representation)
                    .map_err(|error| resolver_failed(&representation, error.to_string()))?;
                Ok(Entity {
                    type_name: representation.type_name,
                    data,
                })
            })
            .collect(),
        EntityResolverKind::Batch(resolver) => resolve_batch(resolver.as_ref(), extracted),
    };
    Ok(resolved)
}

fn resolve_batch(
    resolver: &dyn BatchEntityResolver,
    extracted: Vec<Result<Representation, EntityError>>,
) -> Vec<Result<Entity, EntityError>> {
    let valid: Vec<Representation> = extracted
        .iter()
        .filter_map(|representation| representation.as_ref().ok().cloned())
        .collect();
    let expected = valid.len();
    let results: Vec<Result<JsonMap, EntityError>> = if valid.is_empty() {
        Vec::new()
    } else {
        match resolver.resolve_entities(&valid) {
            Ok(results) if results.len() == expected => results
                .into_iter()
                .zip(&valid)
                .map(|(result, representation)| {
                    result.map_err(|error| resolver_failed(representation, error.to_string()))
                })
                .collect(),
            Ok(results) => {
                let error = EntityError::BatchLengthMismatch {
                    expected,
                    actual: results.len(),
                };
                tracing::warn!(%error, "discarding batch entity results");
                vec![Err(error); expected]
            }
            Err(error) => {
                let message = error.to_string();
                valid
                    .iter()
                    .map(|representation| Err(resolver_failed(representation, message.clone())))
                    .collect()
            }
        }
    };

    let mut results = results.into_iter();
    extracted
        .into_iter()
        .map(|representation| {
            let representation = representation?;
            let data = match results.next() {
                Some(result) => result?,
                None => {
                    return Err(EntityError::BatchLengthMismatch {
                        expected,
                        actual: 0,
                    })
                }
            };
            Ok(Entity {
                type_name: representation.type_name,
                data,
            })
        })
        .collect()
}

fn resolver_failed(representation: &Representation, message: String) -> EntityError {
    EntityError::ResolverFailed {
        type_name: representation.type_name.to_string(),
        message,
    }
}

//! The `_Entity` union over every discovered type that carries a `@key`.
use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::collections::IndexMap;
use apollo_compiler::schema::ComponentName;
use apollo_compiler::schema::ObjectType;
use apollo_compiler::schema::UnionType;

use crate::error::FederationError;
use crate::keys::key_field_names;
use crate::keys::key_field_sets_or_empty;
use crate::protocol::ENTITY_UNION_NAME;
use crate::protocol::TYPENAME_FIELD;

/// One member of the entity union.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityType {
    pub name: Name,
    /// Verbatim `fields` of each `@key`, in declaration order.
    pub key_field_sets: Vec<String>,
}

/// Members are sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityUnion {
    members: Vec<EntityType>,
}

impl EntityUnion {
    pub fn members(&self) -> &[EntityType] {
        &self.members
    }

    pub fn member(&self, type_name: &str) -> Option<&EntityType> {
        self.members
            .binary_search_by(|member| member.name.as_str().cmp(type_name))
            .ok()
            .map(|index| &self.members[index])
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn member_names(&self) -> impl Iterator<Item = &Name> {
        self.members.iter().map(|member| &member.name)
    }

    /// `union _Entity = A | B`, or `None` when there are no entities.
    pub(crate) fn to_union_type(&self) -> Option<Node<UnionType>> {
        if self.members.is_empty() {
            return None;
        }
        Some(Node::new(UnionType {
            description: None,
            name: ENTITY_UNION_NAME,
            directives: Default::default(),
            members: self
                .member_names()
                .map(|name| ComponentName::from(name.clone()))
                .collect(),
        }))
    }
}

/// Filters `objects` down to the types carrying at least one well-formed `@key`.
///
/// Zero entities is reported as [`FederationError::NoEntityTypesFound`].
pub fn try_build_entity_union(
    objects: &IndexMap<Name, Node<ObjectType>>,
) -> Result<EntityUnion, FederationError> {
    let mut members: Vec<EntityType> = objects
        .values()
        .filter_map(|object| {
            let key_field_sets = key_field_sets_or_empty(&object.name, &object.directives);
            if key_field_sets.is_empty() {
                return None;
            }
            warn_on_undefined_key_fields(object, &key_field_sets);
            Some(EntityType {
                name: object.name.clone(),
                key_field_sets,
            })
        })
        .collect();
    if members.is_empty() {
        return Err(FederationError::NoEntityTypesFound);
    }
    members.sort_by(|a, b| a.name.as_str().cmp(b.name.as_str()));
    members.dedup_by(|a, b| a.name == b.name);
    Ok(EntityUnion { members })
}

/// Same as [`try_build_entity_union`], except that a subgraph without entities is legal and
/// only logged.
pub fn build_entity_union(objects: &IndexMap<Name, Node<ObjectType>>) -> EntityUnion {
    try_build_entity_union(objects).unwrap_or_else(|error| {
        tracing::warn!(%error, "subgraph has no entity types");
        EntityUnion::default()
    })
}

fn warn_on_undefined_key_fields(object: &ObjectType, key_field_sets: &[String]) {
    for field_set in key_field_sets {
        for field in key_field_names(field_set) {
            if field != TYPENAME_FIELD && !object.fields.contains_key(field) {
                tracing::warn!(
                    type_name = %object.name,
                    key = %field_set,
                    "key field '{field}' is not a field of the type"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use apollo_compiler::Schema;
    use apollo_compiler::schema::ExtendedType;
    use pretty_assertions::assert_eq;

    use super::*;

    fn objects(sdl: &str) -> IndexMap<Name, Node<ObjectType>> {
        let schema = Schema::parse(sdl, "entity.graphql").unwrap();
        schema
            .types
            .iter()
            .filter_map(|(name, ty)| match ty {
                ExtendedType::Object(object) => Some((name.clone(), object.clone())),
                _ => None,
            })
            .collect()
    }

    const DEFINITIONS: &str = "directive @key(fields: String) repeatable on OBJECT\n";

    #[test]
    fn members_are_keyed_types_sorted_by_name() {
        let objects = objects(&format!(
            r#"{DEFINITIONS}
            type Query {{ a: Int }}
            type Zebra @key(fields: "id") {{ id: ID }}
            type Address {{ street: String }}
            type Account @key(fields: "id") @key(fields: "email") {{ id: ID email: String }}
            "#
        ));
        let union = build_entity_union(&objects);
        let names: Vec<&str> = union.member_names().map(|name| name.as_str()).collect();
        assert_eq!(names, vec!["Account", "Zebra"]);
        assert_eq!(
            union.member("Account").map(|member| member.key_field_sets.clone()),
            Some(vec!["id".to_string(), "email".to_string()])
        );
        assert!(union.member("Address").is_none());
        assert!(union.member("Query").is_none());

        let union_type = union.to_union_type().unwrap();
        let members: Vec<&str> = union_type.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(members, vec!["Account", "Zebra"]);
    }

    #[test]
    fn no_entities_is_a_diagnostic_not_a_failure() {
        let objects = objects("type Query { a: Int } type Address { street: String }");
        assert_eq!(
            try_build_entity_union(&objects),
            Err(FederationError::NoEntityTypesFound)
        );
        let union = build_entity_union(&objects);
        assert!(union.is_empty());
        assert!(union.to_union_type().is_none());
    }

    #[test]
    fn malformed_key_excludes_the_type() {
        let objects = objects(&format!(
            r#"{DEFINITIONS}
            type Query {{ a: Int }}
            type User @key(fields: 1) {{ id: ID }}
            type Product @key(fields: "upc") {{ upc: String }}
            "#
        ));
        let union = build_entity_union(&objects);
        let names: Vec<&str> = union.member_names().map(|name| name.as_str()).collect();
        assert_eq!(names, vec!["Product"]);
    }
}

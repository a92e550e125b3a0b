//! Discovery of the named types reachable from a set of root object types.
use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::Schema;
use apollo_compiler::collections::IndexMap;
use apollo_compiler::collections::IndexSet;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::schema::InputValueDefinition;
use apollo_compiler::schema::InterfaceType;
use apollo_compiler::schema::ObjectType;

use crate::protocol::is_built_in_scalar;

/// Object types and interfaces discovered by walking field types.
///
/// Maps keep discovery order. Anything emitted externally must be sorted by name first.
#[derive(Debug, Clone, Default)]
pub struct TypeGraph {
    pub objects: IndexMap<Name, Node<ObjectType>>,
    pub interfaces: IndexMap<Name, Node<InterfaceType>>,
    /// Enums, custom scalars, unions and input objects referenced by the walked fields.
    /// They are recorded, never descended into (input objects excepted).
    pub leaf_types: IndexMap<Name, ExtendedType>,
}

impl TypeGraph {
    /// Walks depth first from every root, looking named types up in `types`.
    ///
    /// Declared interfaces are recorded for every visited object, roots included. A root is
    /// only recorded as an object when `include_roots` is set. Objects already present are
    /// not descended into again, which terminates self- and mutually-referential types.
    /// Fields typed as interfaces or unions are not expanded into their implementations.
    pub fn walk(&mut self, types: &Schema, roots: &[Node<ObjectType>], include_roots: bool) {
        let mut seen_roots: IndexSet<Name> = IndexSet::default();
        let mut stack: Vec<(Node<ObjectType>, bool)> =
            roots.iter().rev().map(|root| (root.clone(), true)).collect();

        while let Some((object, is_root)) = stack.pop() {
            self.record_interfaces(types, &object);
            if self.objects.contains_key(&object.name) {
                continue;
            }
            if is_root && !include_roots {
                if !seen_roots.insert(object.name.clone()) {
                    continue;
                }
            } else {
                self.objects.insert(object.name.clone(), object.clone());
            }

            // Pushed in reverse so that fields are visited in declaration order.
            for field in object.fields.values().rev() {
                self.record_arguments(types, &field.arguments);
                let inner = field.ty.inner_named_type();
                if is_built_in_scalar(inner) {
                    continue;
                }
                match types.types.get(inner) {
                    Some(ExtendedType::Object(child)) => {
                        if !self.objects.contains_key(inner) {
                            stack.push((child.clone(), false));
                        }
                    }
                    // reached through a field, not through `implements`
                    Some(ExtendedType::Interface(_)) => {}
                    Some(other) => self.record_leaf(types, inner, other),
                    None => {
                        tracing::warn!(
                            type_name = %object.name,
                            field = %field.name,
                            "field type '{inner}' is not defined"
                        );
                    }
                }
            }
        }
    }

    /// Discovers every type reachable from `roots`, roots included.
    pub fn from_roots(types: &Schema, roots: &[Node<ObjectType>]) -> Self {
        let mut graph = Self::default();
        graph.walk(types, roots, true);
        graph
    }

    fn record_interfaces(&mut self, types: &Schema, object: &ObjectType) {
        for interface in &object.implements_interfaces {
            if self.interfaces.contains_key(&interface.name) {
                continue;
            }
            match types.types.get(&interface.name) {
                Some(ExtendedType::Interface(definition)) => {
                    self.interfaces
                        .insert(interface.name.clone(), definition.clone());
                }
                _ => {
                    tracing::warn!(
                        type_name = %object.name,
                        "implemented interface '{}' is not defined",
                        interface.name
                    );
                }
            }
        }
    }

    fn record_arguments(&mut self, types: &Schema, arguments: &[Node<InputValueDefinition>]) {
        for argument in arguments {
            let inner = argument.ty.inner_named_type();
            if is_built_in_scalar(inner) {
                continue;
            }
            if let Some(definition) = types.types.get(inner) {
                self.record_leaf(types, inner, definition);
            }
        }
    }

    fn record_leaf(&mut self, types: &Schema, name: &Name, definition: &ExtendedType) {
        if self.leaf_types.contains_key(name) {
            return;
        }
        self.leaf_types.insert(name.clone(), definition.clone());
        if let ExtendedType::InputObject(input) = definition {
            for field in input.fields.values() {
                let inner = field.ty.inner_named_type();
                if is_built_in_scalar(inner) {
                    continue;
                }
                if let Some(nested) = types.types.get(inner) {
                    self.record_leaf(types, inner, nested);
                }
            }
        }
    }
}

/// Returns the object types named by the given root fields, in field order.
///
/// List and non-null wrappers are unwrapped. Fields whose innermost type is not an object
/// do not seed the walk.
pub(crate) fn object_types_of_fields<'a>(
    types: &Schema,
    field_types: impl IntoIterator<Item = &'a Name>,
) -> Vec<Node<ObjectType>> {
    let mut seen: IndexSet<&Name> = IndexSet::default();
    field_types
        .into_iter()
        .filter(|name| seen.insert(*name))
        .filter_map(|name| match types.types.get(name) {
            Some(ExtendedType::Object(object)) => Some(object.clone()),
            _ => None,
        })
        .collect()
}

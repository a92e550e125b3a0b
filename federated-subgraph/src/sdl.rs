//! Canonical SDL rendering of a subgraph schema.
//!
//! Output is a deterministic function of the schema: types and fields are sorted by name,
//! whatever order they were declared or discovered in.
use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;

use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::Schema;
use apollo_compiler::ast;
use apollo_compiler::ast::Type;
use apollo_compiler::ast::Value;
use apollo_compiler::collections::IndexMap;
use apollo_compiler::collections::IndexSet;
use apollo_compiler::schema::Component;
use apollo_compiler::schema::ComponentName;
use apollo_compiler::schema::DirectiveDefinition;
use apollo_compiler::schema::EnumType;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::schema::FieldDefinition;
use apollo_compiler::schema::InputObjectType;
use apollo_compiler::schema::InputValueDefinition;
use apollo_compiler::schema::InterfaceType;
use apollo_compiler::schema::ObjectType;
use apollo_compiler::schema::UnionType;
use itertools::Itertools;

use crate::entity::EntityUnion;
use crate::keys::key_field_sets_or_empty;
use crate::protocol::ENTITIES_QUERY;
use crate::protocol::ENTITY_UNION_NAME;
use crate::protocol::EXTENDS_DIRECTIVE_NAME;
use crate::protocol::EXTERNAL_DIRECTIVE_NAME;
use crate::protocol::FEDERATION_PREAMBLE;
use crate::protocol::FIELDS_ARGUMENT_NAME;
use crate::protocol::PROVIDES_DIRECTIVE_NAME;
use crate::protocol::REQUIRES_DIRECTIVE_NAME;
use crate::protocol::SERVICE_SDL_QUERY;
use crate::protocol::is_built_in_directive;
use crate::protocol::is_federation_directive;
use crate::protocol::is_federation_type;
use crate::walker::TypeGraph;

const MAX_LINE_LENGTH: usize = 80;

/// Renders `schema` as the SDL a gateway fetches through `_service { sdl }`.
///
/// Sections come in a fixed order: the entity union, directive definitions, interfaces,
/// object types, other referenced types, `Query`, `Mutation` (only when it has fields) and
/// finally the federation preamble.
pub fn print_sdl(schema: &Schema, entities: &EntityUnion) -> String {
    SubgraphSdl::new(schema, entities).to_string()
}

struct SubgraphSdl<'a> {
    schema: &'a Schema,
    entities: &'a EntityUnion,
    graph: TypeGraph,
    query: Option<Node<ObjectType>>,
    mutation: Option<Node<ObjectType>>,
}

impl<'a> SubgraphSdl<'a> {
    fn new(schema: &'a Schema, entities: &'a EntityUnion) -> Self {
        let root = |name: Option<&ComponentName>| {
            match name.and_then(|n| schema.types.get(&n.name)) {
                Some(ExtendedType::Object(object)) => Some(object.clone()),
                _ => None,
            }
        };
        let query = root(schema.schema_definition.query.as_ref());
        let mutation = root(schema.schema_definition.mutation.as_ref());

        // Everything is discovered before anything is printed, so that interfaces only
        // reachable from the roots are not missed.
        let entity_objects: Vec<Node<ObjectType>> = entities
            .member_names()
            .filter_map(|name| match schema.types.get(name) {
                Some(ExtendedType::Object(object)) => Some(object.clone()),
                _ => None,
            })
            .collect();
        let mut graph = TypeGraph::default();
        graph.walk(schema, &entity_objects, true);
        let roots: Vec<Node<ObjectType>> =
            query.iter().chain(mutation.iter()).cloned().collect();
        graph.walk(schema, &roots, false);
        walk_union_members(schema, &mut graph);

        Self {
            schema,
            entities,
            graph,
            query,
            mutation,
        }
    }

    fn is_root(&self, name: &str) -> bool {
        self.query.iter().chain(self.mutation.iter()).any(|root| root.name == name)
    }
}

/// Walks from the members of every recorded union until no new union turns up, so that the
/// printed SDL defines each type a union names.
fn walk_union_members(schema: &Schema, graph: &mut TypeGraph) {
    let mut expanded: IndexSet<Name> = IndexSet::default();
    loop {
        let members: Vec<Node<ObjectType>> = graph
            .leaf_types
            .iter()
            .filter_map(|(name, definition)| match definition {
                ExtendedType::Union(union) if expanded.insert(name.clone()) => Some(union),
                _ => None,
            })
            .flat_map(|union| union.members.iter())
            .filter(|member| !graph.objects.contains_key(&member.name))
            .filter_map(|member| match schema.types.get(&member.name) {
                Some(ExtendedType::Object(object)) => Some(object.clone()),
                _ => None,
            })
            .collect();
        if members.is_empty() {
            return;
        }
        graph.walk(schema, &members, true);
    }
}

impl Display for SubgraphSdl<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if !self.entities.is_empty() {
            writeln!(
                f,
                "union {ENTITY_UNION_NAME} = {}\n",
                self.entities.member_names().join(" | ")
            )?;
        }

        for (_, definition) in sorted_by_name(&self.schema.directive_definitions) {
            let name = &definition.name;
            if is_built_in_directive(name) || is_federation_directive(name) {
                continue;
            }
            write_directive_definition(f, definition)?;
        }

        for (_, interface) in sorted_by_name(&self.graph.interfaces) {
            write_interface(f, interface)?;
        }

        for (name, object) in sorted_by_name(&self.graph.objects) {
            if self.is_root(name) || is_federation_type(name) {
                continue;
            }
            write_object(f, object)?;
        }

        for (name, definition) in sorted_by_name(&self.graph.leaf_types) {
            if is_federation_type(name) {
                continue;
            }
            write_leaf_type(f, definition)?;
        }

        match &self.query {
            Some(query) => write_root(f, query)?,
            None => writeln!(f, "type Query {{\n}}\n")?,
        }
        if let Some(mutation) = &self.mutation {
            if !mutation.fields.is_empty() {
                write_root(f, mutation)?;
            }
        }

        f.write_str(FEDERATION_PREAMBLE)
    }
}

fn sorted_by_name<V>(map: &IndexMap<Name, V>) -> Vec<(&Name, &V)> {
    map.iter()
        .sorted_by(|(a, _), (b, _)| a.as_str().cmp(b.as_str()))
        .collect()
}

fn sorted_fields<V>(fields: &IndexMap<Name, V>) -> impl Iterator<Item = &V> {
    sorted_by_name(fields).into_iter().map(|(_, field)| field)
}

fn write_directive_definition(
    f: &mut Formatter<'_>,
    definition: &DirectiveDefinition,
) -> fmt::Result {
    write_description(f, definition.description.as_deref(), 0)?;
    write!(f, "directive @{}", definition.name)?;
    if !definition.arguments.is_empty() {
        write!(f, "(")?;
        write_arguments(f, &definition.arguments)?;
        write!(f, ")")?;
    }
    if definition.repeatable {
        write!(f, " repeatable")?;
    }
    writeln!(
        f,
        " on {}\n",
        definition
            .locations
            .iter()
            .map(|location| location.name())
            .join(" | ")
    )
}

fn write_interface(f: &mut Formatter<'_>, interface: &InterfaceType) -> fmt::Result {
    write_description(f, interface.description.as_deref(), 0)?;
    write!(f, "interface {}", interface.name)?;
    write_implements(f, interface.implements_interfaces.iter())?;
    writeln!(f, " {{")?;
    for field in sorted_fields(&interface.fields) {
        write_field(f, field)?;
    }
    writeln!(f, "}}\n")
}

fn write_object(f: &mut Formatter<'_>, object: &ObjectType) -> fmt::Result {
    write_description(f, object.description.as_deref(), 0)?;
    write!(f, "type {}", object.name)?;
    write_implements(f, object.implements_interfaces.iter())?;
    if object.directives.has(&EXTENDS_DIRECTIVE_NAME) {
        write!(f, " @{EXTENDS_DIRECTIVE_NAME}")?;
    }
    for field_set in key_field_sets_or_empty(&object.name, &object.directives) {
        write!(f, " @key(fields: {})", string_literal(&field_set))?;
    }
    writeln!(f, " {{")?;
    for field in sorted_fields(&object.fields) {
        write_field(f, field)?;
    }
    writeln!(f, "}}\n")
}

fn write_root(f: &mut Formatter<'_>, root: &ObjectType) -> fmt::Result {
    write_description(f, root.description.as_deref(), 0)?;
    writeln!(f, "type {} {{", root.name)?;
    for field in sorted_fields(&root.fields) {
        if field.name == ENTITIES_QUERY || field.name == SERVICE_SDL_QUERY {
            continue;
        }
        write_field(f, field)?;
    }
    writeln!(f, "}}\n")
}

fn write_leaf_type(f: &mut Formatter<'_>, definition: &ExtendedType) -> fmt::Result {
    match definition {
        ExtendedType::Scalar(scalar) => {
            write_description(f, scalar.description.as_deref(), 0)?;
            writeln!(f, "scalar {}\n", scalar.name)
        }
        ExtendedType::Enum(enum_type) => write_enum(f, enum_type),
        ExtendedType::Union(union_type) => write_union(f, union_type),
        ExtendedType::InputObject(input) => write_input_object(f, input),
        ExtendedType::Object(_) | ExtendedType::Interface(_) => Ok(()),
    }
}

fn write_enum(f: &mut Formatter<'_>, enum_type: &EnumType) -> fmt::Result {
    write_description(f, enum_type.description.as_deref(), 0)?;
    writeln!(f, "enum {} {{", enum_type.name)?;
    // value order is meaningful for enums
    for value in enum_type.values.values() {
        write_description(f, value.description.as_deref(), 2)?;
        writeln!(f, "  {}", value.value)?;
    }
    writeln!(f, "}}\n")
}

fn write_union(f: &mut Formatter<'_>, union_type: &UnionType) -> fmt::Result {
    write_description(f, union_type.description.as_deref(), 0)?;
    writeln!(
        f,
        "union {} = {}\n",
        union_type.name,
        union_type.members.iter().map(|member| &member.name).join(" | ")
    )
}

fn write_input_object(f: &mut Formatter<'_>, input: &InputObjectType) -> fmt::Result {
    write_description(f, input.description.as_deref(), 0)?;
    writeln!(f, "input {} {{", input.name)?;
    for field in sorted_fields(&input.fields) {
        write_description(f, field.description.as_deref(), 2)?;
        write!(f, "  ")?;
        write_input_value(f, field)?;
        writeln!(f)?;
    }
    writeln!(f, "}}\n")
}

fn write_implements<'a>(
    f: &mut Formatter<'_>,
    mut interfaces: impl Iterator<Item = &'a ComponentName>,
) -> fmt::Result {
    if let Some(first) = interfaces.next() {
        write!(f, " implements {first}")?;
        for interface in interfaces {
            write!(f, " & {interface}")?;
        }
    }
    Ok(())
}

fn write_field(f: &mut Formatter<'_>, field: &Component<FieldDefinition>) -> fmt::Result {
    write_description(f, field.description.as_deref(), 2)?;
    write!(f, "  {}", field.name)?;
    if !field.arguments.is_empty() {
        write!(f, "(")?;
        write_arguments(f, &field.arguments)?;
        write!(f, ")")?;
    }
    write!(f, ": {}", type_reference(&field.ty))?;
    write_field_directives(f, &field.directives)?;
    writeln!(f)
}

fn write_arguments(
    f: &mut Formatter<'_>,
    arguments: &[Node<InputValueDefinition>],
) -> fmt::Result {
    for (index, argument) in arguments.iter().enumerate() {
        if index > 0 {
            write!(f, ", ")?;
        }
        write_input_value(f, argument)?;
    }
    Ok(())
}

fn write_input_value(f: &mut Formatter<'_>, value: &InputValueDefinition) -> fmt::Result {
    write!(f, "{}: {}", value.name, type_reference(&value.ty))?;
    if let Some(default_value) = &value.default_value {
        write!(f, " = {default_value}")?;
    }
    Ok(())
}

/// `@external`, `@requires` and `@provides`, in application order.
fn write_field_directives(f: &mut Formatter<'_>, directives: &ast::DirectiveList) -> fmt::Result {
    for directive in directives.iter() {
        if directive.name == EXTERNAL_DIRECTIVE_NAME {
            write!(f, " @{}", directive.name)?;
        } else if directive.name == REQUIRES_DIRECTIVE_NAME
            || directive.name == PROVIDES_DIRECTIVE_NAME
        {
            let fields = directive
                .arguments
                .iter()
                .find(|argument| argument.name == FIELDS_ARGUMENT_NAME)
                .map(|argument| argument.value.as_ref());
            if let Some(Value::String(fields)) = fields {
                write!(f, " @{}(fields: {})", directive.name, string_literal(fields))?;
            }
        }
    }
    Ok(())
}

/// Named types print as their name and lists as `[Inner]`. Non-null markers are dropped.
fn type_reference(ty: &Type) -> String {
    match ty {
        Type::Named(name) | Type::NonNullNamed(name) => name.to_string(),
        Type::List(inner) | Type::NonNullList(inner) => format!("[{}]", type_reference(inner)),
    }
}

fn string_literal(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Short single-line descriptions print as `"text"`; anything else as an indented block string.
fn write_description(
    f: &mut Formatter<'_>,
    description: Option<&str>,
    indent: usize,
) -> fmt::Result {
    let Some(description) = description.filter(|d| !d.is_empty()) else {
        return Ok(());
    };
    let padding = " ".repeat(indent);
    let max_length = MAX_LINE_LENGTH.saturating_sub(indent + 4);
    if description.len() < max_length && !description.contains(['"', '\\', '\n']) {
        return writeln!(f, "{padding}\"{description}\"");
    }
    writeln!(f, "{padding}\"\"\"")?;
    for line in description.replace("\"\"\"", "\\\"\"\"").lines() {
        if line.is_empty() {
            writeln!(f)?;
        } else {
            writeln!(f, "{padding}{line}")?;
        }
    }
    writeln!(f, "{padding}\"\"\"")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::entity::build_entity_union;

    fn render(sdl: &str) -> String {
        let schema = Schema::parse(sdl, "sdl.graphql").unwrap();
        let objects: IndexMap<Name, Node<ObjectType>> = schema
            .types
            .iter()
            .filter_map(|(name, ty)| match ty {
                ExtendedType::Object(object) => Some((name.clone(), object.clone())),
                _ => None,
            })
            .collect();
        let entities = build_entity_union(&objects);
        print_sdl(&schema, &entities)
    }

    const KEY: &str = "directive @key(fields: String) repeatable on OBJECT | INTERFACE\n";

    #[test]
    fn renders_sections_in_canonical_order() {
        let sdl = render(&format!(
            r#"{KEY}
            directive @cached(ttl: Int = 60, scope: [String!]) repeatable on FIELD_DEFINITION | OBJECT
            directive @internal on FIELD_DEFINITION
            type Query {{
              users(first: Int = 10): [User!]!
              node(id: ID!): Node
            }}
            type Mutation {{
              rename(id: ID!, name: String): User
            }}
            interface Node {{ id: ID! }}
            "A user of the service"
            type User implements Node @key(fields: "id") {{
              name: String
              id: ID!
              address: Address
            }}
            type Address {{ street: String city: String }}
            "#
        ));
        insta::assert_snapshot!(sdl, @r#"
        union _Entity = User

        directive @cached(ttl: Int = 60, scope: [String]) repeatable on FIELD_DEFINITION | OBJECT

        directive @internal on FIELD_DEFINITION

        interface Node {
          id: ID
        }

        type Address {
          city: String
          street: String
        }

        "A user of the service"
        type User implements Node @key(fields: "id") {
          address: Address
          id: ID
          name: String
        }

        type Query {
          node(id: ID): Node
          users(first: Int = 10): [User]
        }

        type Mutation {
          rename(id: ID, name: String): User
        }

        #### Apollo Federation ####

        scalar _Any
        scalar _FieldSet

        directive @external on FIELD_DEFINITION
        directive @requires(fields: _FieldSet!) on FIELD_DEFINITION
        directive @provides(fields: _FieldSet!) on FIELD_DEFINITION
        directive @key(fields: _FieldSet!) repeatable on OBJECT | INTERFACE

        # this is an optional directive discussed below
        directive @extends on OBJECT | INTERFACE
        "#);
    }

    #[test]
    fn omits_empty_mutation_and_union() {
        let sdl = render("type Query { hello: String } type Mutation");
        assert!(!sdl.contains("union _Entity"));
        assert!(!sdl.contains("type Mutation"));
        assert!(sdl.starts_with("type Query {\n  hello: String\n}\n\n#### Apollo Federation ####"));
    }

    #[test]
    fn renders_federation_field_directives_and_extends() {
        let sdl = render(&format!(
            r#"{KEY}
            directive @external on FIELD_DEFINITION
            directive @requires(fields: String) on FIELD_DEFINITION
            directive @provides(fields: String) on FIELD_DEFINITION
            directive @extends on OBJECT | INTERFACE
            type Query {{ review: Review }}
            type Review @key(fields: "id") {{ id: ID author: User @provides(fields: "name") }}
            type User @extends @key(fields: "id") @key(fields: "email org") {{
              id: ID @external
              email: String @external
              org: String @external
              name: String @external
              reviews: [Review] @requires(fields: "name")
            }}
            "#
        ));
        assert!(sdl.starts_with("union _Entity = Review | User\n\ntype Review"));
        assert!(sdl.contains("  author: User @provides(fields: \"name\")\n"));
        assert!(sdl.contains(
            "type User @extends @key(fields: \"id\") @key(fields: \"email org\") {\n  email: String @external\n"
        ));
        assert!(sdl.contains("  reviews: [Review] @requires(fields: \"name\")\n"));
    }

    #[test]
    fn renders_referenced_enums_scalars_and_inputs() {
        let sdl = render(
            r#"
            type Query { products(filter: Filter): [Product] }
            type Product { color: Color, released: Date }
            enum Color { RED GREEN }
            scalar Date
            input Filter { name: String, color: Color = RED }
            "#,
        );
        assert!(sdl.contains("scalar Date\n\n"));
        assert!(sdl.contains("enum Color {\n  RED\n  GREEN\n}\n\n"));
        assert!(sdl.contains("input Filter {\n  color: Color = RED\n  name: String\n}\n\n"));
        let product = sdl.find("type Product").unwrap();
        let color = sdl.find("enum Color").unwrap();
        let query = sdl.find("type Query").unwrap();
        assert!(product < color && color < query);
    }

    #[test]
    fn renders_the_members_of_referenced_unions() {
        let sdl = render(
            r#"
            type Query { search: [Result] me: User }
            union Result = Product | Review
            type Product { name: String }
            type Review { body: String author: User }
            type User { name: String }
            "#,
        );
        assert!(sdl.contains("type Product {\n  name: String\n}\n\n"));
        assert!(sdl.contains("type Review {\n  author: User\n  body: String\n}\n\n"));
        assert!(sdl.contains("union Result = Product | Review\n\n"));
        let review = sdl.find("type Review").unwrap();
        let result = sdl.find("union Result").unwrap();
        assert!(review < result);
    }

    #[test]
    fn long_or_quoted_descriptions_use_block_strings() {
        let mut out = String::new();
        struct Description<'a>(&'a str, usize);
        impl Display for Description<'_> {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                write_description(f, Some(self.0), self.1)
            }
        }
        out.push_str(&Description("short", 0).to_string());
        out.push_str(&Description("has \"quotes\"", 2).to_string());
        out.push_str(&Description(&"x".repeat(80), 0).to_string());
        out.push_str(&Description("two\nlines", 2).to_string());
        assert_eq!(
            out,
            format!(
                "\"short\"\n  \"\"\"\n  has \"quotes\"\n  \"\"\"\n\"\"\"\n{}\n\"\"\"\n  \"\"\"\n  two\n  lines\n  \"\"\"\n",
                "x".repeat(80)
            )
        );
    }

    #[test]
    fn output_is_independent_of_declaration_order() {
        let a = render(&format!(
            r#"{KEY}
            type Query {{ a: A b: B }}
            type A @key(fields: "id") {{ id: ID b: B }}
            type B @key(fields: "id") {{ id: ID a: A }}
            "#
        ));
        let b = render(&format!(
            r#"{KEY}
            type B @key(fields: "id") {{ a: A id: ID }}
            type A @key(fields: "id") {{ b: B id: ID }}
            type Query {{ b: B a: A }}
            "#
        ));
        assert_eq!(a, b);
    }
}

//! Extraction of `@key` field sets from a type's applied directives.
use apollo_compiler::ast::Directive;
use apollo_compiler::ast::Value;
use apollo_compiler::schema::DirectiveList;

use crate::error::FederationError;
use crate::protocol::FIELDS_ARGUMENT_NAME;
use crate::protocol::KEY_DIRECTIVE_NAME;

/// Returns the `fields` string of every `@key` applied to `type_name`, in declaration order.
///
/// Field sets are returned verbatim; splitting a composite key happens at resolution time.
/// A `@key` without a string `fields` argument is an
/// [`InvalidDirectiveShape`](FederationError::InvalidDirectiveShape).
pub fn key_field_sets(
    type_name: &str,
    directives: &DirectiveList,
) -> Result<Vec<String>, FederationError> {
    directives
        .get_all(&KEY_DIRECTIVE_NAME)
        .map(|directive| key_fields_argument(type_name, directive))
        .collect()
}

/// Same as [`key_field_sets`], but a malformed directive is logged and the type is
/// treated as carrying no keys.
pub(crate) fn key_field_sets_or_empty(type_name: &str, directives: &DirectiveList) -> Vec<String> {
    match key_field_sets(type_name, directives) {
        Ok(field_sets) => field_sets,
        Err(error) => {
            tracing::warn!(type_name, %error, "ignoring @key directives");
            Vec::new()
        }
    }
}

/// Splits a field set into its top-level field names.
///
/// Nested selections (`"id organization { id }"`) keep only the outer field name.
pub fn key_field_names(field_set: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut depth = 0usize;
    for token in field_set
        .split(|c: char| c.is_whitespace() || c == ',')
        .flat_map(split_braces)
        .filter(|token| !token.is_empty())
    {
        match token {
            "{" => depth += 1,
            "}" => depth = depth.saturating_sub(1),
            name if depth == 0 => names.push(name),
            _ => {}
        }
    }
    names
}

fn split_braces(token: &str) -> impl Iterator<Item = &str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for (index, c) in token.char_indices() {
        if c == '{' || c == '}' {
            pieces.push(&token[start..index]);
            pieces.push(&token[index..index + 1]);
            start = index + 1;
        }
    }
    pieces.push(&token[start..]);
    pieces.into_iter()
}

fn key_fields_argument(
    type_name: &str,
    directive: &Directive,
) -> Result<String, FederationError> {
    let invalid = |message: &str| FederationError::InvalidDirectiveShape {
        type_name: type_name.to_string(),
        message: message.to_string(),
    };
    let value = directive
        .arguments
        .iter()
        .find(|argument| argument.name == FIELDS_ARGUMENT_NAME)
        .map(|argument| argument.value.as_ref())
        .ok_or_else(|| invalid("missing `fields` argument"))?;
    match value {
        Value::String(fields) if !fields.trim().is_empty() => Ok(fields.to_string()),
        Value::String(_) => Err(invalid("`fields` must not be empty")),
        _ => Err(invalid("`fields` must be a string")),
    }
}

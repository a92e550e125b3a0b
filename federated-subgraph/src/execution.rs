//! Bridges registered resolvers to the `apollo-compiler` execution engine.
use std::cell::RefCell;

use apollo_compiler::ExecutableDocument;
use apollo_compiler::Name;
use apollo_compiler::ast::OperationType;
use apollo_compiler::resolvers::Execution;
use apollo_compiler::resolvers::FieldError;
use apollo_compiler::resolvers::ObjectValue;
use apollo_compiler::resolvers::ResolveInfo;
use apollo_compiler::resolvers::ResolvedValue;
use apollo_compiler::response::GraphQLError;
use apollo_compiler::response::JsonMap;
use apollo_compiler::response::JsonValue;
use apollo_compiler::response::ResponseDataPathSegment;
use apollo_compiler::schema::ExtendedType;

use crate::graphql::Request;
use crate::graphql::Response;
use crate::protocol::ENTITIES_QUERY;
use crate::protocol::REPRESENTATIONS_ARGUMENT;
use crate::protocol::SDL_FIELD;
use crate::protocol::SERVICE_SDL_QUERY;
use crate::protocol::SERVICE_TYPE;
use crate::protocol::TYPENAME_FIELD;
use crate::representation::resolve_representations;
use crate::resolvers::EntityResolverKind;
use crate::resolvers::FieldResolvers;
use crate::subgraph::Subgraph;

/// Everything one request executes against. Nothing here is locked during execution.
pub(crate) struct ExecutionContext<'a> {
    pub(crate) subgraph: &'a Subgraph,
    pub(crate) field_resolvers: &'a FieldResolvers,
    pub(crate) entity_resolver: Option<&'a EntityResolverKind>,
}

pub(crate) fn execute(context: &ExecutionContext<'_>, request: &Request) -> Response {
    let schema = context.subgraph.schema();
    let document = match ExecutableDocument::parse_and_validate(schema, &request.query, "query")
    {
        Ok(document) => document,
        Err(e) => {
            return Response::from_errors(e.errors.iter().map(|e| e.to_json()).collect());
        }
    };
    let operation = match document
        .operations
        .get(request.operation_name.as_deref())
    {
        Ok(operation) => operation,
        Err(e) => return Response::from_errors(vec![e.to_graphql_error(&document.sources)]),
    };

    let plain_error = |message: &str| {
        Response::from_errors(vec![GraphQLError::new(message, None, &document.sources)])
    };
    if operation.operation_type == OperationType::Subscription {
        return plain_error("subscriptions are not supported");
    }
    let Some(root_type) = schema.root_operation(operation.operation_type) else {
        return plain_error("the schema does not support this operation type");
    };

    tracing::debug!(
        operation_type = ?operation.operation_type,
        operation_name = ?request.operation_name,
        "executing operation"
    );
    let root = RootValue {
        type_name: root_type.clone(),
        context,
        entity_errors: RefCell::new(Vec::new()),
    };
    let result = Execution::new(schema, &document)
        .operation(operation)
        .raw_variable_values(&request.variables)
        .execute_sync(&root);
    match result {
        Ok(response) => {
            let mut errors = response.errors;
            errors.extend(root.entity_errors.into_inner());
            Response {
                data: Some(JsonValue::from(response.data)),
                errors,
            }
        }
        Err(request_error) => {
            Response::from_errors(vec![request_error.to_graphql_error(&document.sources)])
        }
    }
}

/// The query or mutation root. Holds no data: every field goes through a registered
/// resolver, except the two federation fields.
struct RootValue<'a> {
    type_name: Name,
    context: &'a ExecutionContext<'a>,
    /// `_entities` failures, reported next to the engine's errors. An `Err` list item would
    /// null the whole list, so failed representations resolve to `null` and land here.
    entity_errors: RefCell<Vec<GraphQLError>>,
}

impl ObjectValue for RootValue<'_> {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn resolve_field<'a>(
        &'a self,
        info: &'a ResolveInfo<'a>,
    ) -> Result<ResolvedValue<'a>, FieldError> {
        let field_name = info.field_name();
        if field_name == ENTITIES_QUERY.as_str() {
            return self.resolve_entities(info);
        }
        if field_name == SERVICE_SDL_QUERY.as_str() {
            return Ok(ResolvedValue::object(ServiceValue {
                type_name: SERVICE_TYPE,
                subgraph: self.context.subgraph,
            }));
        }

        let resolver = self
            .context
            .field_resolvers
            .get(&self.type_name, field_name)
            .ok_or_else(|| FieldError {
                message: format!("no resolver registered for {}.{field_name}", self.type_name),
            })?;
        let value = resolver
            .resolve(&JsonMap::new(), info.arguments())
            .map_err(|error| FieldError {
                message: error.to_string(),
            })?;
        Ok(resolve_json(value, self.context, info))
    }
}

impl<'c> RootValue<'c> {
    fn resolve_entities<'a>(
        &'a self,
        info: &'a ResolveInfo<'a>,
    ) -> Result<ResolvedValue<'a>, FieldError> {
        let subgraph = self.context.subgraph;
        let response_key = info
            .field_selections()
            .first()
            .map_or(ENTITIES_QUERY, |field| field.response_key().clone());
        let representations = info
            .arguments()
            .get(REPRESENTATIONS_ARGUMENT.as_str())
            .cloned()
            .unwrap_or(JsonValue::Null);
        let results = match resolve_representations(
            subgraph.schema(),
            subgraph.entities(),
            self.context.entity_resolver,
            &representations,
        ) {
            Ok(results) => results,
            Err(error) => {
                self.report_entity_error(
                    info,
                    error.to_string(),
                    error.extension_code(),
                    vec![ResponseDataPathSegment::Field(response_key)],
                );
                return Ok(ResolvedValue::null());
            }
        };

        let context: &'a ExecutionContext<'a> = self.context;
        let entities = results.into_iter().enumerate().map(move |(index, result)| {
            match result {
                Ok(entity) => Ok(ResolvedValue::object(JsonObjectValue {
                    type_name: entity.type_name.to_string(),
                    data: entity.data,
                    context,
                })),
                Err(error) => {
                    tracing::debug!(index, %error, "representation not resolved");
                    self.report_entity_error(
                        info,
                        error.to_string(),
                        error.extension_code(),
                        vec![
                            ResponseDataPathSegment::Field(response_key.clone()),
                            ResponseDataPathSegment::ListIndex(index),
                        ],
                    );
                    Ok(ResolvedValue::null())
                }
            }
        });
        Ok(ResolvedValue::List(Box::new(entities)))
    }

    fn report_entity_error(
        &self,
        info: &ResolveInfo<'_>,
        message: String,
        code: &str,
        path: Vec<ResponseDataPathSegment>,
    ) {
        let mut error = GraphQLError::new(message, None, &info.document().sources);
        error.path = path;
        error.extensions.insert("code", JsonValue::from(code));
        self.entity_errors.borrow_mut().push(error);
    }
}

/// `_Service { sdl }`
struct ServiceValue<'a> {
    type_name: Name,
    subgraph: &'a Subgraph,
}

impl ObjectValue for ServiceValue<'_> {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn resolve_field<'a>(
        &'a self,
        info: &'a ResolveInfo<'a>,
    ) -> Result<ResolvedValue<'a>, FieldError> {
        if info.field_name() == SDL_FIELD.as_str() {
            Ok(ResolvedValue::leaf(JsonValue::from(self.subgraph.sdl())))
        } else {
            Err(FieldError {
                message: format!("unexpected field {}.{}", self.type_name, info.field_name()),
            })
        }
    }
}

/// An object produced by a resolver. Fields without a registered resolver read the
/// same-named entry, or `null` when it is missing.
struct JsonObjectValue<'a> {
    type_name: String,
    data: JsonMap,
    context: &'a ExecutionContext<'a>,
}

impl ObjectValue for JsonObjectValue<'_> {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn resolve_field<'a>(
        &'a self,
        info: &'a ResolveInfo<'a>,
    ) -> Result<ResolvedValue<'a>, FieldError> {
        let field_name = info.field_name();
        let value = match self.context.field_resolvers.get(&self.type_name, field_name) {
            Some(resolver) => resolver
                .resolve(&self.data, info.arguments())
                .map_err(|error| FieldError {
                    message: error.to_string(),
                })?,
            None => self.data.get(field_name).cloned().unwrap_or(JsonValue::Null),
        };
        Ok(resolve_json(value, self.context, info))
    }
}

fn resolve_json<'a>(
    value: JsonValue,
    context: &'a ExecutionContext<'a>,
    info: &'a ResolveInfo<'a>,
) -> ResolvedValue<'a> {
    match value {
        JsonValue::Object(data) if is_composite(context, info) => {
            let type_name = data
                .get(TYPENAME_FIELD)
                .and_then(|type_name| type_name.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| info.field_definition().ty.inner_named_type().to_string());
            ResolvedValue::object(JsonObjectValue {
                type_name,
                data,
                context,
            })
        }
        JsonValue::Array(items) => ResolvedValue::List(Box::new(
            items
                .into_iter()
                .map(move |item| Ok(resolve_json(item, context, info))),
        )),
        leaf => ResolvedValue::leaf(leaf),
    }
}

fn is_composite(context: &ExecutionContext<'_>, info: &ResolveInfo<'_>) -> bool {
    let type_name = info.field_definition().ty.inner_named_type();
    matches!(
        context.subgraph.schema().types.get(type_name),
        Some(ExtendedType::Object(_) | ExtendedType::Interface(_) | ExtendedType::Union(_))
    )
}

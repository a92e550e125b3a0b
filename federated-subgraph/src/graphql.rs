//! GraphQL requests and responses served by a subgraph.
use apollo_compiler::response::GraphQLError;
use apollo_compiler::response::JsonMap;
use apollo_compiler::response::JsonValue;
use serde::Deserialize;
use serde::Serialize;

/// A GraphQL request, as sent by the gateway in a GET query string or a POST body.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Request {
    /// The GraphQL operation (query or mutation) document.
    #[serde(default)]
    pub query: String,

    /// Selects the operation to run when the document holds more than one.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub operation_name: Option<String>,

    #[serde(
        skip_serializing_if = "JsonMap::is_empty",
        default,
        deserialize_with = "deserialize_null_default"
    )]
    pub variables: JsonMap,
}

// `null` variables are the same as no variables
fn deserialize_null_default<'de, D, T: Default + Deserialize<'de>>(
    deserializer: D,
) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
{
    <Option<T>>::deserialize(deserializer).map(|x| x.unwrap_or_default())
}

#[buildstructor::buildstructor]
impl Request {
    #[builder(visibility = "pub")]
    fn new(query: String, operation_name: Option<String>, variables: Option<JsonMap>) -> Self {
        Self {
            query,
            operation_name,
            variables: variables.unwrap_or_default(),
        }
    }
}

/// A GraphQL response.
///
/// `data` is absent when the request failed before execution, `null` when a non-null root
/// field failed.
#[derive(Clone, Debug, Default, Serialize)]
#[non_exhaustive]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQLError>,
}

impl Response {
    pub(crate) fn from_errors(errors: Vec<GraphQLError>) -> Self {
        Self { data: None, errors }
    }

    pub fn to_json(&self) -> JsonValue {
        serde_json_bytes::to_value(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json_bytes::json;

    use super::*;

    #[test]
    fn deserializes_gateway_requests() {
        let request: Request = serde_json::from_str(
            r#"{"query": "{ me { id } }", "operationName": null, "variables": null}"#,
        )
        .unwrap();
        assert_eq!(request, Request::builder().query("{ me { id } }").build());

        let request: Request = serde_json::from_str(
            r#"{"query": "query Me($id: ID!) { user(id: $id) { id } }", "operationName": "Me", "variables": {"id": "1"}}"#,
        )
        .unwrap();
        assert_eq!(request.operation_name.as_deref(), Some("Me"));
        assert_eq!(request.variables.get("id"), Some(&json!("1")));
    }

    #[test]
    fn errors_only_responses_have_no_data() {
        let response =
            Response::from_errors(vec![GraphQLError::new("boom", None, &Default::default())]);
        let json = response.to_json();
        let object = json.as_object().unwrap();
        assert!(!object.contains_key("data"));
        assert_eq!(
            object.get("errors"),
            Some(&json!([{ "message": "boom" }]))
        );
    }
}

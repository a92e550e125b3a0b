use std::sync::Arc;

use apollo_compiler::response::JsonMap;
use apollo_compiler::response::JsonValue;
use federated_subgraph::BoxError;
use federated_subgraph::Federation;
use federated_subgraph::Representation;
use serde_json_bytes::json;


const USERS_SDL: &str = r#"
type Query {
  user(id: ID!): User
  users: [User!]!
}

type User @key(fields: "id") {
  id: ID!
  name: String
  friends: [User]
}
"#;

fn users() -> JsonMap {
    let users = json!({
        "1": { "id": "1", "name": "Bilbo", "friendIds": ["2"] },
        "2": { "id": "2", "name": "Frodo", "friendIds": ["3", "1"] },
        "3": { "id": "3", "name": "Sam", "friendIds": [] },
    });
    users.as_object().unwrap().clone()
}

fn user_by_id(id: &str) -> Result<JsonMap, BoxError> {
    users()
        .get(id)
        .and_then(|user| user.as_object())
        .cloned()
        .ok_or_else(|| format!("user {id} not found").into())
}

fn resolve_user(representation: &Representation) -> Result<JsonMap, BoxError> {
    let id = representation
        .key("id")
        .and_then(|id| id.as_str())
        .ok_or("users are keyed by a string id")?;
    user_by_id(id)
}

/// A built users subgraph with its field resolvers, but no entity resolver.
fn users_subgraph() -> Arc<Federation> {
    let federation = Arc::new(Federation::new());
    federation
        .build_subgraph_schema_from_sdl(USERS_SDL, "users.graphql")
        .unwrap();
    federation.set_field_resolver(
        "Query",
        "user",
        |_: &JsonMap, arguments: &JsonMap| -> Result<JsonValue, BoxError> {
            let id = arguments.get("id").and_then(|id| id.as_str()).unwrap_or_default();
            Ok(user_by_id(id).map(JsonValue::Object).unwrap_or(JsonValue::Null))
        },
    );
    federation.set_field_resolver(
        "Query",
        "users",
        |_: &JsonMap, _: &JsonMap| -> Result<JsonValue, BoxError> {
            Ok(JsonValue::Array(users().into_iter().map(|(_, user)| user).collect()))
        },
    );
    federation.set_field_resolver(
        "User",
        "friends",
        |user: &JsonMap, _: &JsonMap| -> Result<JsonValue, BoxError> {
            let friend_ids = user
                .get("friendIds")
                .and_then(|ids| ids.as_array())
                .cloned()
                .unwrap_or_default();
            friend_ids
                .iter()
                .map(|id| user_by_id(id.as_str().unwrap_or_default()).map(JsonValue::Object))
                .collect::<Result<Vec<_>, _>>()
                .map(JsonValue::Array)
        },
    );
    federation
}

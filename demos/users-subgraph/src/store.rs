//! The in-memory users the subgraph serves, and the resolvers reading them.
use std::sync::Arc;

use apollo_compiler::response::JsonMap;
use apollo_compiler::response::JsonValue;
use federated_subgraph::BoxError;
use federated_subgraph::Federation;
use federated_subgraph::FederationError;
use federated_subgraph::Representation;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct User {
    id: String,
    username: String,
    name: String,
    friend_ids: Vec<String>,
}

impl User {
    fn new(id: &str, username: &str, name: &str, friend_ids: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            username: username.to_string(),
            name: name.to_string(),
            friend_ids: friend_ids.iter().map(|id| id.to_string()).collect(),
        }
    }

    fn to_json(&self) -> JsonMap {
        match serde_json_bytes::to_value(self) {
            Ok(JsonValue::Object(object)) => object,
            _ => JsonMap::new(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct UserStore {
    users: Vec<User>,
}

impl Default for UserStore {
    fn default() -> Self {
        Self {
            users: vec![
                User::new("1", "bilbo", "Bilbo Baggins", &["2", "4"]),
                User::new("2", "frodo", "Frodo Baggins", &["1", "3", "4"]),
                User::new("3", "sam", "Samwise Gamgee", &["2"]),
                User::new("4", "gandalf", "Gandalf", &["1", "2"]),
            ],
        }
    }
}

impl UserStore {
    pub(crate) fn get(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|user| user.id == id)
    }

    /// The user matching every key field of `representation`.
    pub(crate) fn find(&self, representation: &Representation) -> Option<JsonMap> {
        self.users
            .iter()
            .map(User::to_json)
            .find(|user| representation.matches(user))
    }

    fn friends(&self, user: &JsonMap) -> Vec<JsonValue> {
        user.get("friendIds")
            .and_then(|ids| ids.as_array())
            .into_iter()
            .flatten()
            .filter_map(|id| self.get(id.as_str()?))
            .map(|friend| JsonValue::Object(friend.to_json()))
            .collect()
    }

    /// Registers the resolvers serving the store on `federation`.
    pub(crate) fn register(
        self: Arc<Self>,
        federation: &Federation,
    ) -> Result<(), FederationError> {
        let store = self.clone();
        federation.set_entity_resolver(
            move |representation: &Representation| -> Result<JsonMap, BoxError> {
                store.find(representation).ok_or_else(|| {
                    format!(
                        "no user matches {}",
                        representation
                            .keys
                            .iter()
                            .map(|(name, value)| format!("{name}={value}"))
                            .collect::<Vec<_>>()
                            .join(", ")
                    )
                    .into()
                })
            },
        )?;

        let store = self.clone();
        federation.set_field_resolver(
            "Query",
            "user",
            move |_: &JsonMap, arguments: &JsonMap| -> Result<JsonValue, BoxError> {
                let id = arguments
                    .get("id")
                    .and_then(|id| id.as_str())
                    .ok_or("missing id argument")?;
                Ok(store
                    .get(id)
                    .map(|user| JsonValue::Object(user.to_json()))
                    .unwrap_or(JsonValue::Null))
            },
        );

        let store = self.clone();
        federation.set_field_resolver(
            "Query",
            "users",
            move |_: &JsonMap, _: &JsonMap| -> Result<JsonValue, BoxError> {
                Ok(JsonValue::Array(
                    store
                        .users
                        .iter()
                        .map(|user| JsonValue::Object(user.to_json()))
                        .collect(),
                ))
            },
        );

        let store = self;
        federation.set_field_resolver(
            "User",
            "friends",
            move |user: &JsonMap, _: &JsonMap| -> Result<JsonValue, BoxError> {
                Ok(JsonValue::Array(store.friends(user)))
            },
        );
        Ok(())
    }
}

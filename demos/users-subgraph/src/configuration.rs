//! Service configuration, read from YAML.
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::ensure;
use serde::Deserialize;

const DEFAULT_SCHEMA: &str = include_str!("users.graphql");

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub(crate) struct Configuration {
    /// The socket address the HTTP server binds to.
    pub(crate) listen: SocketAddr,

    /// The path GraphQL requests are served on.
    pub(crate) path: String,

    /// Schema document to serve instead of the embedded one.
    pub(crate) schema: Option<PathBuf>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8080)),
            path: "/graphql".to_string(),
            schema: None,
        }
    }
}

impl Configuration {
    pub(crate) fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("could not read configuration {}", path.display()))?;
        contents
            .parse()
            .with_context(|| format!("invalid configuration {}", path.display()))
    }

    /// The schema document and the name it is reported under.
    pub(crate) fn load_schema(&self) -> anyhow::Result<(String, String)> {
        match &self.schema {
            Some(path) => {
                let sdl = std::fs::read_to_string(path)
                    .with_context(|| format!("could not read schema {}", path.display()))?;
                Ok((sdl, path.display().to_string()))
            }
            None => Ok((DEFAULT_SCHEMA.to_string(), "users.graphql".to_string())),
        }
    }
}

impl std::str::FromStr for Configuration {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let configuration: Configuration = if s.trim().is_empty() {
            Configuration::default()
        } else {
            serde_yaml::from_str(s)?
        };
        ensure!(
            configuration.path.starts_with('/'),
            "path must start with '/', got '{}'",
            configuration.path
        );
        Ok(configuration)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn empty_configuration_uses_defaults() {
        let configuration: Configuration = "".parse().unwrap();
        assert_eq!(configuration, Configuration::default());
        let (sdl, name) = configuration.load_schema().unwrap();
        assert!(sdl.contains("type User @key(fields: \"id\")"));
        assert_eq!(name, "users.graphql");
    }

    #[test]
    fn reads_yaml() {
        let configuration: Configuration = r#"
listen: 0.0.0.0:4100
path: /users
schema: ./schema.graphql
"#
        .parse()
        .unwrap();
        assert_eq!(
            configuration,
            Configuration {
                listen: SocketAddr::from(([0, 0, 0, 0], 4100)),
                path: "/users".to_string(),
                schema: Some(PathBuf::from("./schema.graphql")),
            }
        );
    }

    #[test]
    fn rejects_invalid_configuration() {
        let error = "path: graphql".parse::<Configuration>().unwrap_err();
        insta::assert_snapshot!(error, @"path must start with '/', got 'graphql'");
        assert!("unknown: field".parse::<Configuration>().is_err());
        assert!("listen: nowhere".parse::<Configuration>().is_err());
    }
}

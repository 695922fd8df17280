// Route definition loaders

use crate::config::FileFormat;
use crate::routing::{Route, RouteTable};
use crate::{Error, HandlerRegistry, Result};
use http::Method;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use trellis_log::debug;

/// Methods a definition file may use.
const SUPPORTED_METHODS: [Method; 7] = [
    Method::GET,
    Method::HEAD,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
];

/// One entry of a route definition file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDefinition {
    pub method: String,
    pub path: String,
    /// Name of a handler in the [`HandlerRegistry`].
    pub handler: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Deserialize)]
struct TomlRoutes {
    #[serde(default)]
    route: Vec<RouteDefinition>,
}

/// Reads route definitions into a [`RouteTable`].
///
/// JSON sources are an array of entries; TOML sources use `[[route]]`
/// tables. Loading is pure: the same source and handlers always give the
/// same table.
///
/// # Examples
///
/// ```
/// use trellis_core::{FileFormat, HandlerRegistry, RouteLoader};
///
/// let handlers = HandlerRegistry::new()
///     .with("Auth@showLogin", |_, _| Ok("LOGIN_PAGE".into()))
///     .with("Auth@login", |_, _| Ok("".into()));
///
/// let table = RouteLoader::new(FileFormat::Toml)
///     .parse(r#"
///         [[route]]
///         method = "GET"
///         path = "/login"
///         handler = "Auth@showLogin"
///
///         [[route]]
///         method = "POST"
///         path = "/login"
///         handler = "Auth@login"
///     "#, &handlers)
///     .unwrap();
///
/// assert_eq!(table.len(), 2);
/// ```
pub struct RouteLoader {
    format: FileFormat,
}

impl RouteLoader {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    /// Auto-detect format from file extension
    pub fn auto(path: impl AsRef<Path>) -> Result<Self> {
        let format = FileFormat::from_path(path.as_ref())
            .map_err(|e| Error::RouteLoad(e.to_string()))?;
        Ok(Self::new(format))
    }

    /// Load a route table from a file
    pub fn load_file(
        &self,
        path: impl AsRef<Path>,
        handlers: &HandlerRegistry,
    ) -> Result<RouteTable> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::RouteLoad(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let table = self.parse(&content, handlers)?;
        debug!("Loaded {} routes from {}", table.len(), path.display());
        Ok(table)
    }

    /// Parse a route table from a string
    pub fn parse(&self, content: &str, handlers: &HandlerRegistry) -> Result<RouteTable> {
        let mut table = RouteTable::new();
        for (index, definition) in self.definitions(content)?.into_iter().enumerate() {
            table.add(build_route(index, definition, handlers)?);
        }
        Ok(table)
    }

    /// Parse the raw entries without resolving handlers.
    pub fn definitions(&self, content: &str) -> Result<Vec<RouteDefinition>> {
        match self.format {
            FileFormat::Json => serde_json::from_str(content)
                .map_err(|e| Error::RouteLoad(format!("JSON parse error: {}", e))),
            FileFormat::Toml => toml::from_str::<TomlRoutes>(content)
                .map(|routes| routes.route)
                .map_err(|e| Error::RouteLoad(format!("TOML parse error: {}", e))),
        }
    }
}

fn build_route(
    index: usize,
    definition: RouteDefinition,
    handlers: &HandlerRegistry,
) -> Result<Route> {
    let at = |msg: String| Error::RouteLoad(format!("route #{}: {}", index, msg));

    let method = parse_method(&definition.method)
        .ok_or_else(|| at(format!("unknown method '{}'", definition.method)))?;

    let handler = handlers
        .get(&definition.handler)
        .ok_or_else(|| at(format!("unknown handler '{}'", definition.handler)))?;

    let route = Route::new(method, &definition.path, handler).map_err(|e| match e {
        Error::RouteLoad(msg) => at(msg),
        other => at(other.to_string()),
    })?;

    Ok(match definition.name {
        Some(name) => route.named(name),
        None => route,
    })
}

fn parse_method(raw: &str) -> Option<Method> {
    let method = Method::from_bytes(raw.trim().to_ascii_uppercase().as_bytes()).ok()?;
    SUPPORTED_METHODS.contains(&method).then_some(method)
}

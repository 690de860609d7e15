use axum::http::Method;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable,
}

/// A path template such as `/studies/{studyId}/participants`.
///
/// A `{name}` segment matches exactly one non-empty path segment, literal
/// segments match exactly, and a single trailing slash on the request path
/// is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriTemplate {
    segments: Vec<Segment>,
}

impl UriTemplate {
    pub fn parse(template: &str) -> Self {
        let segments = template
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                if segment.starts_with('{') && segment.ends_with('}') {
                    Segment::Variable
                } else {
                    Segment::Literal(segment.to_string())
                }
            })
            .collect();

        UriTemplate { segments }
    }

    pub fn matches(&self, path: &str) -> bool {
        let Some(rest) = path.strip_prefix('/') else {
            return false;
        };
        let rest = rest.strip_suffix('/').unwrap_or(rest);

        if rest.is_empty() {
            return self.segments.is_empty();
        }

        let parts: Vec<&str> = rest.split('/').collect();
        if parts.len() != self.segments.len() {
            return false;
        }

        self.segments
            .iter()
            .zip(parts)
            .all(|(segment, part)| match segment {
                Segment::Literal(literal) => literal == part,
                Segment::Variable => !part.is_empty(),
            })
    }
}

/// One protected entry as written in the configuration file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ProtectedPath {
    pub path: String,
    pub methods: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum RouteConfigError {
    #[error("invalid HTTP method '{method}' for protected path '{path}'")]
    InvalidMethod { path: String, method: String },
}

#[derive(Debug, Clone)]
struct ProtectedRoute {
    template: UriTemplate,
    methods: Vec<Method>,
}

/// The set of path/method pairs the active user filter guards.
#[derive(Debug, Clone, Default)]
pub struct ProtectedRoutes {
    routes: Vec<ProtectedRoute>,
}

impl ProtectedRoutes {
    /// Builds the set, prefixing every configured path with `context_path`.
    pub fn from_config(
        context_path: &str,
        paths: &[ProtectedPath],
    ) -> Result<Self, RouteConfigError> {
        let mut routes = Vec::with_capacity(paths.len());
        for entry in paths {
            let full_path = format!("{}/{}", context_path, entry.path.trim_start_matches('/'));
            let methods = entry
                .methods
                .iter()
                .map(|method| {
                    Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes()).map_err(
                        |_| RouteConfigError::InvalidMethod {
                            path: entry.path.clone(),
                            method: method.clone(),
                        },
                    )
                })
                .collect::<Result<Vec<_>, _>>()?;

            tracing::debug!("Protecting {} for {:?}", full_path, methods);
            routes.push(ProtectedRoute {
                template: UriTemplate::parse(&full_path),
                methods,
            });
        }

        Ok(ProtectedRoutes { routes })
    }

    pub fn is_protected(&self, method: &Method, path: &str) -> bool {
        self.routes
            .iter()
            .any(|route| route.methods.contains(method) && route.template.matches(path))
    }
}

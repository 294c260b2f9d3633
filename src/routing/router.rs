//! Per-method router backed by `matchit`
//!
//! Pattern syntax is matchit's: `/users/{id}` binds one segment,
//! `/files/{*path}` captures the rest of the path, and static segments take
//! precedence over parameters.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

/// Path parameters extracted by a successful lookup
pub type Params = HashMap<String, String>;

/// Outcome of resolving a (method, path) pair
#[derive(Debug)]
pub enum Lookup<'a, T> {
    Found { value: &'a T, params: Params },
    /// The path is registered, but only for these methods
    MethodNotAllowed(Vec<&'a str>),
    NotFound,
}

/// One radix tree per HTTP method
pub struct Router<T> {
    trees: BTreeMap<String, matchit::Router<T>>,
    /// Patterns only, so a registration can be tried without committing it
    shapes: BTreeMap<String, matchit::Router<()>>,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self {
            trees: BTreeMap::new(),
            shapes: BTreeMap::new(),
        }
    }
}

impl<T> Router<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `insert(method, pattern, ..)` would succeed. Nothing is stored.
    pub fn check(&self, method: &str, pattern: &str) -> Result<(), matchit::InsertError> {
        let mut shape = self
            .shapes
            .get(&method.to_ascii_uppercase())
            .cloned()
            .unwrap_or_else(matchit::Router::new);
        shape.insert(pattern, ())
    }

    /// Bind `value` to `(method, pattern)`.
    ///
    /// Fails when the pattern is malformed or conflicts with one already
    /// registered for the same method.
    pub fn insert(&mut self, method: &str, pattern: &str, value: T) -> Result<(), matchit::InsertError> {
        let method = method.to_ascii_uppercase();
        self.trees
            .entry(method.clone())
            .or_insert_with(matchit::Router::new)
            .insert(pattern, value)?;
        self.shapes
            .entry(method)
            .or_insert_with(matchit::Router::new)
            .insert(pattern, ())
    }

    pub fn lookup(&self, method: &str, path: &str) -> Lookup<'_, T> {
        if let Some(tree) = self.trees.get(method) {
            if let Ok(matched) = tree.at(path) {
                let params = matched
                    .params
                    .iter()
                    .map(|(k, v)| (k.to_string(), decode_param(v)))
                    .collect();
                return Lookup::Found {
                    value: matched.value,
                    params,
                };
            }
        }

        let allowed: Vec<&str> = self
            .trees
            .iter()
            .filter(|(m, tree)| m.as_str() != method && tree.at(path).is_ok())
            .map(|(m, _)| m.as_str())
            .collect();

        if allowed.is_empty() {
            Lookup::NotFound
        } else {
            Lookup::MethodNotAllowed(allowed)
        }
    }
}

/// Percent-decode a captured segment; invalid UTF-8 is passed through raw
fn decode_param(raw: &str) -> String {
    urlencoding::decode(raw).map_or_else(|_| raw.to_string(), Cow::into_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> Router<&'static str> {
        let mut r = Router::new();
        r.insert("GET", "/users", "list").unwrap();
        r.insert("GET", "/users/new", "form").unwrap();
        r.insert("GET", "/users/{id}", "show").unwrap();
        r.insert("POST", "/users", "create").unwrap();
        r.insert("GET", "/files/{*path}", "file").unwrap();
        r
    }

    #[test]
    fn test_exact_match() {
        match router().lookup("GET", "/users") {
            Lookup::Found { value, params } => {
                assert_eq!(*value, "list");
                assert!(params.is_empty());
            }
            other => panic!("unexpected lookup: {other:?}"),
        }
    }

    #[test]
    fn test_named_param() {
        match router().lookup("GET", "/users/42") {
            Lookup::Found { value, params } => {
                assert_eq!(*value, "show");
                assert_eq!(params["id"], "42");
            }
            other => panic!("unexpected lookup: {other:?}"),
        }
    }

    #[test]
    fn test_static_beats_param() {
        assert!(matches!(
            router().lookup("GET", "/users/new"),
            Lookup::Found { value: &"form", .. }
        ));
    }

    #[test]
    fn test_wildcard_suffix() {
        match router().lookup("GET", "/files/css/site.css") {
            Lookup::Found { params, .. } => assert_eq!(params["path"], "css/site.css"),
            other => panic!("unexpected lookup: {other:?}"),
        }
    }

    #[test]
    fn test_params_are_percent_decoded() {
        match router().lookup("GET", "/users/john%40x") {
            Lookup::Found { params, .. } => assert_eq!(params["id"], "john@x"),
            other => panic!("unexpected lookup: {other:?}"),
        }
        match router().lookup("GET", "/files/my%20docs/a%2Fb.txt") {
            Lookup::Found { params, .. } => assert_eq!(params["path"], "my docs/a/b.txt"),
            other => panic!("unexpected lookup: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_utf8_param_kept_raw() {
        match router().lookup("GET", "/users/%FF") {
            Lookup::Found { params, .. } => assert_eq!(params["id"], "%FF"),
            other => panic!("unexpected lookup: {other:?}"),
        }
    }

    #[test]
    fn test_check_does_not_register() {
        let r = router();
        assert!(r.check("GET", "/users").is_err());
        assert!(r.check("GET", "/teams").is_ok());
        assert!(r.check("PUT", "/users").is_ok());
        assert!(matches!(r.lookup("GET", "/teams"), Lookup::NotFound));
    }

    #[test]
    fn test_method_not_allowed() {
        match router().lookup("DELETE", "/users") {
            Lookup::MethodNotAllowed(allowed) => assert_eq!(allowed, vec!["GET", "POST"]),
            other => panic!("unexpected lookup: {other:?}"),
        }
    }

    #[test]
    fn test_not_found() {
        assert!(matches!(router().lookup("GET", "/missing"), Lookup::NotFound));
    }

    #[test]
    fn test_conflict_rejected() {
        let mut r = router();
        assert!(r.insert("GET", "/users", "again").is_err());
        // same pattern under another method is fine
        assert!(r.insert("PUT", "/users", "replace").is_ok());
    }
}

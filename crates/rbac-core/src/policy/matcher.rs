//! Request matching for permission rules

use regex::Regex;

/// Matches a request path against a rule path.
///
/// `:name` segments match any single non-empty segment. A trailing `*`
/// matches the rest of the path, including an empty remainder. Every other
/// segment must match literally.
pub fn key_match(request: &str, pattern: &str) -> bool {
    let req: Vec<&str> = request.split('/').collect();
    let pat: Vec<&str> = pattern.split('/').collect();

    for (i, seg) in pat.iter().enumerate() {
        let last = i == pat.len() - 1;
        if *seg == "*" && last {
            return req.len() >= pat.len();
        }

        let Some(actual) = req.get(i) else {
            return false;
        };
        let ok = if seg.starts_with(':') || *seg == "*" {
            !actual.is_empty()
        } else {
            seg == actual
        };
        if !ok {
            return false;
        }
    }

    req.len() == pat.len()
}

/// Compiled method pattern. Rule methods are anchored regular expressions
/// (`GET`, `GET|POST`, `.*`); an invalid expression matches literally.
#[derive(Debug, Clone)]
pub struct MethodMatcher {
    raw: String,
    regex: Option<Regex>,
}

impl MethodMatcher {
    pub fn new(method: &str) -> Self {
        Self {
            raw: method.to_string(),
            regex: Regex::new(&format!("^(?:{})$", method)).ok(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_match(&self, method: &str) -> bool {
        match &self.regex {
            Some(re) => re.is_match(method),
            None => self.raw == method,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_path() {
        assert!(key_match("/api/v1/menus", "/api/v1/menus"));
        assert!(!key_match("/api/v1/menus", "/api/v1/roles"));
        assert!(!key_match("/api/v1/menus/1", "/api/v1/menus"));
    }

    #[test]
    fn test_named_segment() {
        assert!(key_match("/api/v1/menus/42", "/api/v1/menus/:id"));
        assert!(key_match("/api/v1/menus/42/enable", "/api/v1/menus/:id/enable"));
        assert!(!key_match("/api/v1/menus/", "/api/v1/menus/:id"));
        assert!(!key_match("/api/v1/menus/42/x", "/api/v1/menus/:id"));
    }

    #[test]
    fn test_trailing_wildcard() {
        assert!(key_match("/api/v1/menus", "/api/v1/*"));
        assert!(key_match("/api/v1/menus/42/enable", "/api/v1/*"));
        assert!(key_match("/api/v1/", "/api/v1/*"));
        assert!(!key_match("/api/v1", "/api/v1/*"));
    }

    #[test]
    fn test_method_matcher() {
        assert!(MethodMatcher::new("GET").is_match("GET"));
        assert!(!MethodMatcher::new("GET").is_match("GETX"));
        assert!(MethodMatcher::new("GET|POST").is_match("POST"));
        assert!(MethodMatcher::new(".*").is_match("DELETE"));
        assert!(MethodMatcher::new("(").is_match("("));
    }
}

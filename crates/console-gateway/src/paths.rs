//! Path joining for mount points and upstream paths.

use axum::http::Uri;

/// Join `base` and `suffix` with exactly one slash between them.
///
/// Both route patterns (`base_path` + literal) and upstream targets
/// (endpoint path + stripped request path) are built with this. An empty
/// suffix returns `base` untouched, so joining is idempotent.
pub fn single_joining_slash(base: &str, suffix: &str) -> String {
    if suffix.is_empty() {
        return base.to_string();
    }
    let base_slash = base.ends_with('/');
    let suffix_slash = suffix.starts_with('/');
    match (base_slash, suffix_slash) {
        (true, true) => format!("{}{}", base, &suffix[1..]),
        (false, false) => format!("{}/{}", base, suffix),
        _ => format!("{}{}", base, suffix),
    }
}

/// Normalize a configured base path so it starts and ends with `/`.
pub fn normalize_base_path(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() || trimmed == "/" {
        return "/".to_string();
    }
    let mut normalized = String::with_capacity(trimmed.len() + 2);
    if !trimmed.starts_with('/') {
        normalized.push('/');
    }
    normalized.push_str(trimmed);
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    normalized
}

/// Remove `prefix` from the path of `uri`, keeping the query.
///
/// The remainder always starts with `/`. `None` when the path does not
/// start with `prefix`.
pub fn strip_path_prefix(uri: &Uri, prefix: &str) -> Option<Uri> {
    let rest = uri.path().strip_prefix(prefix)?;
    let mut path_and_query = if rest.starts_with('/') {
        rest.to_string()
    } else {
        format!("/{rest}")
    };
    if let Some(query) = uri.query() {
        path_and_query.push('?');
        path_and_query.push_str(query);
    }
    path_and_query.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_slash_between_parts() {
        assert_eq!(single_joining_slash("/", "/api/"), "/api/");
        assert_eq!(single_joining_slash("/console", "api/"), "/console/api/");
        assert_eq!(single_joining_slash("/console/", "api/"), "/console/api/");
        assert_eq!(single_joining_slash("/console", "/api/"), "/console/api/");
        assert_eq!(single_joining_slash("", "api/v1/pods"), "/api/v1/pods");
    }

    #[test]
    fn test_empty_suffix() {
        assert_eq!(single_joining_slash("/console/", ""), "/console/");
        assert_eq!(single_joining_slash("/console", ""), "/console");
        assert_eq!(single_joining_slash("", ""), "");
    }

    #[test]
    fn test_join_is_idempotent_under_empty_suffix() {
        let bases = ["", "/", "/console", "/console/", "/a/b/"];
        let literals = [
            "/api/kubernetes/",
            "/api/prometheus/api/v1/query",
            "/auth/login",
            "api/",
            "",
            "/",
        ];

        for base in bases {
            for literal in literals {
                let once = single_joining_slash(base, literal);
                assert_eq!(
                    single_joining_slash(&once, ""),
                    once,
                    "base={base:?} literal={literal:?}"
                );
            }
        }
    }

    #[test]
    fn test_normalize_base_path() {
        assert_eq!(normalize_base_path(""), "/");
        assert_eq!(normalize_base_path("/"), "/");
        assert_eq!(normalize_base_path("console"), "/console/");
        assert_eq!(normalize_base_path("/console"), "/console/");
        assert_eq!(normalize_base_path("/console/"), "/console/");
    }

    #[test]
    fn test_strip_path_prefix() {
        let uri: Uri = "/console/api/kubernetes/api/v1/pods?watch=true".parse().unwrap();
        assert_eq!(
            strip_path_prefix(&uri, "/console/api/kubernetes/").unwrap(),
            "/api/v1/pods?watch=true"
        );

        let uri: Uri = "/static/main.js".parse().unwrap();
        assert_eq!(strip_path_prefix(&uri, "/static/").unwrap(), "/main.js");
        assert_eq!(strip_path_prefix(&uri, "/static/main.js").unwrap(), "/");
        assert!(strip_path_prefix(&uri, "/api/").is_none());
    }
}

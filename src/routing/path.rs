//! Path joining and normalization for route patterns

/// Normalize a route path lexically.
///
/// Collapses repeated slashes, drops `.` segments, resolves `..` against the
/// preceding segment and removes a trailing slash. The result is always
/// rooted, so an empty or fully-collapsed input yields `/`.
pub fn clean_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let mut out = String::with_capacity(path.len() + 1);
    for segment in &segments {
        out.push('/');
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Join a base prefix and a relative path, then normalize the result.
pub fn join_paths(base: &str, relative: &str) -> String {
    if relative.is_empty() {
        return clean_path(base);
    }
    clean_path(&format!("{base}/{relative}"))
}

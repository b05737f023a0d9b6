//! Pure glob matching for cache keys.
//!
//! Only `*` is special: it matches any run of characters, including none.
//! Every other character, `?` and `[` included, matches itself. Query strings
//! end up inside read-through keys, so a literal `?` has to stay literal.

/// Checks if a cache key matches a glob pattern.
///
/// # Examples
///
/// ```
/// use quill_core::cache::pattern_matches;
///
/// assert!(pattern_matches("user:123", "user:123"));
/// assert!(pattern_matches("GET:/api/posts*", "GET:/api/posts?page=2"));
/// assert!(pattern_matches("GET:/api/*/comments", "GET:/api/posts/comments"));
/// assert!(!pattern_matches("GET:/api/posts?*", "GET:/api/posts/42"));
/// ```
pub fn pattern_matches(pattern: &str, key: &str) -> bool {
    let mut segments = pattern.split('*');

    // `split` always yields at least one segment; the first one is anchored
    // at the start of the key.
    let head = segments.next().unwrap_or_default();
    let Some(mut remaining) = key.strip_prefix(head) else {
        return false;
    };

    let rest: Vec<&str> = segments.collect();
    let Some((last, middle)) = rest.split_last() else {
        // No wildcard at all.
        return remaining.is_empty();
    };

    for segment in middle.iter().filter(|s| !s.is_empty()) {
        match remaining.find(segment) {
            Some(pos) => remaining = &remaining[pos + segment.len()..],
            None => return false,
        }
    }

    // The last segment is anchored at the end of the key.
    remaining.ends_with(last)
}

/// Converts a cache pattern into a Redis `SCAN MATCH` glob.
///
/// Redis treats `?`, `[`, `]` and `\` as special; they are escaped so that
/// the store selects exactly the keys [`pattern_matches`] would.
pub fn to_redis_glob(pattern: &str) -> String {
    let mut glob = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if matches!(c, '?' | '[' | ']' | '\\') {
            glob.push('\\');
        }
        glob.push(c);
    }
    glob
}

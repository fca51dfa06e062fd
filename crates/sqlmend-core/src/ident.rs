//! Identifier normalization helpers
//!
//! All catalog lookups are case-insensitive and bracket-insensitive. These
//! helpers define the single normalization used everywhere: strip `[...]`
//! delimiters, drop a leading schema qualifier, lower-case.

/// Strip surrounding `[` `]` delimiters from an identifier token.
pub fn strip_brackets(token: &str) -> &str {
    let token = token.trim();
    token
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .unwrap_or(token)
}

/// Normalize an identifier for case-insensitive comparison.
///
/// Drops everything before the last `.` (schema qualifiers like
/// `dbo.Customers` or `[dbo].[Customers]`), strips the brackets from the
/// remaining segment, and lower-cases the result. Splitting happens before
/// bracket stripping so bracketed qualified forms keep balanced delimiters
/// on the final segment.
pub fn normalize(token: &str) -> String {
    let token = token.trim();
    let last = token.rsplit('.').next().unwrap_or(token);
    strip_brackets(last).to_lowercase()
}

/// Render a canonical identifier mirroring the quoting of the original token.
///
/// A token written as `[Email]` stays bracketed; a bare token stays bare
/// unless the canonical name contains characters that are not safe in a
/// bare identifier, in which case brackets are forced.
pub fn format_identifier(original: &str, canonical: &str) -> String {
    let original = original.trim();
    if original.starts_with('[') && original.ends_with(']') {
        return format!("[{}]", canonical);
    }
    if !is_safe_bare_identifier(canonical) {
        return format!("[{}]", canonical);
    }
    canonical.to_string()
}

/// Whether a name can be written without bracket delimiters.
pub fn is_safe_bare_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// SQL keywords that must never be treated as an alias or a bare column.
const SQL_KEYWORDS: &[&str] = &[
    "select", "from", "where", "join", "inner", "left", "right", "full", "cross", "outer", "on",
    "as", "and", "or", "not", "in", "is", "null", "like", "between", "exists", "group", "order",
    "by", "having", "union", "except", "intersect", "limit", "offset", "top", "distinct", "set",
    "insert", "into", "values", "update", "delete", "case", "when", "then", "else", "end", "asc",
    "desc", "with",
];

/// Case-insensitive check against the keyword stoplist.
pub fn is_sql_keyword(token: &str) -> bool {
    let lower = token.to_lowercase();
    SQL_KEYWORDS.contains(&lower.as_str())
}

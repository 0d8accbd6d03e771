//! Naming convention for deriving SQL identifiers from Rust names.
//!
//! Identifiers produced here (table and column names) are interpolated into
//! SQL text directly. They originate from type declarations, never from
//! caller-supplied free text, so no quoting layer sits between them and the
//! compiled statement.

/// Convert a CamelCase or snake_case name to snake_case.
///
/// Every uppercase letter after the first character gets an underscore
/// prefix, then the whole string is lowercased. Already-snake input passes
/// through unchanged.
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            out.push('_');
        }
        out.push(c.to_ascii_lowercase());
    }
    out
}

/// Derive a table name from a record type name.
///
/// Convention: snake_case of the type name, pluralized by appending `s`
/// (`User` -> `users`). Fixed by design, not configurable.
pub fn table_name(type_name: &str) -> String {
    let mut name = to_snake_case(type_name);
    name.push('s');
    name
}

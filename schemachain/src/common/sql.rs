use crate::errors::{ErrorKind, SchemaError, SchemaResult};

/// Quotes an identifier for use in generated DDL.
///
/// Embedded double quotes are doubled, so any table or column name round-trips.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Rejects identifiers that cannot name a structure.
pub fn validate_ident(name: &str, what: &str) -> SchemaResult<()> {
    if name.trim().is_empty() {
        log::error!("Empty {} name", what);
        return Err(SchemaError::new(
            &format!("{} name cannot be empty", what),
            ErrorKind::ValidationError,
        ));
    }
    if name.contains('\0') {
        return Err(SchemaError::new(
            &format!("{} name {:?} contains a NUL character", what, name),
            ErrorKind::ValidationError,
        ));
    }
    Ok(())
}

/// Quotes a string literal.
pub fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

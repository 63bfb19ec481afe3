//! Table-name resolution for queue types.
//!
//! The conventional policy maps a queue type's name to a table the way
//! ORMs do: `OrderJob` becomes `order_jobs`.

use crate::error::{Error, Result};
use heck::ToSnakeCase;

/// How a queue type without an explicit table name resolves one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableNaming {
    /// Derive the table from the type name (`OrderJob` -> `order_jobs`).
    #[default]
    Convention,
    /// No default. The queue type must override `table_name`.
    Strict,
}

impl TableNaming {
    /// Resolve a table name for a type called `type_name`.
    pub fn resolve(self, type_name: &str) -> Result<String> {
        match self {
            TableNaming::Convention => Ok(tableize(type_name)),
            TableNaming::Strict => Err(Error::Unimplemented("table_name")),
        }
    }
}

/// Lowercase, underscored, pluralized form of a CamelCase type name.
pub fn tableize(type_name: &str) -> String {
    pluralize(&short_type_name(type_name).to_snake_case())
}

/// Strip the module path and generic arguments from a `type_name` string.
pub fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    // Already plural: `tasks`, `order_items`. Singulars like `status` or
    // `address` still take `es`.
    if word.ends_with('s') && !["ss", "us", "is"].iter().any(|s| word.ends_with(s)) {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix('y') {
        let after_consonant = stem
            .chars()
            .last()
            .is_some_and(|c| !matches!(c, 'a' | 'e' | 'i' | 'o' | 'u'));
        if after_consonant {
            return format!("{stem}ies");
        }
    }
    if ["s", "x", "z", "ch", "sh"].iter().any(|s| word.ends_with(s)) {
        return format!("{word}es");
    }
    format!("{word}s")
}

/// Check that `name` is safe to splice into SQL as `table` or `db.table`.
pub fn validate_table_name(name: &str) -> Result<()> {
    let parts: Vec<&str> = name.split('.').collect();
    let valid = parts.len() <= 2
        && parts.iter().all(|part| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        });
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidTableName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tableize_pluralizes_snake_case() {
        assert_eq!(tableize("OrderJob"), "order_jobs");
        assert_eq!(tableize("Job"), "jobs");
        assert_eq!(tableize("Widget"), "widgets");
        assert_eq!(tableize("DeliveryBatch"), "delivery_batches");
        assert_eq!(tableize("EmailAddress"), "email_addresses");
        assert_eq!(tableize("Company"), "companies");
        assert_eq!(tableize("Survey"), "surveys");
        assert_eq!(tableize("Box"), "boxes");
        assert_eq!(tableize("Status"), "statuses");
    }

    #[test]
    fn tableize_keeps_plural_type_names() {
        assert_eq!(tableize("Tasks"), "tasks");
        assert_eq!(tableize("Users"), "users");
        assert_eq!(tableize("OrderItems"), "order_items");
    }

    #[test]
    fn tableize_ignores_module_path_and_generics() {
        assert_eq!(tableize("my_app::jobs::OrderJob"), "order_jobs");
        assert_eq!(tableize("my_app::Retry<my_app::Mail>"), "retries");
    }

    #[test]
    fn strict_naming_is_unimplemented() {
        assert!(matches!(
            TableNaming::Strict.resolve("OrderJob"),
            Err(Error::Unimplemented("table_name"))
        ));
        assert_eq!(TableNaming::Convention.resolve("OrderJob").unwrap(), "order_jobs");
    }

    #[test]
    fn table_names_are_validated() {
        assert!(validate_table_name("widgets").is_ok());
        assert!(validate_table_name("shop.order_jobs").is_ok());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("a.b.c").is_err());
        assert!(validate_table_name("jobs; DROP TABLE jobs").is_err());
        assert!(validate_table_name("jobs'").is_err());
        assert!(validate_table_name(".jobs").is_err());
    }
}

//! Backend-specific expressions reading text out of `principal.data`.
//!
//! Fixed keys bind the JSON path as a value. The login lookup needs a path
//! computed from another column (`user.login`), which each backend spells
//! differently.

use sea_orm::DbBackend;
use sea_orm::sea_query::{Expr, SimpleExpr};

/// JSON path selecting a top-level object key, quoted so that any key is
/// addressable.
#[must_use]
pub fn object_key_path(key: &str) -> String {
    format!("$.\"{}\"", key.replace('\\', "\\\\").replace('"', "\\\""))
}

/// `principal.data[key]` as text; `NULL` when the key is absent.
#[must_use]
pub fn data_text(backend: DbBackend, key: &str) -> SimpleExpr {
    match backend {
        DbBackend::Sqlite => Expr::cust_with_values(
            r#"CAST(json_extract("principal"."data", ?) AS TEXT)"#,
            [object_key_path(key)],
        ),
        DbBackend::Postgres => {
            Expr::cust_with_values(r#"("principal"."data" ->> ?)"#, [key.to_owned()])
        }
        DbBackend::MySql => Expr::cust_with_values(
            "JSON_UNQUOTE(JSON_EXTRACT(`principal`.`data`, ?))",
            [object_key_path(key)],
        ),
    }
}

/// JSON type family a criterion value has to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    Text,
    Integer,
}

/// True when `principal.data[key]` holds a JSON value of `kind`. Keeps a
/// text criterion from matching a stored number with the same rendering,
/// and the other way round.
#[must_use]
pub fn data_is(backend: DbBackend, key: &str, kind: JsonKind) -> SimpleExpr {
    match backend {
        DbBackend::Sqlite => {
            let name = match kind {
                JsonKind::Text => "text",
                JsonKind::Integer => "integer",
            };
            Expr::expr(Expr::cust_with_values(
                r#"json_type("principal"."data", ?)"#,
                [object_key_path(key)],
            ))
            .eq(name)
        }
        DbBackend::Postgres => {
            let name = match kind {
                JsonKind::Text => "string",
                JsonKind::Integer => "number",
            };
            Expr::expr(Expr::cust_with_values(
                r#"jsonb_typeof("principal"."data" -> ?)"#,
                [key.to_owned()],
            ))
            .eq(name)
        }
        DbBackend::MySql => {
            let name = match kind {
                JsonKind::Text => "STRING",
                JsonKind::Integer => "INTEGER",
            };
            Expr::expr(Expr::cust_with_values(
                "JSON_TYPE(JSON_EXTRACT(`principal`.`data`, ?))",
                [object_key_path(key)],
            ))
            .eq(name)
        }
    }
}

/// `principal.data[user.login]` as text, for the login lookup.
#[must_use]
pub fn login_text(backend: DbBackend) -> SimpleExpr {
    match backend {
        DbBackend::Sqlite => Expr::cust(
            r#"CAST(json_extract("principal"."data", '$."' || "user"."login" || '"') AS TEXT)"#,
        ),
        DbBackend::Postgres => Expr::cust(r#"("principal"."data" ->> "user"."login")"#),
        DbBackend::MySql => Expr::cust(
            "JSON_UNQUOTE(JSON_EXTRACT(`principal`.`data`, CONCAT('$.\"', `user`.`login`, '\"')))",
        ),
    }
}

/// Map the `*` wildcard to SQL `%`.
#[must_use]
pub fn like_pattern(value: &str) -> String {
    value.replace('*', "%")
}

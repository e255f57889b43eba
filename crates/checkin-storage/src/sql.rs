//! Statement text building.
//!
//! Identifiers (tables, columns) are validated and quoted before they are
//! spliced into SQL. Values never are: statements carry `:name`
//! placeholders which [`bind_named`] rewrites to positional `?` markers,
//! collecting the matching values in order.
//!
//! WHERE clauses are taken as caller-written SQL. They may reference
//! placeholders, but nothing stops a caller from formatting a value into
//! them; callers own that responsibility.

use crate::error::{StorageError, StorageResult};
use crate::params::{BindParameter, SqlValue};
use std::collections::BTreeSet;

/// A statement ready for the driver
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// Whether a statement produces a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Rows,
    Write,
}

impl StatementKind {
    pub fn of(sql: &str) -> Self {
        let upper = sql.trim_start().to_ascii_uppercase();
        let first = upper
            .split(|c: char| c.is_whitespace() || c == '(')
            .next()
            .unwrap_or_default();
        match first {
            "SELECT" | "WITH" | "PRAGMA" | "VALUES" | "EXPLAIN" => StatementKind::Rows,
            _ if upper.contains(" RETURNING ") => StatementKind::Rows,
            _ => StatementKind::Write,
        }
    }
}

/// Rewrite `:name` placeholders to `?` and collect their values
///
/// A key may be referenced more than once. Placeholders inside quoted
/// literals or identifiers are left alone, as are `::` sequences.
pub fn bind_named(sql: &str, params: &[BindParameter]) -> StorageResult<BoundStatement> {
    let mut out = String::with_capacity(sql.len());
    let mut values = Vec::new();
    let mut chars = sql.char_indices().peekable();
    let mut quote: Option<char> = None;

    while let Some((i, c)) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                out.push(c);
            }
            ':' if matches!(chars.peek(), Some((_, ':'))) => {
                out.push_str("::");
                chars.next();
            }
            ':' if chars.peek().is_some_and(|(_, n)| is_ident_start(*n)) => {
                let start = i + 1;
                let mut end = start;
                while let Some((j, n)) = chars.peek().copied() {
                    if is_ident_char(n) {
                        end = j + n.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let name = &sql[start..end];
                let param = params.iter().find(|p| p.key == name).ok_or_else(|| {
                    StorageError::Bind(format!("no value bound for placeholder :{name}"))
                })?;
                values.push(param.bound_value());
                out.push('?');
            }
            _ => out.push(c),
        }
    }

    if let Some(q) = quote {
        return Err(StorageError::Bind(format!("unterminated {q} quote in statement")));
    }

    Ok(BoundStatement { sql: out, values })
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Validate one identifier and return it double-quoted
///
/// Accepts `name` or `` `name` ``.
pub fn quote_identifier(name: &str) -> StorageResult<String> {
    let trimmed = name.trim();
    let bare = trimmed
        .strip_prefix('`')
        .and_then(|s| s.strip_suffix('`'))
        .unwrap_or(trimmed);

    let mut chars = bare.chars();
    let valid = chars.next().is_some_and(is_ident_start) && chars.all(is_ident_char);
    if !valid {
        return Err(StorageError::InvalidIdentifier {
            name: name.to_string(),
            reason: "must match [A-Za-z_][A-Za-z0-9_]*".to_string(),
        });
    }

    Ok(format!("\"{bare}\""))
}

/// Column named by a parameter key; the key doubles as placeholder name,
/// so it must be a bare identifier.
fn param_column(key: &str) -> StorageResult<String> {
    let quoted = quote_identifier(key)?;
    if quoted[1..quoted.len() - 1] != *key {
        return Err(StorageError::InvalidIdentifier {
            name: key.to_string(),
            reason: "parameter keys must be bare identifiers".to_string(),
        });
    }
    Ok(quoted)
}

/// Validate a table name against syntax and, when present, the allow-list
pub fn table_identifier(
    name: &str,
    allowed: Option<&BTreeSet<String>>,
) -> StorageResult<String> {
    let quoted = quote_identifier(name)?;
    if let Some(allowed) = allowed {
        let bare = &quoted[1..quoted.len() - 1];
        if !allowed.contains(bare) {
            return Err(StorageError::InvalidIdentifier {
                name: name.to_string(),
                reason: "table is not in the allow-list".to_string(),
            });
        }
    }
    Ok(quoted)
}

/// Validate a comma-separated table list
pub fn table_list(list: &str, allowed: Option<&BTreeSet<String>>) -> StorageResult<String> {
    let tables = list
        .split(',')
        .map(|t| table_identifier(t, allowed))
        .collect::<StorageResult<Vec<_>>>()?;
    Ok(tables.join(", "))
}

/// Validate a column list; `*` selects everything
pub fn column_list(list: &str) -> StorageResult<String> {
    if list.trim() == "*" {
        return Ok("*".to_string());
    }
    let columns = list
        .split(',')
        .map(quote_identifier)
        .collect::<StorageResult<Vec<_>>>()?;
    Ok(columns.join(", "))
}

pub fn select(tables: &str, columns: &str, where_clause: &str) -> String {
    let mut sql = format!("SELECT {columns} FROM {tables}");
    if !where_clause.trim().is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(where_clause);
    }
    sql
}

/// `INSERT`/`REPLACE` text for the keyed parameters
///
/// Parameters with an empty key are left out of the column list.
pub fn insert(verb: &str, table: &str, params: &[BindParameter]) -> StorageResult<String> {
    let keyed: Vec<&BindParameter> = params.iter().filter(|p| !p.key.is_empty()).collect();
    if keyed.is_empty() {
        return Ok(format!("{verb} INTO {table} DEFAULT VALUES"));
    }

    let columns = keyed
        .iter()
        .map(|p| param_column(&p.key))
        .collect::<StorageResult<Vec<_>>>()?;
    let placeholders: Vec<String> = keyed.iter().map(|p| format!(":{}", p.key)).collect();

    Ok(format!(
        "{verb} INTO {table} ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    ))
}

/// `UPDATE` text: one `column = :column` pair per parameter
pub fn update(table: &str, params: &[BindParameter], where_clause: &str) -> StorageResult<String> {
    if params.is_empty() {
        return Err(StorageError::Bind(
            "update needs at least one column to set".to_string(),
        ));
    }
    require_where("update", where_clause)?;

    let assignments = params
        .iter()
        .map(|p| Ok(format!("{} = :{}", param_column(&p.key)?, p.key)))
        .collect::<StorageResult<Vec<_>>>()?;

    Ok(format!(
        "UPDATE {table} SET {} WHERE {where_clause}",
        assignments.join(", ")
    ))
}

pub fn delete(table: &str, where_clause: &str) -> StorageResult<String> {
    require_where("delete", where_clause)?;
    Ok(format!("DELETE FROM {table} WHERE {where_clause}"))
}

fn require_where(op: &str, where_clause: &str) -> StorageResult<()> {
    if where_clause.trim().is_empty() {
        return Err(StorageError::Bind(format!("{op} needs a WHERE clause")));
    }
    Ok(())
}

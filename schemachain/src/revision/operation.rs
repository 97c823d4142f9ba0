use crate::common::{quote_ident, validate_ident, SqlValue};
use crate::errors::{ErrorKind, SchemaError, SchemaResult};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// How an added column's default reaches rows that existed before the column.
///
/// Some engines apply a `DEFAULT` only to rows inserted afterwards, others expose it on
/// every row. The policy makes the outcome explicit instead of engine-dependent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultPolicy {
    /// Existing rows receive the default value.
    #[default]
    Backfill,
    /// Existing rows hold NULL; only rows inserted later receive the default.
    LeaveNull,
}

/// Column definition used by `add_column` and `create_table`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub sql_type: String,
    #[serde(default = "nullable_by_default")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<SqlValue>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub primary_key: bool,
}

fn nullable_by_default() -> bool {
    true
}

impl ColumnDef {
    /// Creates a nullable column without a default.
    pub fn new(name: &str, sql_type: &str) -> Self {
        ColumnDef {
            name: name.to_string(),
            sql_type: sql_type.to_string(),
            nullable: true,
            default: None,
            primary_key: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn default_value<V: Into<SqlValue>>(mut self, value: V) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub(crate) fn validate(&self) -> SchemaResult<()> {
        validate_ident(&self.name, "Column")?;
        if self.sql_type.trim().is_empty() {
            return Err(SchemaError::new(
                &format!("Column {} has no type", self.name),
                ErrorKind::ValidationError,
            ));
        }
        if let Some(default) = &self.default {
            default.to_sql_literal()?;
        }
        Ok(())
    }

    /// Renders the column clause, e.g. `"is_verified" BOOLEAN NOT NULL DEFAULT FALSE`.
    pub(crate) fn to_sql(&self) -> SchemaResult<String> {
        let mut sql = format!("{} {}", quote_ident(&self.name), self.sql_type.trim());
        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        if !self.nullable {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = &self.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(&default.to_sql_literal()?);
        }
        Ok(sql)
    }
}

/// A single structural change.
///
/// Operations are descriptions, not actions: execution and precondition checks live in
/// [`crate::migration`]. Serialized form is an object tagged by `op`:
///
/// ```json
/// {"op": "rename_column", "table": "agents", "from": "endpoint_url", "to": "endpoint"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    AddColumn {
        table: String,
        column: ColumnDef,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        policy: Option<DefaultPolicy>,
    },
    DropColumn {
        table: String,
        column: String,
    },
    RenameColumn {
        table: String,
        from: String,
        to: String,
    },
    CreateTable {
        table: String,
        columns: Vec<ColumnDef>,
    },
    DropTable {
        table: String,
    },
    RenameTable {
        from: String,
        to: String,
    },
    CreateIndex {
        name: String,
        table: String,
        columns: Vec<String>,
        #[serde(default)]
        unique: bool,
    },
    DropIndex {
        name: String,
    },
    /// Raw SQL with no structural precondition.
    Sql {
        statement: String,
    },
}

impl Operation {
    pub fn add_column(table: &str, column: ColumnDef) -> Self {
        Operation::AddColumn {
            table: table.to_string(),
            column,
            policy: None,
        }
    }

    pub fn add_column_with_policy(table: &str, column: ColumnDef, policy: DefaultPolicy) -> Self {
        Operation::AddColumn {
            table: table.to_string(),
            column,
            policy: Some(policy),
        }
    }

    pub fn drop_column(table: &str, column: &str) -> Self {
        Operation::DropColumn {
            table: table.to_string(),
            column: column.to_string(),
        }
    }

    pub fn rename_column(table: &str, from: &str, to: &str) -> Self {
        Operation::RenameColumn {
            table: table.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn create_table(table: &str, columns: Vec<ColumnDef>) -> Self {
        Operation::CreateTable {
            table: table.to_string(),
            columns,
        }
    }

    pub fn drop_table(table: &str) -> Self {
        Operation::DropTable {
            table: table.to_string(),
        }
    }

    pub fn rename_table(from: &str, to: &str) -> Self {
        Operation::RenameTable {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn create_index(name: &str, table: &str, columns: &[&str], unique: bool) -> Self {
        Operation::CreateIndex {
            name: name.to_string(),
            table: table.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique,
        }
    }

    pub fn drop_index(name: &str) -> Self {
        Operation::DropIndex {
            name: name.to_string(),
        }
    }

    pub fn sql(statement: &str) -> Self {
        Operation::Sql {
            statement: statement.to_string(),
        }
    }

    /// Checks that the description is well formed. Does not consult any database.
    pub fn validate(&self) -> SchemaResult<()> {
        match self {
            Operation::AddColumn {
                table,
                column,
                policy,
            } => {
                validate_ident(table, "Table")?;
                column.validate()?;
                if column.primary_key {
                    return Err(SchemaError::new(
                        &format!("Cannot add primary key column {}.{}", table, column.name),
                        ErrorKind::ValidationError,
                    ));
                }
                let has_default = column.default.as_ref().is_some_and(|d| !d.is_null());
                if !column.nullable && !has_default {
                    return Err(SchemaError::new(
                        &format!(
                            "NOT NULL column {}.{} needs a non-null default",
                            table, column.name
                        ),
                        ErrorKind::ValidationError,
                    ));
                }
                if *policy == Some(DefaultPolicy::LeaveNull) && !column.nullable {
                    return Err(SchemaError::new(
                        &format!(
                            "Column {}.{} is NOT NULL and cannot leave existing rows null",
                            table, column.name
                        ),
                        ErrorKind::ValidationError,
                    ));
                }
                Ok(())
            }
            Operation::DropColumn { table, column } => {
                validate_ident(table, "Table")?;
                validate_ident(column, "Column")
            }
            Operation::RenameColumn { table, from, to } => {
                validate_ident(table, "Table")?;
                validate_ident(from, "Column")?;
                validate_ident(to, "Column")?;
                reject_identity_rename(from, to)
            }
            Operation::CreateTable { table, columns } => {
                validate_ident(table, "Table")?;
                if columns.is_empty() {
                    return Err(SchemaError::new(
                        &format!("Table {} needs at least one column", table),
                        ErrorKind::ValidationError,
                    ));
                }
                columns.iter().try_for_each(ColumnDef::validate)
            }
            Operation::DropTable { table } => validate_ident(table, "Table"),
            Operation::RenameTable { from, to } => {
                validate_ident(from, "Table")?;
                validate_ident(to, "Table")?;
                reject_identity_rename(from, to)
            }
            Operation::CreateIndex {
                name,
                table,
                columns,
                ..
            } => {
                validate_ident(name, "Index")?;
                validate_ident(table, "Table")?;
                if columns.is_empty() {
                    return Err(SchemaError::new(
                        &format!("Index {} needs at least one column", name),
                        ErrorKind::ValidationError,
                    ));
                }
                columns.iter().try_for_each(|c| validate_ident(c, "Column"))
            }
            Operation::DropIndex { name } => validate_ident(name, "Index"),
            Operation::Sql { statement } => {
                if statement.trim().is_empty() {
                    return Err(SchemaError::new(
                        "SQL statement cannot be empty",
                        ErrorKind::ValidationError,
                    ));
                }
                Ok(())
            }
        }
    }

    /// Derives the operation that undoes this one at the schema level.
    ///
    /// Fails with `ValidationError` for operations whose inverse needs information the
    /// description does not carry (a dropped column's type, a dropped table's columns).
    pub fn inverse(&self) -> SchemaResult<Operation> {
        match self {
            Operation::AddColumn { table, column, .. } => {
                Ok(Operation::drop_column(table, &column.name))
            }
            Operation::RenameColumn { table, from, to } => {
                Ok(Operation::rename_column(table, to, from))
            }
            Operation::CreateTable { table, .. } => Ok(Operation::drop_table(table)),
            Operation::RenameTable { from, to } => Ok(Operation::rename_table(to, from)),
            Operation::CreateIndex { name, .. } => Ok(Operation::drop_index(name)),
            Operation::DropColumn { .. }
            | Operation::DropTable { .. }
            | Operation::DropIndex { .. }
            | Operation::Sql { .. } => Err(SchemaError::new(
                &format!("No automatic inverse for: {}", self),
                ErrorKind::ValidationError,
            )),
        }
    }
}

fn reject_identity_rename(from: &str, to: &str) -> SchemaResult<()> {
    if from == to {
        return Err(SchemaError::new(
            &format!("Rename of {} to itself", from),
            ErrorKind::ValidationError,
        ));
    }
    Ok(())
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::AddColumn { table, column, .. } => match &column.default {
                Some(default) => write!(
                    f,
                    "add column {}.{} {} default {}",
                    table, column.name, column.sql_type, default
                ),
                None => write!(f, "add column {}.{} {}", table, column.name, column.sql_type),
            },
            Operation::DropColumn { table, column } => {
                write!(f, "drop column {}.{}", table, column)
            }
            Operation::RenameColumn { table, from, to } => {
                write!(f, "rename column {}.{} to {}", table, from, to)
            }
            Operation::CreateTable { table, columns } => {
                write!(f, "create table {} ({} columns)", table, columns.len())
            }
            Operation::DropTable { table } => write!(f, "drop table {}", table),
            Operation::RenameTable { from, to } => write!(f, "rename table {} to {}", from, to),
            Operation::CreateIndex {
                name,
                table,
                columns,
                unique,
            } => write!(
                f,
                "create {}index {} on {}({})",
                if *unique { "unique " } else { "" },
                name,
                table,
                columns.join(", ")
            ),
            Operation::DropIndex { name } => write!(f, "drop index {}", name),
            Operation::Sql { statement } => {
                let first_line = statement.lines().next().unwrap_or_default().trim();
                write!(f, "sql: {}", first_line)
            }
        }
    }
}

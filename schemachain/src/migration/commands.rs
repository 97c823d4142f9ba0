use crate::common::quote_ident;
use crate::errors::{ErrorKind, SchemaError, SchemaResult};
use crate::inspector::{column_exists, index_exists, table_exists};
use crate::revision::{DefaultPolicy, Operation};
use rusqlite::Connection;

/// Executable form of an [`Operation`].
pub(crate) trait Command {
    /// Fails with `StructuralMismatch` when the live schema is not in the state the command
    /// expects to start from.
    fn check(&self, conn: &Connection) -> SchemaResult<()>;

    /// Fails with `ValidationError` when the effective default policy cannot be honoured,
    /// such as leaving existing rows null under a NOT NULL column.
    fn check_policy(&self, policy: DefaultPolicy) -> SchemaResult<()>;

    /// Runs the DDL. `policy` applies when the command does not carry its own.
    fn execute(&self, conn: &Connection, policy: DefaultPolicy) -> SchemaResult<()>;
}

fn mismatch(message: String) -> SchemaError {
    SchemaError::new(&message, ErrorKind::StructuralMismatch)
}

fn require_table(conn: &Connection, table: &str) -> SchemaResult<()> {
    if !table_exists(conn, table)? {
        return Err(mismatch(format!("table {} does not exist", table)));
    }
    Ok(())
}

fn require_absent_table(conn: &Connection, table: &str) -> SchemaResult<()> {
    if table_exists(conn, table)? {
        return Err(mismatch(format!("table {} already exists", table)));
    }
    Ok(())
}

fn require_column(conn: &Connection, table: &str, column: &str) -> SchemaResult<()> {
    if !column_exists(conn, table, column)? {
        return Err(mismatch(format!("column {}.{} does not exist", table, column)));
    }
    Ok(())
}

fn require_absent_column(conn: &Connection, table: &str, column: &str) -> SchemaResult<()> {
    if column_exists(conn, table, column)? {
        return Err(mismatch(format!("column {}.{} already exists", table, column)));
    }
    Ok(())
}

impl Command for Operation {
    fn check(&self, conn: &Connection) -> SchemaResult<()> {
        match self {
            Operation::AddColumn { table, column, .. } => {
                require_table(conn, table)?;
                require_absent_column(conn, table, &column.name)
            }
            Operation::DropColumn { table, column } => {
                require_table(conn, table)?;
                require_column(conn, table, column)
            }
            Operation::RenameColumn { table, from, to } => {
                require_table(conn, table)?;
                require_column(conn, table, from)?;
                require_absent_column(conn, table, to)
            }
            Operation::CreateTable { table, .. } => require_absent_table(conn, table),
            Operation::DropTable { table } => require_table(conn, table),
            Operation::RenameTable { from, to } => {
                require_table(conn, from)?;
                require_absent_table(conn, to)
            }
            Operation::CreateIndex {
                name,
                table,
                columns,
                ..
            } => {
                require_table(conn, table)?;
                for column in columns {
                    require_column(conn, table, column)?;
                }
                if index_exists(conn, name)? {
                    return Err(mismatch(format!("index {} already exists", name)));
                }
                Ok(())
            }
            Operation::DropIndex { name } => {
                if !index_exists(conn, name)? {
                    return Err(mismatch(format!("index {} does not exist", name)));
                }
                Ok(())
            }
            Operation::Sql { .. } => Ok(()),
        }
    }

    fn check_policy(&self, policy: DefaultPolicy) -> SchemaResult<()> {
        if let Operation::AddColumn {
            table,
            column,
            policy: own_policy,
        } = self
        {
            let has_default = column.default.as_ref().map_or(false, |d| !d.is_null());
            let leave_null = own_policy.unwrap_or(policy) == DefaultPolicy::LeaveNull;
            if has_default && leave_null && !column.nullable {
                log::error!(
                    "Column {}.{} is NOT NULL and cannot leave existing rows null",
                    table,
                    column.name
                );
                return Err(SchemaError::new(
                    &format!(
                        "Column {}.{} is NOT NULL and cannot leave existing rows null",
                        table, column.name
                    ),
                    ErrorKind::ValidationError,
                ));
            }
        }
        Ok(())
    }

    fn execute(&self, conn: &Connection, policy: DefaultPolicy) -> SchemaResult<()> {
        self.check_policy(policy)?;
        match self {
            Operation::AddColumn {
                table,
                column,
                policy: own_policy,
            } => {
                conn.execute_batch(&format!(
                    "ALTER TABLE {} ADD COLUMN {}",
                    quote_ident(table),
                    column.to_sql()?
                ))?;

                let default = column.default.as_ref().filter(|d| !d.is_null());
                match (own_policy.unwrap_or(policy), default) {
                    (DefaultPolicy::Backfill, Some(default)) => {
                        let updated = conn.execute(
                            &format!(
                                "UPDATE {table} SET {col} = {value} WHERE {col} IS NULL",
                                table = quote_ident(table),
                                col = quote_ident(&column.name),
                                value = default.to_sql_literal()?
                            ),
                            [],
                        )?;
                        log::debug!("Backfilled {} row(s) of {}.{}", updated, table, column.name);
                    }
                    (DefaultPolicy::LeaveNull, Some(_)) => {
                        // every row present now predates the column
                        conn.execute(
                            &format!(
                                "UPDATE {} SET {} = NULL",
                                quote_ident(table),
                                quote_ident(&column.name)
                            ),
                            [],
                        )?;
                    }
                    (_, None) => {}
                }
                Ok(())
            }
            Operation::DropColumn { table, column } => {
                conn.execute_batch(&format!(
                    "ALTER TABLE {} DROP COLUMN {}",
                    quote_ident(table),
                    quote_ident(column)
                ))?;
                Ok(())
            }
            Operation::RenameColumn { table, from, to } => {
                conn.execute_batch(&format!(
                    "ALTER TABLE {} RENAME COLUMN {} TO {}",
                    quote_ident(table),
                    quote_ident(from),
                    quote_ident(to)
                ))?;
                Ok(())
            }
            Operation::CreateTable { table, columns } => {
                let definitions = columns
                    .iter()
                    .map(|c| c.to_sql())
                    .collect::<SchemaResult<Vec<String>>>()?;
                conn.execute_batch(&format!(
                    "CREATE TABLE {} ({})",
                    quote_ident(table),
                    definitions.join(", ")
                ))?;
                Ok(())
            }
            Operation::DropTable { table } => {
                conn.execute_batch(&format!("DROP TABLE {}", quote_ident(table)))?;
                Ok(())
            }
            Operation::RenameTable { from, to } => {
                conn.execute_batch(&format!(
                    "ALTER TABLE {} RENAME TO {}",
                    quote_ident(from),
                    quote_ident(to)
                ))?;
                Ok(())
            }
            Operation::CreateIndex {
                name,
                table,
                columns,
                unique,
            } => {
                let columns: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
                conn.execute_batch(&format!(
                    "CREATE {}INDEX {} ON {} ({})",
                    if *unique { "UNIQUE " } else { "" },
                    quote_ident(name),
                    quote_ident(table),
                    columns.join(", ")
                ))?;
                Ok(())
            }
            Operation::DropIndex { name } => {
                conn.execute_batch(&format!("DROP INDEX {}", quote_ident(name)))?;
                Ok(())
            }
            Operation::Sql { statement } => {
                conn.execute_batch(statement)?;
                Ok(())
            }
        }
    }
}

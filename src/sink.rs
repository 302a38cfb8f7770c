//! ScyllaDB sink: idempotent schema bootstrap and upsert-by-key writes
use anyhow::{Context, Result};
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::statement::prepared::PreparedStatement;
use tracing::info;

use crate::{record::MovieRecord, settings};

pub struct MovieSink {
    session: Session,
    insert: PreparedStatement,
}

impl MovieSink {
    /// Connects, bootstraps the schema and prepares the insert. Any failure
    /// here is fatal to the ingest process (it has nothing to write into).
    pub async fn connect(cfg: &settings::Scylla) -> Result<MovieSink> {
        let keyspace = cfg.keyspace.as_deref().unwrap_or("reelfeed");
        let table = cfg.table.as_deref().unwrap_or("movies");

        let session = SessionBuilder::new()
            .known_node(&cfg.node)
            .build()
            .await
            .with_context(|| format!("connecting to scylla at {}", cfg.node))?;
        info!(node = %cfg.node, "connected to scylla");

        ensure_schema(&session, keyspace, table).await?;

        let insert = session
            .prepare(insert_cql(keyspace, table))
            .await
            .context("preparing insert")?;
        Ok(MovieSink { session, insert })
    }

    /// CQL INSERT is an upsert keyed by (title, year), so re-delivered
    /// messages overwrite the same row instead of duplicating it.
    pub async fn insert(&self, record: &MovieRecord) -> Result<()> {
        self.session
            .execute_unpaged(
                &self.insert,
                (
                    &record.title,
                    &record.year,
                    &record.director,
                    &record.actors,
                    &record.plot,
                    record.ratings_map(),
                    &record.box_office,
                ),
            )
            .await
            .with_context(|| format!("inserting {} ({})", record.title, record.year))?;
        Ok(())
    }
}

/// Safe to run on every startup: both statements are IF NOT EXISTS.
async fn ensure_schema(session: &Session, keyspace: &str, table: &str) -> Result<()> {
    session
        .query_unpaged(create_keyspace_cql(keyspace), &[])
        .await
        .with_context(|| format!("creating keyspace {keyspace}"))?;
    session
        .query_unpaged(create_table_cql(keyspace, table), &[])
        .await
        .with_context(|| format!("creating table {keyspace}.{table}"))?;
    info!(keyspace, table, "schema is ready");
    Ok(())
}

fn create_keyspace_cql(keyspace: &str) -> String {
    format!(
        "CREATE KEYSPACE IF NOT EXISTS {keyspace} \
         WITH replication = {{'class': 'SimpleStrategy', 'replication_factor': '1'}}"
    )
}

fn create_table_cql(keyspace: &str, table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {keyspace}.{table} (
            title TEXT,
            year TEXT,
            director TEXT,
            actors TEXT,
            plot TEXT,
            ratings MAP<TEXT, TEXT>,
            box_office TEXT,
            PRIMARY KEY (title, year)
        )"
    )
}

fn insert_cql(keyspace: &str, table: &str) -> String {
    format!(
        "INSERT INTO {keyspace}.{table} \
         (title, year, director, actors, plot, ratings, box_office) \
         VALUES (?, ?, ?, ?, ?, ?, ?)"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_statements_are_idempotent() {
        assert!(create_keyspace_cql("reelfeed").contains("IF NOT EXISTS"));
        assert!(create_table_cql("reelfeed", "movies").contains("IF NOT EXISTS"));
    }

    #[test]
    fn table_is_keyed_by_title_and_year() {
        let cql = create_table_cql("reelfeed", "movies");
        assert!(cql.contains("PRIMARY KEY (title, year)"));
        assert!(cql.contains("ratings MAP<TEXT, TEXT>"));
    }

    #[test]
    fn insert_targets_all_columns() {
        let cql = insert_cql("reelfeed", "movies");
        assert!(cql.contains("(title, year, director, actors, plot, ratings, box_office)"));
        assert_eq!(cql.matches('?').count(), 7);
    }
}

//! Comparisons against a live PostgreSQL database.
//!
//! Requires `--features postgres` and a database reachable through
//! `TERM_RECONCILE_PG_URL`, e.g.
//! `host=localhost user=postgres password=postgres dbname=reconcile`.

#[cfg(all(test, feature = "postgres"))]
mod tests {
    use std::sync::Arc;
    use term_reconcile::compare::fetch_columns;
    use term_reconcile::core::{
        ComparisonKind, ComparisonSuite, MismatchKind, SemanticType, TableDescriptor,
        VerdictStatus,
    };
    use term_reconcile::engine::PostgresEngine;
    use tokio_postgres::NoTls;

    async fn connect() -> Result<tokio_postgres::Client, Box<dyn std::error::Error>> {
        let url = std::env::var("TERM_RECONCILE_PG_URL")?;
        let (client, connection) = tokio_postgres::connect(&url, NoTls).await?;
        tokio::spawn(async move {
            let _ = connection.await;
        });
        Ok(client)
    }

    #[tokio::test]
    #[ignore = "requires a PostgreSQL database"]
    async fn test_information_schema_metadata() -> Result<(), Box<dyn std::error::Error>> {
        let client = connect().await?;
        client
            .batch_execute(
                "DROP TABLE IF EXISTS public.reconcile_products;
                 CREATE TABLE public.reconcile_products (
                     id BIGINT NOT NULL,
                     name VARCHAR(120),
                     price NUMERIC(10,2) NOT NULL DEFAULT 0
                 );",
            )
            .await?;

        let table = TableDescriptor::new(
            Arc::new(PostgresEngine::new(client)),
            "public",
            "reconcile_products",
        )?;
        let columns = fetch_columns(&table).await?;

        assert_eq!(columns.len(), 3);
        assert_eq!(columns[1].declared_type, SemanticType::Text);
        assert_eq!(columns[1].max_length, Some(120));
        assert_eq!(columns[2].declared_type, SemanticType::Decimal);
        assert_eq!(columns[2].numeric_precision, Some(10));
        assert_eq!(columns[2].numeric_scale, Some(2));
        assert!(!columns[2].is_nullable);
        assert!(columns[2].default_value.is_some());
        Ok(())
    }

    #[tokio::test]
    #[ignore = "requires a PostgreSQL database"]
    async fn test_smoke_suite_between_schemas() -> Result<(), Box<dyn std::error::Error>> {
        let client = connect().await?;
        client
            .batch_execute(
                "CREATE SCHEMA IF NOT EXISTS reconcile_src;
                 CREATE SCHEMA IF NOT EXISTS reconcile_tgt;
                 DROP TABLE IF EXISTS reconcile_src.contacts;
                 DROP TABLE IF EXISTS reconcile_tgt.contacts;
                 CREATE TABLE reconcile_src.contacts (id INT NOT NULL, phone VARCHAR(20));
                 CREATE TABLE reconcile_tgt.contacts (id INT NOT NULL, phone VARCHAR(40));
                 INSERT INTO reconcile_src.contacts SELECT g, '555' FROM generate_series(1, 10) g;
                 INSERT INTO reconcile_tgt.contacts SELECT g, '555' FROM generate_series(1, 10) g;",
            )
            .await?;

        let engine = Arc::new(PostgresEngine::new(client));
        let source = TableDescriptor::parse(engine.clone(), "reconcile_src.contacts")?;
        let target = TableDescriptor::parse(engine, "reconcile_tgt.contacts")?;

        let verdict = ComparisonSuite::builder("pg_smoke")
            .kinds(ComparisonKind::SMOKE)
            .build()
            .run(&source, &target)
            .await?;

        assert_eq!(verdict.status, VerdictStatus::Fail);
        assert_eq!(
            verdict.component_status(ComparisonKind::RowCount),
            Some(VerdictStatus::Pass)
        );
        assert_eq!(verdict.sample_mismatches[0].kind, MismatchKind::LengthMismatch);
        Ok(())
    }
}

//! Comparison suite for running several comparators against one table pair.

use super::{
    ComparisonKind, ComparisonOptions, ComponentError, ComponentOutcome, TableDescriptor,
    ValidationVerdict, VerdictAggregator,
};
use crate::compare::{
    check_table_rows, compare_column_values, compare_null_patterns, compare_row_counts,
    diff_schemas, fetch_columns, SchemaDiff,
};
use crate::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// A named bundle of comparisons run against a source/target pair.
///
/// A suite with a single kind is a plain comparison; bundling several (for
/// instance [`ComparisonKind::SMOKE`]) yields one aggregated verdict.
///
/// # Examples
///
/// ```rust
/// use term_reconcile::core::{ComparisonKind, ComparisonOptions, ComparisonSuite};
///
/// let suite = ComparisonSuite::builder("orders_migration")
///     .description("Orders table after nightly load")
///     .kinds(ComparisonKind::SMOKE)
///     .options(ComparisonOptions::new().with_row_count_tolerance(0.01))
///     .build();
///
/// assert_eq!(suite.name(), "orders_migration");
/// assert_eq!(suite.kinds().len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct ComparisonSuite {
    name: String,
    description: Option<String>,
    kinds: BTreeSet<ComparisonKind>,
    options: ComparisonOptions,
}

impl ComparisonSuite {
    /// Creates a new builder for constructing a comparison suite.
    pub fn builder(name: impl Into<String>) -> ComparisonSuiteBuilder {
        ComparisonSuiteBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Requested kinds in precedence order.
    pub fn kinds(&self) -> Vec<ComparisonKind> {
        self.kinds.iter().copied().collect()
    }

    pub fn options(&self) -> &ComparisonOptions {
        &self.options
    }

    /// Checks that the suite can run at all.
    fn validate(&self) -> Result<()> {
        if self.kinds.is_empty() {
            return Err(TermError::configuration(format!(
                "suite '{}' requests no comparisons",
                self.name
            )));
        }
        self.options.validate()?;
        if self.kinds.contains(&ComparisonKind::ColumnValues)
            && self.options.compare_column.is_none()
        {
            return Err(TermError::configuration(
                "column value comparison requires compare_column",
            ));
        }
        Ok(())
    }

    /// Runs every requested comparison and aggregates the results.
    ///
    /// Only configuration errors are returned as `Err`. Any other failure is
    /// recorded as an ERROR component so the remaining comparisons still
    /// report.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use term_reconcile::core::{ComparisonKind, ComparisonSuite, TableDescriptor, VerdictStatus};
    /// use term_reconcile::engine::DataFusionEngine;
    /// use datafusion::prelude::SessionContext;
    /// use std::sync::Arc;
    ///
    /// # async fn example(source_ctx: SessionContext, target_ctx: SessionContext) -> term_reconcile::error::Result<()> {
    /// let source = TableDescriptor::parse(Arc::new(DataFusionEngine::new(source_ctx)), "public.orders")?;
    /// let target = TableDescriptor::parse(Arc::new(DataFusionEngine::new(target_ctx)), "public.orders")?;
    ///
    /// let verdict = ComparisonSuite::builder("orders")
    ///     .kinds(ComparisonKind::SMOKE)
    ///     .build()
    ///     .run(&source, &target)
    ///     .await?;
    ///
    /// if verdict.status != VerdictStatus::Pass {
    ///     println!("{}", verdict.message);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(
        skip(self, source, target),
        fields(
            suite.name = %self.name,
            source.table = %source,
            target.table = %target,
            result.status = tracing::field::Empty
        )
    )]
    pub async fn run(
        &self,
        source: &TableDescriptor,
        target: &TableDescriptor,
    ) -> Result<ValidationVerdict> {
        self.validate()?;
        let start_time = Instant::now();
        info!(
            suite.name = %self.name,
            suite.kinds = ?self.kinds,
            "Starting comparison suite"
        );

        let needs_schema = self.kinds.contains(&ComparisonKind::Schema)
            || self.kinds.contains(&ComparisonKind::NullPattern);
        let schema = if needs_schema {
            Some(self.introspect(source, target).await?)
        } else {
            None
        };

        let mut results = BTreeMap::new();
        for kind in &self.kinds {
            let outcome = match (kind, &schema) {
                (ComparisonKind::Schema, Some(Ok(diff))) => ComponentOutcome::Schema(diff.clone()),
                (ComparisonKind::NullPattern, Some(Ok(diff))) => capture(
                    *kind,
                    compare_null_patterns(
                        source,
                        target,
                        &diff.shared_columns,
                        self.options.null_divergence_threshold,
                    )
                    .await
                    .map(ComponentOutcome::NullPattern),
                )?,
                (ComparisonKind::Schema | ComparisonKind::NullPattern, Some(Err(err))) => {
                    ComponentOutcome::Error(err.clone())
                }
                _ => capture(*kind, self.run_query_component(*kind, source, target).await)?,
            };
            debug!(kind = %kind, status = %outcome.status(), "Component finished");
            results.insert(*kind, outcome);
        }

        let verdict =
            VerdictAggregator::new(self.options.sample_cap).aggregate(results, start_time.elapsed());
        tracing::Span::current().record("result.status", verdict.status.as_str());
        info!(
            suite.name = %self.name,
            result.status = %verdict.status,
            samples = verdict.sample_mismatches.len(),
            duration_ms = verdict.duration.as_millis() as u64,
            "Comparison suite completed"
        );
        Ok(verdict)
    }

    /// Introspects both sides once; a failure is kept for every component
    /// that depends on the schema.
    async fn introspect(
        &self,
        source: &TableDescriptor,
        target: &TableDescriptor,
    ) -> Result<std::result::Result<SchemaDiff, ComponentError>> {
        let columns = async {
            let source_columns = fetch_columns(source).await?;
            let target_columns = fetch_columns(target).await?;
            Ok::<_, TermError>((source_columns, target_columns))
        }
        .await;

        match columns {
            Ok((source_columns, target_columns)) => {
                Ok(Ok(diff_schemas(&source_columns, &target_columns)))
            }
            Err(e) if e.is_fail_fast() => Err(e),
            Err(e) => {
                warn!(error = %e, error.class = ?e.class(), "Schema introspection failed");
                Ok(Err(ComponentError::from(&e)))
            }
        }
    }

    async fn run_query_component(
        &self,
        kind: ComparisonKind,
        source: &TableDescriptor,
        target: &TableDescriptor,
    ) -> Result<ComponentOutcome> {
        let options = &self.options;
        match kind {
            ComparisonKind::RowCount => compare_row_counts(
                source,
                target,
                options.filter_clause.as_deref(),
                options.row_count_tolerance,
            )
            .await
            .map(ComponentOutcome::RowCount),
            ComparisonKind::ColumnValues => {
                let Some(column) = &options.compare_column else {
                    return Err(TermError::configuration(
                        "column value comparison requires compare_column",
                    ));
                };
                compare_column_values(
                    source,
                    target,
                    options.key_column.as_deref(),
                    column,
                    options.value_tolerance,
                )
                .await
                .map(ComponentOutcome::ColumnValues)
            }
            // The bounds check applies to the side under validation
            ComparisonKind::TableRows => check_table_rows(target, options.min_rows, options.max_rows)
                .await
                .map(ComponentOutcome::TableRows),
            ComparisonKind::Schema | ComparisonKind::NullPattern => Err(TermError::Internal(
                format!("{kind} comparison requires schema introspection"),
            )),
        }
    }
}

/// Turns a component error into an ERROR outcome, letting configuration
/// errors through.
fn capture(kind: ComparisonKind, result: Result<ComponentOutcome>) -> Result<ComponentOutcome> {
    match result {
        Ok(outcome) => Ok(outcome),
        Err(e) if e.is_fail_fast() => Err(e),
        Err(e) => {
            warn!(
                kind = %kind,
                error = %e,
                error.class = ?e.class(),
                error.transient = e.is_transient(),
                "Comparison failed"
            );
            Ok(ComponentOutcome::error(&e))
        }
    }
}

/// Builder for constructing `ComparisonSuite` instances.
#[derive(Debug)]
pub struct ComparisonSuiteBuilder {
    name: String,
    description: Option<String>,
    kinds: BTreeSet<ComparisonKind>,
    options: ComparisonOptions,
}

impl ComparisonSuiteBuilder {
    /// Creates a new builder with the given name and default options.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            kinds: BTreeSet::new(),
            options: ComparisonOptions::default(),
        }
    }

    /// Sets the description for the suite.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds one comparison kind. Adding a kind twice has no effect.
    pub fn kind(mut self, kind: ComparisonKind) -> Self {
        self.kinds.insert(kind);
        self
    }

    /// Adds several comparison kinds.
    pub fn kinds<I>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = ComparisonKind>,
    {
        self.kinds.extend(kinds);
        self
    }

    /// Sets the comparison options.
    pub fn options(mut self, options: ComparisonOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the suite. Validation happens when it runs.
    pub fn build(self) -> ComparisonSuite {
        ComparisonSuite {
            name: self.name,
            description: self.description,
            kinds: self.kinds,
            options: self.options,
        }
    }
}

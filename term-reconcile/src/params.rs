//! Test-definition parameter strings.
//!
//! Test definitions carry their parameters as a single string such as
//! `table_name=public.products,min_rows=5` or
//! `source_table=orders;target_table=new_orders;tolerance_percent=5`.
//! [`Parameters::parse`] turns that string into a validated map once, and
//! the typed views ([`TableRowsParameters`], [`ComparisonParameters`]) turn
//! the map into options the comparators understand. Nothing past this
//! module deals with string-keyed maps.

use crate::core::{ComparisonOptions, TableDescriptor};
use crate::engine::TableEngine;
use crate::prelude::*;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Parsed `key=value` parameters. Keys are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    entries: BTreeMap<String, String>,
}

impl Parameters {
    /// Parses a parameter string.
    ///
    /// Entries are separated by `,` or `;`. A segment without `=` continues
    /// the previous value, so lists survive a comma separator. A string that
    /// is a single bare value is taken as the `table_name`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use term_reconcile::params::Parameters;
    ///
    /// let params = Parameters::parse("table_name=public.employees,column_list=id,name").unwrap();
    /// assert_eq!(params.get("table_name"), Some("public.employees"));
    /// assert_eq!(params.get_list("column_list"), vec!["id", "name"]);
    ///
    /// let bare = Parameters::parse("simple_table").unwrap();
    /// assert_eq!(bare.get("table_name"), Some("simple_table"));
    ///
    /// assert!(Parameters::parse("min_rows=1,min_rows=2").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let mut params = Self::default();
        if input.is_empty() {
            return Ok(params);
        }
        if !input.contains(['=', ',', ';']) {
            params.entries.insert("table_name".to_string(), input.to_string());
            return Ok(params);
        }

        let mut current: Option<String> = None;
        for (separator, segment) in segments(input) {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            match segment.split_once('=') {
                Some((key, value)) => {
                    let key = key.trim().to_ascii_lowercase();
                    if key.is_empty() {
                        return Err(TermError::configuration(format!(
                            "parameter '{segment}' has an empty key"
                        )));
                    }
                    if params.entries.contains_key(&key) {
                        return Err(TermError::configuration(format!(
                            "parameter '{key}' is given more than once"
                        )));
                    }
                    params.entries.insert(key.clone(), value.trim().to_string());
                    current = Some(key);
                }
                None => {
                    let Some(key) = &current else {
                        return Err(TermError::configuration(format!(
                            "parameter '{segment}' is not of the form key=value"
                        )));
                    };
                    if let Some(value) = params.entries.get_mut(key) {
                        value.push(separator.unwrap_or(','));
                        value.push_str(segment);
                    }
                }
            }
        }
        Ok(params)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Returns the value or a configuration error naming the missing key.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| TermError::configuration(format!("required parameter '{key}' is missing")))
    }

    /// Parses a value into `T`, reporting malformed values as configuration
    /// errors.
    pub fn get_parsed<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|raw| {
                raw.parse::<T>().map_err(|e| {
                    TermError::configuration(format!("parameter '{key}' has invalid value '{raw}': {e}"))
                })
            })
            .transpose()
    }

    /// Splits a list value on `,` or `;`.
    pub fn get_list(&self, key: &str) -> Vec<&str> {
        self.get(key)
            .map(|v| {
                v.split([',', ';'])
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    fn log_unknown(&self, known: &[&str], view: &str) {
        for key in self.keys().filter(|k| !known.contains(k)) {
            debug!(parameter = key, view, "Ignoring unrecognized parameter");
        }
    }
}

/// Splits on `,` and `;`, pairing each segment with the separator before it.
fn segments(input: &str) -> Vec<(Option<char>, &str)> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut separator = None;
    for (idx, ch) in input.char_indices() {
        if ch == ',' || ch == ';' {
            out.push((separator, &input[start..idx]));
            separator = Some(ch);
            start = idx + ch.len_utf8();
        }
    }
    out.push((separator, &input[start..]));
    out
}

/// Parameters of a single-table row bounds check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRowsParameters {
    /// `schema.table` or bare `table`
    pub table_name: String,
    pub min_rows: Option<u64>,
    pub max_rows: Option<u64>,
}

impl TableRowsParameters {
    const KEYS: [&'static str; 3] = ["table_name", "min_rows", "max_rows"];

    pub fn from_parameters(params: &Parameters) -> Result<Self> {
        params.log_unknown(&Self::KEYS, "table_rows");
        let parsed = Self {
            table_name: params.require("table_name")?.to_string(),
            min_rows: params.get_parsed("min_rows")?,
            max_rows: params.get_parsed("max_rows")?,
        };
        if let (Some(min), Some(max)) = (parsed.min_rows, parsed.max_rows) {
            if min > max {
                return Err(TermError::configuration(format!(
                    "min_rows ({min}) must not exceed max_rows ({max})"
                )));
            }
        }
        Ok(parsed)
    }

    pub fn parse(input: &str) -> Result<Self> {
        Self::from_parameters(&Parameters::parse(input)?)
    }

    /// Resolves the table on the given engine.
    pub fn table(&self, engine: Arc<dyn TableEngine>) -> Result<TableDescriptor> {
        TableDescriptor::parse(engine, &self.table_name)
    }

    pub fn to_options(&self) -> ComparisonOptions {
        ComparisonOptions::new().with_row_bounds(self.min_rows, self.max_rows)
    }
}

/// Parameters of a source/target comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonParameters {
    pub source_table: String,
    pub target_table: String,
    /// Row count tolerance in percent (5 means 5%)
    pub tolerance_percent: Option<f64>,
    pub column_name: Option<String>,
    pub key_column: Option<String>,
}

impl ComparisonParameters {
    const KEYS: [&'static str; 5] = [
        "source_table",
        "target_table",
        "tolerance_percent",
        "column_name",
        "key_column",
    ];

    pub fn from_parameters(params: &Parameters) -> Result<Self> {
        params.log_unknown(&Self::KEYS, "comparison");
        let tolerance_percent: Option<f64> = params.get_parsed("tolerance_percent")?;
        if let Some(percent) = tolerance_percent {
            if !percent.is_finite() || percent < 0.0 {
                return Err(TermError::configuration(format!(
                    "tolerance_percent must be a non-negative number, got {percent}"
                )));
            }
        }
        Ok(Self {
            source_table: params.require("source_table")?.to_string(),
            target_table: params.require("target_table")?.to_string(),
            tolerance_percent,
            column_name: params.get("column_name").map(str::to_string),
            key_column: params.get("key_column").map(str::to_string),
        })
    }

    pub fn parse(input: &str) -> Result<Self> {
        Self::from_parameters(&Parameters::parse(input)?)
    }

    /// Resolves both tables, each on its own engine.
    pub fn tables(
        &self,
        source_engine: Arc<dyn TableEngine>,
        target_engine: Arc<dyn TableEngine>,
    ) -> Result<(TableDescriptor, TableDescriptor)> {
        Ok((
            TableDescriptor::parse(source_engine, &self.source_table)?,
            TableDescriptor::parse(target_engine, &self.target_table)?,
        ))
    }

    /// Options carrying the relative tolerance and column selection.
    pub fn to_options(&self) -> ComparisonOptions {
        let mut options = ComparisonOptions::new()
            .with_row_count_tolerance(self.tolerance_percent.unwrap_or(0.0) / 100.0);
        options.key_column = self.key_column.clone();
        options.compare_column = self.column_name.clone();
        options
    }
}

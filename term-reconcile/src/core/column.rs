//! Normalized column metadata shared by every engine.

use arrow::datatypes::DataType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Engine-independent semantic type tag.
///
/// Schema comparison works on this tag, never on the raw engine type name,
/// so PostgreSQL `numeric` and another engine's `DECIMAL` compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SemanticType {
    Integer,
    Decimal,
    Text,
    Date,
    Timestamp,
    Boolean,
    Other,
}

impl SemanticType {
    /// Maps an engine-native type name to its semantic tag.
    ///
    /// Matching is case-insensitive and ignores any parameter list, so
    /// `VARCHAR(255)` and `numeric(10,2)` are recognized.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use term_reconcile::core::SemanticType;
    ///
    /// assert_eq!(SemanticType::from_native("character varying"), SemanticType::Text);
    /// assert_eq!(SemanticType::from_native("NUMERIC(10,2)"), SemanticType::Decimal);
    /// assert_eq!(SemanticType::from_native("int8"), SemanticType::Integer);
    /// assert_eq!(SemanticType::from_native("jsonb"), SemanticType::Other);
    /// ```
    pub fn from_native(type_name: &str) -> Self {
        let lowered = type_name.trim().to_ascii_lowercase();
        let base = match lowered.find('(') {
            Some(idx) => {
                // "timestamp(6) with time zone" keeps its suffix
                let suffix = lowered[idx..]
                    .find(')')
                    .map(|end| &lowered[idx + end + 1..])
                    .unwrap_or("");
                format!("{}{}", lowered[..idx].trim_end(), suffix)
            }
            None => lowered,
        };

        match base.trim() {
            "int" | "int2" | "int4" | "int8" | "integer" | "bigint" | "smallint" | "tinyint"
            | "mediumint" | "serial" | "serial4" | "serial8" | "bigserial" | "smallserial" => {
                SemanticType::Integer
            }
            "numeric" | "decimal" | "number" | "money" | "smallmoney" | "real" | "float"
            | "float4" | "float8" | "double" | "double precision" => SemanticType::Decimal,
            "varchar" | "character varying" | "char" | "character" | "bpchar" | "text"
            | "nvarchar" | "nchar" | "ntext" | "string" | "clob" | "varchar2" | "nvarchar2"
            | "citext" => SemanticType::Text,
            "date" => SemanticType::Date,
            "timestamp"
            | "timestamp without time zone"
            | "timestamp with time zone"
            | "timestamptz"
            | "datetime"
            | "datetime2"
            | "smalldatetime"
            | "datetimeoffset" => SemanticType::Timestamp,
            "bool" | "boolean" | "bit" => SemanticType::Boolean,
            _ => SemanticType::Other,
        }
    }

    /// Maps an Arrow data type (DataFusion's catalog) to its semantic tag.
    pub fn from_arrow(data_type: &DataType) -> Self {
        match data_type {
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64 => SemanticType::Integer,
            DataType::Float16
            | DataType::Float32
            | DataType::Float64
            | DataType::Decimal128(_, _)
            | DataType::Decimal256(_, _) => SemanticType::Decimal,
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => SemanticType::Text,
            DataType::Date32 | DataType::Date64 => SemanticType::Date,
            DataType::Timestamp(_, _) => SemanticType::Timestamp,
            DataType::Boolean => SemanticType::Boolean,
            DataType::Dictionary(_, value) => Self::from_arrow(value),
            _ => SemanticType::Other,
        }
    }

    /// Returns true for the types whose values compare numerically.
    pub fn is_numeric(&self) -> bool {
        matches!(self, SemanticType::Integer | SemanticType::Decimal)
    }

    /// Upper-case tag used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticType::Integer => "INTEGER",
            SemanticType::Decimal => "DECIMAL",
            SemanticType::Text => "TEXT",
            SemanticType::Date => "DATE",
            SemanticType::Timestamp => "TIMESTAMP",
            SemanticType::Boolean => "BOOLEAN",
            SemanticType::Other => "OTHER",
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata for one physical column as reported by an engine.
///
/// `ordinal_position` and `native_type` are for display only; comparisons
/// are by case-insensitive name and by [`SemanticType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name as stored by the engine
    pub name: String,
    /// Normalized type tag
    pub declared_type: SemanticType,
    /// Engine-native type name, e.g. `character varying`
    pub native_type: String,
    /// Declared maximum character length (TEXT columns)
    pub max_length: Option<u32>,
    /// Declared numeric precision (DECIMAL columns)
    pub numeric_precision: Option<u32>,
    /// Declared numeric scale (DECIMAL columns)
    pub numeric_scale: Option<u32>,
    pub is_nullable: bool,
    pub default_value: Option<String>,
    /// 1-based physical position in the table
    pub ordinal_position: u32,
}

impl ColumnDescriptor {
    /// Creates a nullable column with no length, precision or default.
    ///
    /// The native type name defaults to the semantic tag.
    pub fn new(name: impl Into<String>, declared_type: SemanticType) -> Self {
        Self {
            name: name.into(),
            declared_type,
            native_type: declared_type.as_str().to_string(),
            max_length: None,
            numeric_precision: None,
            numeric_scale: None,
            is_nullable: true,
            default_value: None,
            ordinal_position: 0,
        }
    }

    /// Creates a column from an engine-native type name.
    pub fn from_native(name: impl Into<String>, native_type: impl Into<String>) -> Self {
        let native_type = native_type.into();
        Self {
            declared_type: SemanticType::from_native(&native_type),
            native_type,
            ..Self::new(name, SemanticType::Other)
        }
    }

    /// Sets the maximum character length.
    pub fn with_max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Sets numeric precision and scale.
    pub fn with_precision(mut self, precision: u32, scale: u32) -> Self {
        self.numeric_precision = Some(precision);
        self.numeric_scale = Some(scale);
        self
    }

    /// Sets nullability.
    pub fn nullable(mut self, is_nullable: bool) -> Self {
        self.is_nullable = is_nullable;
        self
    }

    /// Marks the column `NOT NULL`.
    pub fn not_null(self) -> Self {
        self.nullable(false)
    }

    /// Sets the default value expression.
    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }

    /// Sets the ordinal position.
    pub fn at_position(mut self, ordinal_position: u32) -> Self {
        self.ordinal_position = ordinal_position;
        self
    }

    /// The name used for matching columns across engines.
    pub fn match_key(&self) -> String {
        self.name.to_lowercase()
    }

    /// Precision/scale pair, if the engine reported either.
    pub fn precision_pair(&self) -> Option<(Option<u32>, Option<u32>)> {
        if self.numeric_precision.is_none() && self.numeric_scale.is_none() {
            None
        } else {
            Some((self.numeric_precision, self.numeric_scale))
        }
    }

    /// Display form such as `NUMERIC(10,2) NOT NULL`.
    pub fn type_display(&self) -> String {
        let mut rendered = match (self.declared_type, self.numeric_precision, self.numeric_scale)
        {
            (SemanticType::Decimal, Some(p), Some(s)) => format!("DECIMAL({p},{s})"),
            (SemanticType::Decimal, Some(p), None) => format!("DECIMAL({p})"),
            (SemanticType::Text, _, _) => match self.max_length {
                Some(len) => format!("TEXT({len})"),
                None => "TEXT".to_string(),
            },
            (other, _, _) => other.as_str().to_string(),
        };
        if !self.is_nullable {
            rendered.push_str(" NOT NULL");
        }
        rendered
    }
}

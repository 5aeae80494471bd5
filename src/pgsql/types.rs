//! PostgreSQL data types and runtime values.
//!
//! `DataType` covers the scalar types the translator can infer, their array forms, and the
//! composite pseudo-types used to carry whole nodes, edges and paths between CTEs.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::TypeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Unset,
    Unknown,
    Int2,
    Int2Array,
    Int4,
    Int4Array,
    Int8,
    Int8Array,
    Float4,
    Float4Array,
    Float8,
    Float8Array,
    Boolean,
    Text,
    TextArray,
    Jsonb,
    Date,
    TimeWithTimeZone,
    TimeWithoutTimeZone,
    TimestampWithTimeZone,
    TimestampWithoutTimeZone,
    Interval,
    NodeComposite,
    NodeCompositeArray,
    EdgeComposite,
    EdgeCompositeArray,
    PathComposite,
    ParameterIdentifier,
    NodeUpdateResult,
    EdgeUpdateResult,
    ExpansionPattern,
    ExpansionPath,
    ExpansionRootNode,
    ExpansionEdge,
    ExpansionTerminalNode,
}

impl DataType {
    /// The name PostgreSQL knows this type by, as used in casts.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Unset => "unset",
            DataType::Unknown => "unknown",
            DataType::Int2 => "int2",
            DataType::Int2Array => "int2[]",
            DataType::Int4 => "int4",
            DataType::Int4Array => "int4[]",
            DataType::Int8 => "int8",
            DataType::Int8Array => "int8[]",
            DataType::Float4 => "float4",
            DataType::Float4Array => "float4[]",
            DataType::Float8 => "float8",
            DataType::Float8Array => "float8[]",
            DataType::Boolean => "bool",
            DataType::Text => "text",
            DataType::TextArray => "text[]",
            DataType::Jsonb => "jsonb",
            DataType::Date => "date",
            DataType::TimeWithTimeZone => "time with time zone",
            DataType::TimeWithoutTimeZone => "time without time zone",
            DataType::TimestampWithTimeZone => "timestamp with time zone",
            DataType::TimestampWithoutTimeZone => "timestamp without time zone",
            DataType::Interval => "interval",
            DataType::NodeComposite => "nodecomposite",
            DataType::NodeCompositeArray => "nodecomposite[]",
            DataType::EdgeComposite => "edgecomposite",
            DataType::EdgeCompositeArray => "edgecomposite[]",
            DataType::PathComposite => "pathcomposite",
            DataType::ParameterIdentifier => "parameter_identifier",
            DataType::NodeUpdateResult => "node_update_result",
            DataType::EdgeUpdateResult => "edge_update_result",
            DataType::ExpansionPattern => "expansion_pattern",
            DataType::ExpansionPath => "expansion_path",
            DataType::ExpansionRootNode => "expansion_root_node",
            DataType::ExpansionEdge => "expansion_edge",
            DataType::ExpansionTerminalNode => "expansion_terminal_node",
        }
    }

    /// Whether this type carries no usable type information.
    pub fn is_unresolved(&self) -> bool {
        matches!(self, DataType::Unset | DataType::Unknown)
    }

    /// Promotion lattice used when two operand types meet in one expression.
    ///
    /// Identical types convert to themselves and an unknown side defers to the other. Numeric
    /// widths widen within their family; there is no int/float cross conversion.
    pub fn convert(self, other: DataType) -> Option<DataType> {
        if self == other {
            return Some(self);
        }

        if other == DataType::Unknown {
            return Some(self);
        }

        match (self, other) {
            (DataType::Unknown, _) => Some(other),

            (DataType::Float4, DataType::Float8) | (DataType::Float8, DataType::Float4) => {
                Some(DataType::Float8)
            }

            (DataType::Int2, DataType::Int4) | (DataType::Int4, DataType::Int2) => {
                Some(DataType::Int4)
            }

            (DataType::Int2 | DataType::Int4, DataType::Int8)
            | (DataType::Int8, DataType::Int2 | DataType::Int4) => Some(DataType::Int8),

            _ => None,
        }
    }

    /// `convert` that reports a failed promotion as a type error.
    pub fn unify(self, other: DataType, operator: impl ToString) -> Result<DataType, TypeError> {
        self.convert(other)
            .ok_or_else(|| TypeError::incompatible(self, other, operator))
    }

    pub fn is_array(&self) -> bool {
        matches!(
            self,
            DataType::Int2Array
                | DataType::Int4Array
                | DataType::Int8Array
                | DataType::Float4Array
                | DataType::Float8Array
                | DataType::TextArray
                | DataType::NodeCompositeArray
                | DataType::EdgeCompositeArray
        )
    }

    /// Types that can be compared safely through their text rendering.
    pub fn text_convertible(&self) -> bool {
        matches!(
            self,
            DataType::TimestampWithoutTimeZone
                | DataType::TimestampWithTimeZone
                | DataType::TimeWithoutTimeZone
                | DataType::TimeWithTimeZone
                | DataType::Date
                | DataType::Text
        )
    }

    pub fn to_array_type(self) -> Result<DataType, TypeError> {
        match self {
            DataType::Int2 => Ok(DataType::Int2Array),
            DataType::Int4 => Ok(DataType::Int4Array),
            DataType::Int8 => Ok(DataType::Int8Array),
            DataType::Float4 => Ok(DataType::Float4Array),
            DataType::Float8 => Ok(DataType::Float8Array),
            DataType::Text => Ok(DataType::TextArray),
            DataType::NodeComposite => Ok(DataType::NodeCompositeArray),
            DataType::EdgeComposite => Ok(DataType::EdgeCompositeArray),
            _ => Err(TypeError::NoArrayRepresentation { data_type: self }),
        }
    }

    pub fn array_base_type(self) -> Result<DataType, TypeError> {
        match self {
            DataType::Int2Array => Ok(DataType::Int2),
            DataType::Int4Array => Ok(DataType::Int4),
            DataType::Int8Array => Ok(DataType::Int8),
            DataType::Float4Array => Ok(DataType::Float4),
            DataType::Float8Array => Ok(DataType::Float8),
            DataType::TextArray => Ok(DataType::Text),
            DataType::NodeCompositeArray => Ok(DataType::NodeComposite),
            DataType::EdgeCompositeArray => Ok(DataType::EdgeComposite),
            _ => Err(TypeError::NotAnArrayType { data_type: self }),
        }
    }

    /// Maps a bound composite type to the result type of updating it.
    pub fn to_update_result_type(self) -> Option<DataType> {
        match self {
            DataType::NodeComposite => Some(DataType::NodeUpdateResult),
            DataType::EdgeComposite => Some(DataType::EdgeUpdateResult),
            _ => None,
        }
    }

    pub fn is_node(&self) -> bool {
        matches!(
            self,
            DataType::NodeComposite | DataType::ExpansionRootNode | DataType::ExpansionTerminalNode
        )
    }

    pub fn is_edge(&self) -> bool {
        matches!(self, DataType::EdgeComposite | DataType::ExpansionEdge)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A runtime value: literal operands and caller-supplied parameters.
///
/// Values arrive as JSON. Integers become `Int8`, other numbers `Float8`; homogeneous arrays
/// of those or of strings become the matching typed array and anything else is kept as a
/// `List` or `Map`, neither of which maps to a relational type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum Value {
    Null,
    Bool(bool),
    Int2(i16),
    Int4(i32),
    Int8(i64),
    UInt(u64),
    Float4(f32),
    Float8(f64),
    Text(String),
    Int2Array(Vec<i16>),
    Int4Array(Vec<i32>),
    Int8Array(Vec<i64>),
    Float4Array(Vec<f32>),
    Float8Array(Vec<f64>),
    TextArray(Vec<String>),
    List(Vec<Value>),
    Map(serde_json::Map<String, serde_json::Value>),
}

impl Value {
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int2(value) => Some(i64::from(*value)),
            Value::Int4(value) => Some(i64::from(*value)),
            Value::Int8(value) => Some(*value),
            _ => None,
        }
    }

    /// JSON text of this value, as stored in a `jsonb` property bag.
    pub fn to_json_string(&self) -> String {
        serde_json::Value::from(self.clone()).to_string()
    }
}

/// Infers the data type of a runtime value. Null is untyped and maps to `Unknown`.
pub fn value_to_data_type(value: &Value) -> Result<DataType, TypeError> {
    match value {
        Value::Null => Ok(DataType::Unknown),
        Value::Bool(_) => Ok(DataType::Boolean),
        Value::Int2(_) => Ok(DataType::Int2),
        Value::Int4(_) => Ok(DataType::Int4),
        Value::Int8(_) => Ok(DataType::Int8),
        Value::Float4(_) => Ok(DataType::Float4),
        Value::Float8(_) => Ok(DataType::Float8),
        Value::Text(_) => Ok(DataType::Text),
        Value::Int2Array(_) => Ok(DataType::Int2Array),
        Value::Int4Array(_) => Ok(DataType::Int4Array),
        Value::Int8Array(_) => Ok(DataType::Int8Array),
        Value::Float4Array(_) => Ok(DataType::Float4Array),
        Value::Float8Array(_) => Ok(DataType::Float8Array),
        Value::TextArray(_) => Ok(DataType::TextArray),
        Value::UInt(_) | Value::List(_) | Value::Map(_) => Err(TypeError::UnsupportedValue {
            value: value.to_json_string(),
        }),
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(value) => Value::Bool(value),
            serde_json::Value::Number(number) => {
                if let Some(value) = number.as_i64() {
                    Value::Int8(value)
                } else if let Some(value) = number.as_u64() {
                    Value::UInt(value)
                } else {
                    Value::Float8(number.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(value) => Value::Text(value),
            serde_json::Value::Array(values) => array_value(values),
            serde_json::Value::Object(map) => Value::Map(map),
        }
    }
}

fn array_value(values: Vec<serde_json::Value>) -> Value {
    if values.is_empty() {
        return Value::List(Vec::new());
    }

    if values.iter().all(|value| value.as_i64().is_some()) {
        return Value::Int8Array(values.iter().filter_map(|value| value.as_i64()).collect());
    }

    if values.iter().all(|value| value.is_number()) {
        return Value::Float8Array(values.iter().filter_map(|value| value.as_f64()).collect());
    }

    if values.iter().all(|value| value.is_string()) {
        return Value::TextArray(
            values
                .into_iter()
                .filter_map(|value| match value {
                    serde_json::Value::String(text) => Some(text),
                    _ => None,
                })
                .collect(),
        );
    }

    Value::List(values.into_iter().map(Value::from).collect())
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        use serde_json::json;

        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(value) => json!(value),
            Value::Int2(value) => json!(value),
            Value::Int4(value) => json!(value),
            Value::Int8(value) => json!(value),
            Value::UInt(value) => json!(value),
            Value::Float4(value) => json!(value),
            Value::Float8(value) => json!(value),
            Value::Text(value) => json!(value),
            Value::Int2Array(values) => json!(values),
            Value::Int4Array(values) => json!(values),
            Value::Int8Array(values) => json!(values),
            Value::Float4Array(values) => json!(values),
            Value::Float8Array(values) => json!(values),
            Value::TextArray(values) => json!(values),
            Value::List(values) => {
                serde_json::Value::Array(values.into_iter().map(serde_json::Value::from).collect())
            }
            Value::Map(map) => serde_json::Value::Object(map),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i16> for Value {
    fn from(value: i16) -> Self {
        Value::Int2(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int4(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int8(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float8(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Vec<i16>> for Value {
    fn from(values: Vec<i16>) -> Self {
        Value::Int2Array(values)
    }
}

impl From<Vec<i64>> for Value {
    fn from(values: Vec<i64>) -> Self {
        Value::Int8Array(values)
    }
}

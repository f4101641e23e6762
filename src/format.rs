use crate::column::{ColumnMetadata, FieldValue};
use crate::datatype::ColumnType;
use crate::error::{IntrospectError, Result};

/// Quote a string as a SQL literal, doubling embedded single quotes.
pub fn escape_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Convert a field value into a literal which can be used in an insert statement.
pub fn format_value(value: &FieldValue, column: &ColumnMetadata) -> Result<String> {
    // dynamic values carry their own type, so only jsonb/text make sense for them
    match value {
        FieldValue::Dynamic(dynamic) => {
            return match column.column_type {
                ColumnType::Jsonb => dynamic
                    .to_json()
                    .map(|json| escape_string(&json))
                    .map_err(|e| serialization(column, e)),
                ColumnType::Text => Ok(escape_string(&dynamic.friendly_type_name())),
                declared => Err(IntrospectError::ColumnType {
                    column: column.name.to_string(),
                    kind: "dynamic value",
                    expected: "jsonb' or 'text",
                    declared: declared.to_string(),
                }),
            };
        }
        FieldValue::Type(dynamic_type) => {
            return match column.column_type {
                ColumnType::Text => Ok(escape_string(&dynamic_type.friendly_name())),
                declared => Err(IntrospectError::ColumnType {
                    column: column.name.to_string(),
                    kind: "dynamic type",
                    expected: "text",
                    declared: declared.to_string(),
                }),
            };
        }
        _ => {}
    }

    match column.column_type {
        ColumnType::Jsonb => Ok(escape_string(&to_json(value, column)?)),
        declared if declared.is_literal_token() => match value {
            FieldValue::Number(n) if !n.is_finite() => Err(non_finite(column, *n)),
            // the caller guarantees these are already valid numeric/boolean tokens
            _ => stringify(value, column),
        },
        _ => Ok(escape_string(&stringify(value, column)?)),
    }
}

fn to_json(value: &FieldValue, column: &ColumnMetadata) -> Result<String> {
    let json = match value {
        FieldValue::Text(s) => serde_json::to_string(s),
        FieldValue::Integer(i) => serde_json::to_string(i),
        FieldValue::Number(n) if !n.is_finite() => return Err(non_finite(column, *n)),
        FieldValue::Number(n) => serde_json::to_string(n),
        FieldValue::Boolean(b) => serde_json::to_string(b),
        FieldValue::Json(j) => j.to_json(),
        FieldValue::Dynamic(d) => d.to_json(),
        FieldValue::Type(t) => serde_json::to_string(&t.friendly_name()),
    };
    json.map_err(|e| serialization(column, e))
}

fn stringify(value: &FieldValue, column: &ColumnMetadata) -> Result<String> {
    Ok(match value {
        FieldValue::Text(s) => s.to_string(),
        FieldValue::Integer(i) => i.to_string(),
        FieldValue::Number(n) => n.to_string(),
        FieldValue::Boolean(b) => b.to_string(),
        FieldValue::Json(_) => to_json(value, column)?,
        FieldValue::Dynamic(d) => d.friendly_type_name(),
        FieldValue::Type(t) => t.friendly_name(),
    })
}

fn non_finite(column: &ColumnMetadata, n: f64) -> IntrospectError {
    IntrospectError::Serialization {
        column: column.name.to_string(),
        message: format!("number {n} has no literal form"),
    }
}

fn serialization(column: &ColumnMetadata, e: serde_json::Error) -> IntrospectError {
    IntrospectError::Serialization { column: column.name.to_string(), message: e.to_string() }
}

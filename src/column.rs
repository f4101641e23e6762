//! Column metadata for the introspection tables.
//!
//! Every resource kind declares an ordered, static table of
//! [`ColumnDescriptor`]s: the column name, its SQL type and an accessor that
//! pulls the runtime value out of an instance. Fields that are not listed
//! never reach the generated SQL. The descriptor order is the column order of
//! both `create temp table` and `insert into`.

use crate::datatype::{ColumnType, DynamicType, DynamicValue};

/// Name and declared SQL type of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnMetadata {
    pub name: &'static str,
    pub column_type: ColumnType,
}

impl ColumnMetadata {
    pub const fn new(name: &'static str, column_type: ColumnType) -> Self {
        Self { name, column_type }
    }
}

/// Anything that can be rendered as JSON for a `jsonb` column.
pub trait JsonColumn {
    fn to_json(&self) -> Result<String, serde_json::Error>;
}
impl<T: serde::Serialize> JsonColumn for T {
    fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// The raw runtime value of a field, borrowed from the resource.
pub enum FieldValue<'a> {
    Text(&'a str),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    Json(&'a dyn JsonColumn),
    Dynamic(&'a DynamicValue),
    Type(&'a DynamicType),
}

impl<'a> FieldValue<'a> {
    #[allow(clippy::ptr_arg)]
    pub fn text(value: &'a String) -> Self {
        FieldValue::Text(value.as_str())
    }
    pub fn json<T: serde::Serialize>(value: &'a T) -> Self {
        FieldValue::Json(value)
    }
}

impl std::fmt::Debug for FieldValue<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            FieldValue::Text(s) => write!(f, "Text({s:?})"),
            FieldValue::Integer(i) => write!(f, "Integer({i})"),
            FieldValue::Number(n) => write!(f, "Number({n})"),
            FieldValue::Boolean(b) => write!(f, "Boolean({b})"),
            FieldValue::Json(j) => match j.to_json() {
                Ok(json) => write!(f, "Json({json})"),
                Err(e) => write!(f, "Json(<{e}>)"),
            },
            FieldValue::Dynamic(v) => write!(f, "Dynamic({v:?})"),
            FieldValue::Type(t) => write!(f, "Type({t})"),
        }
    }
}

/// Pulls the value of one field; `None` means the field is unset.
pub type Accessor<R> = for<'a> fn(&'a R) -> Option<FieldValue<'a>>;

pub struct ColumnDescriptor<R: 'static> {
    pub column: ColumnMetadata,
    pub accessor: Accessor<R>,
}

/// A record whose fields are exposed as introspection table columns.
pub trait Introspectable: Sized + 'static {
    const COLUMNS: &'static [ColumnDescriptor<Self>];
}

/// Builds a static descriptor table from `"column": type => accessor` entries.
#[macro_export]
macro_rules! columns {
    ($record:ty { $($name:literal : $column_type:ident => $accessor:expr),* $(,)? }) => {
        &[
            $(
                $crate::column::ColumnDescriptor::<$record> {
                    column: $crate::column::ColumnMetadata::new(
                        $name,
                        $crate::datatype::ColumnType::$column_type,
                    ),
                    accessor: $accessor,
                },
            )*
        ]
    };
}

/// Declared columns of `T`, in declaration order.
pub fn columns_for<T: Introspectable>() -> Vec<ColumnMetadata> {
    T::COLUMNS.iter().map(|descriptor| descriptor.column).collect()
}

/// Columns of `item` that currently hold a value, paired with that value.
pub fn values_for<T: Introspectable>(item: &T) -> Vec<(ColumnMetadata, FieldValue<'_>)> {
    T::COLUMNS
        .iter()
        .filter_map(|descriptor| (descriptor.accessor)(item).map(|value| (descriptor.column, value)))
        .collect()
}

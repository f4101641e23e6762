// used to serialize dynamic values as JSON for jsonb columns
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};

// object attributes and map entries are kept in key order
use std::collections::BTreeMap;
// used to print out readable forms of a data type
use std::fmt;
// used when parsing type constraints such as "list(string)"
use std::str::FromStr;

// ------------- Column Types -------------
/// The SQL types a column of an introspection table may be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Jsonb,
    Integer,
    Numeric,
    Decimal,
    Boolean,
    Text,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Jsonb => "jsonb",
            ColumnType::Integer => "integer",
            ColumnType::Numeric => "numeric",
            ColumnType::Decimal => "decimal",
            ColumnType::Boolean => "boolean",
            ColumnType::Text => "text",
        }
    }
    /// Types whose literals are spliced into statements without quoting.
    pub fn is_literal_token(&self) -> bool {
        matches!(
            self,
            ColumnType::Integer | ColumnType::Numeric | ColumnType::Decimal | ColumnType::Boolean
        )
    }
}
impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
impl FromStr for ColumnType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jsonb" => Ok(ColumnType::Jsonb),
            "integer" => Ok(ColumnType::Integer),
            "numeric" => Ok(ColumnType::Numeric),
            "decimal" => Ok(ColumnType::Decimal),
            "boolean" => Ok(ColumnType::Boolean),
            "text" => Ok(ColumnType::Text),
            other => Err(format!("unknown column type '{other}'")),
        }
    }
}

// ------------- Dynamic Types -------------
/// Type description carried by a [`DynamicValue`], also used on its own for
/// the declared type of a variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DynamicType {
    Dynamic,
    String,
    Number,
    Bool,
    List(Box<DynamicType>),
    Set(Box<DynamicType>),
    Map(Box<DynamicType>),
    Tuple(Vec<DynamicType>),
    Object(BTreeMap<String, DynamicType>),
}

impl DynamicType {
    /// Human readable name, e.g. `list of string`.
    pub fn friendly_name(&self) -> String {
        match self {
            DynamicType::Dynamic => "dynamic".to_string(),
            DynamicType::String => "string".to_string(),
            DynamicType::Number => "number".to_string(),
            DynamicType::Bool => "bool".to_string(),
            DynamicType::List(element) => format!("list of {}", element.friendly_name()),
            DynamicType::Set(element) => format!("set of {}", element.friendly_name()),
            DynamicType::Map(element) => format!("map of {}", element.friendly_name()),
            DynamicType::Tuple(_) => "tuple".to_string(),
            DynamicType::Object(_) => "object".to_string(),
        }
    }
}
impl fmt::Display for DynamicType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.friendly_name())
    }
}

// Type constraints are written the way a variable block declares them:
// string, number, bool, any, list(T), set(T), map(T), tuple([T, ...]), object({name = T, ...})
impl FromStr for DynamicType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = TypeParser { input: s, position: 0 };
        let parsed = parser.parse_type()?;
        parser.skip_whitespace();
        if parser.position != s.len() {
            return Err(format!("unexpected trailing input in type '{s}' at {}", parser.position));
        }
        Ok(parsed)
    }
}
impl<'de> Deserialize<'de> for DynamicType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

struct TypeParser<'a> {
    input: &'a str,
    position: usize,
}
impl<'a> TypeParser<'a> {
    fn rest(&self) -> &'a str {
        &self.input[self.position..]
    }
    fn skip_whitespace(&mut self) {
        let trimmed = self.rest().trim_start();
        self.position = self.input.len() - trimmed.len();
    }
    fn expect(&mut self, token: char) -> Result<(), String> {
        self.skip_whitespace();
        if self.rest().starts_with(token) {
            self.position += token.len_utf8();
            Ok(())
        } else {
            Err(format!("expected '{token}' in type '{}' at {}", self.input, self.position))
        }
    }
    fn peek_is(&mut self, token: char) -> bool {
        self.skip_whitespace();
        self.rest().starts_with(token)
    }
    fn identifier(&mut self) -> Result<&'a str, String> {
        self.skip_whitespace();
        let rest = self.rest();
        let length = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        if length == 0 {
            return Err(format!("expected a type name in '{}' at {}", self.input, self.position));
        }
        self.position += length;
        Ok(&rest[..length])
    }
    fn parse_type(&mut self) -> Result<DynamicType, String> {
        let keyword = self.identifier()?;
        match keyword {
            "string" => Ok(DynamicType::String),
            "number" => Ok(DynamicType::Number),
            "bool" => Ok(DynamicType::Bool),
            "any" => Ok(DynamicType::Dynamic),
            "list" | "set" | "map" => {
                self.expect('(')?;
                let element = Box::new(self.parse_type()?);
                self.expect(')')?;
                Ok(match keyword {
                    "list" => DynamicType::List(element),
                    "set" => DynamicType::Set(element),
                    _ => DynamicType::Map(element),
                })
            }
            "tuple" => {
                self.expect('(')?;
                self.expect('[')?;
                let mut elements = Vec::new();
                while !self.peek_is(']') {
                    elements.push(self.parse_type()?);
                    if !self.peek_is(']') {
                        self.expect(',')?;
                    }
                }
                self.expect(']')?;
                self.expect(')')?;
                Ok(DynamicType::Tuple(elements))
            }
            "object" => {
                self.expect('(')?;
                self.expect('{')?;
                let mut attributes = BTreeMap::new();
                while !self.peek_is('}') {
                    let name = self.identifier()?.to_string();
                    self.expect('=')?;
                    attributes.insert(name, self.parse_type()?);
                    if !self.peek_is('}') {
                        self.expect(',')?;
                    }
                }
                self.expect('}')?;
                self.expect(')')?;
                Ok(DynamicType::Object(attributes))
            }
            other => Err(format!("unknown type '{other}' in '{}'", self.input)),
        }
    }
}

// ------------- Dynamic Values -------------
/// A value that knows its own type, as produced when parsing variable
/// defaults and arguments. Rendered as JSON in `jsonb` columns and as its
/// friendly type name in `text` columns.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "serde_json::Value")]
pub enum DynamicValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<DynamicValue>),
    Set(Vec<DynamicValue>),
    Map(BTreeMap<String, DynamicValue>),
    Tuple(Vec<DynamicValue>),
    Object(BTreeMap<String, DynamicValue>),
}

impl DynamicValue {
    pub fn dynamic_type(&self) -> DynamicType {
        match self {
            DynamicValue::Null => DynamicType::Dynamic,
            DynamicValue::Bool(_) => DynamicType::Bool,
            DynamicValue::Number(_) => DynamicType::Number,
            DynamicValue::String(_) => DynamicType::String,
            DynamicValue::List(elements) => DynamicType::List(Box::new(element_type(elements.iter()))),
            DynamicValue::Set(elements) => DynamicType::Set(Box::new(element_type(elements.iter()))),
            DynamicValue::Map(entries) => DynamicType::Map(Box::new(element_type(entries.values()))),
            DynamicValue::Tuple(elements) => {
                DynamicType::Tuple(elements.iter().map(DynamicValue::dynamic_type).collect())
            }
            DynamicValue::Object(attributes) => DynamicType::Object(
                attributes
                    .iter()
                    .map(|(name, value)| (name.clone(), value.dynamic_type()))
                    .collect(),
            ),
        }
    }
    pub fn friendly_type_name(&self) -> String {
        self.dynamic_type().friendly_name()
    }
    /// JSON rendering; fails for numbers JSON cannot represent (NaN, infinities).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// Collections are homogeneous; the first element decides and an empty
// collection has no known element type.
fn element_type<'a>(mut elements: impl Iterator<Item = &'a DynamicValue>) -> DynamicType {
    elements
        .next()
        .map(DynamicValue::dynamic_type)
        .unwrap_or(DynamicType::Dynamic)
}

impl Serialize for DynamicValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DynamicValue::Null => serializer.serialize_unit(),
            DynamicValue::Bool(b) => serializer.serialize_bool(*b),
            DynamicValue::Number(n) => {
                if !n.is_finite() {
                    return Err(S::Error::custom(format!("number {n} cannot be represented in JSON")));
                }
                if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
                    serializer.serialize_i64(*n as i64)
                } else {
                    serializer.serialize_f64(*n)
                }
            }
            DynamicValue::String(s) => serializer.serialize_str(s),
            DynamicValue::List(elements) | DynamicValue::Set(elements) | DynamicValue::Tuple(elements) => {
                let mut seq = serializer.serialize_seq(Some(elements.len()))?;
                for element in elements {
                    seq.serialize_element(element)?;
                }
                seq.end()
            }
            DynamicValue::Map(entries) | DynamicValue::Object(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

// Values read from JSON take their implied types: arrays become tuples and
// objects become objects.
impl From<serde_json::Value> for DynamicValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => DynamicValue::Null,
            serde_json::Value::Bool(b) => DynamicValue::Bool(b),
            serde_json::Value::Number(n) => DynamicValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => DynamicValue::String(s),
            serde_json::Value::Array(elements) => {
                DynamicValue::Tuple(elements.into_iter().map(DynamicValue::from).collect())
            }
            serde_json::Value::Object(attributes) => DynamicValue::Object(
                attributes
                    .into_iter()
                    .map(|(name, value)| (name, DynamicValue::from(value)))
                    .collect(),
            ),
        }
    }
}
impl fmt::Display for DynamicValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.to_json() {
            Ok(json) => write!(f, "{json}"),
            Err(_) => write!(f, "<{}>", self.friendly_type_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn friendly_names_follow_structure() {
        let value = DynamicValue::List(vec![DynamicValue::String("a".into())]);
        assert_eq!(value.friendly_type_name(), "list of string");
        let empty = DynamicValue::Map(BTreeMap::new());
        assert_eq!(empty.friendly_type_name(), "map of dynamic");
        assert_eq!(DynamicValue::Null.friendly_type_name(), "dynamic");
    }

    #[test]
    fn json_rendering_of_nested_values() {
        let mut attributes = BTreeMap::new();
        attributes.insert("port".to_string(), DynamicValue::Number(5432.0));
        attributes.insert("ratio".to_string(), DynamicValue::Number(0.5));
        attributes.insert("tags".to_string(), DynamicValue::Tuple(vec![DynamicValue::String("it's".into()), DynamicValue::Bool(true)]));
        let json = DynamicValue::Object(attributes).to_json().unwrap();
        assert_eq!(json, r#"{"port":5432,"ratio":0.5,"tags":["it's",true]}"#);
    }

    #[test]
    fn non_finite_numbers_fail_to_serialize() {
        assert!(DynamicValue::Number(f64::INFINITY).to_json().is_err());
        assert!(DynamicValue::List(vec![DynamicValue::Number(f64::NAN)]).to_json().is_err());
    }

    #[test]
    fn values_read_from_json_take_implied_types() {
        let value: DynamicValue = serde_json::from_str(r#"{"a": [1, "x"], "b": null}"#).unwrap();
        let DynamicValue::Object(attributes) = &value else { panic!("expected object") };
        assert_eq!(attributes["a"].dynamic_type(), DynamicType::Tuple(vec![DynamicType::Number, DynamicType::String]));
        assert_eq!(attributes["b"], DynamicValue::Null);
    }

    #[test]
    fn type_constraints_parse() {
        assert_eq!("string".parse::<DynamicType>().unwrap(), DynamicType::String);
        assert_eq!(
            "map( list(number) )".parse::<DynamicType>().unwrap().friendly_name(),
            "map of list of number"
        );
        let object: DynamicType = "object({name = string, ports = tuple([number, bool])})".parse().unwrap();
        let DynamicType::Object(attributes) = object else { panic!("expected object") };
        assert_eq!(attributes["ports"], DynamicType::Tuple(vec![DynamicType::Number, DynamicType::Bool]));
        assert!("list(string".parse::<DynamicType>().is_err());
        assert!("strin".parse::<DynamicType>().is_err());
        assert!("string extra".parse::<DynamicType>().is_err());
    }

    #[test]
    fn column_types_round_trip_names() {
        for name in ["jsonb", "integer", "numeric", "decimal", "boolean", "text"] {
            assert_eq!(name.parse::<ColumnType>().unwrap().as_str(), name);
        }
        assert!("varchar".parse::<ColumnType>().is_err());
    }
}

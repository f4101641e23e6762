//! The workspace resources exposed through introspection tables.
//!
//! There are six fixed kinds: controls, queries, benchmarks, mods, variables
//! and cross-references. Each kind lists its columns in a static descriptor
//! table; every kind additionally shares the [`ResourceMetadata`] columns.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::column::{ColumnDescriptor, FieldValue, Introspectable};
use crate::columns;
use crate::datatype::{DynamicType, DynamicValue};
use crate::error::Result;

/// Name of the auto-generated mod wrapping a workspace without a mod file.
pub const DEFAULT_MOD_NAME: &str = "local";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Control,
    Query,
    Benchmark,
    Mod,
    Variable,
    Reference,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::Control,
        ResourceKind::Query,
        ResourceKind::Benchmark,
        ResourceKind::Mod,
        ResourceKind::Variable,
        ResourceKind::Reference,
    ];
    pub fn block_type(&self) -> &'static str {
        match self {
            ResourceKind::Control => "control",
            ResourceKind::Query => "query",
            ResourceKind::Benchmark => "benchmark",
            ResourceKind::Mod => "mod",
            ResourceKind::Variable => "variable",
            ResourceKind::Reference => "reference",
        }
    }
}
impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.block_type())
    }
}

// ------------- Metadata -------------
/// Additional data about each resource, shared by every introspection table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceMetadata {
    // not a column, every table has its own resource_name
    pub resource_name: String,
    // mod name in the format mod.<modName>
    pub mod_name: Option<String>,
    pub mod_short_name: Option<String>,
    pub file_name: String,
    pub start_line_number: i64,
    pub end_line_number: i64,
    pub is_auto_generated: bool,
    pub source_definition: String,
}

impl ResourceMetadata {
    /// Record the owning mod. The auto-generated default mod is not recorded.
    pub fn set_mod(&mut self, owner: &Mod) {
        if owner.is_default_mod() {
            return;
        }
        self.mod_short_name = Some(owner.short_name.clone());
        self.mod_name = Some(owner.full_name.clone());
    }
}

impl Introspectable for ResourceMetadata {
    const COLUMNS: &'static [ColumnDescriptor<Self>] = columns!(ResourceMetadata {
        "mod_name": Text => |m| m.mod_name.as_ref().map(FieldValue::text),
        "mod_short_name": Text => |m| m.mod_short_name.as_ref().map(FieldValue::text),
        "file_name": Text => |m| Some(FieldValue::text(&m.file_name)),
        "start_line_number": Integer => |m| Some(FieldValue::Integer(m.start_line_number)),
        "end_line_number": Integer => |m| Some(FieldValue::Integer(m.end_line_number)),
        "auto_generated": Boolean => |m| Some(FieldValue::Boolean(m.is_auto_generated)),
        "source_definition": Text => |m| Some(FieldValue::text(&m.source_definition)),
    });
}

// ------------- Resource -------------
/// A workspace resource stored in one of the six introspection tables.
pub trait Resource: Introspectable {
    const KIND: ResourceKind;
    /// Unique key of the resource within its kind.
    fn name(&self) -> String;
    fn short_name(&self) -> &str;
    fn metadata(&self) -> Option<&ResourceMetadata>;
    fn collection(resources: &WorkspaceResources) -> &BTreeMap<String, Self>;
    fn collection_mut(resources: &mut WorkspaceResources) -> &mut BTreeMap<String, Self>;
    /// The unqualified spelling `<kind>.<short name>`, when it differs from the name.
    fn alias(&self) -> Option<String> {
        let alias = format!("{}.{}", Self::KIND.block_type(), self.short_name());
        (alias != self.name()).then_some(alias)
    }
    /// Fill identifying fields left out of a loaded entry from its map key.
    fn fill_name(&mut self, _key: &str) {}
}

// an entry keyed "mod.control.x" without names becomes full name "mod.control.x", short name "x"
fn fill_names(key: &str, full_name: &mut String, short_name: &mut String) {
    if full_name.is_empty() {
        *full_name = key.to_string();
    }
    if short_name.is_empty() {
        *short_name = key.rsplit('.').next().unwrap_or(key).to_string();
    }
}

/// A parameter declared by a query or control.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamDef {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<DynamicValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Control {
    pub short_name: String,
    pub full_name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub severity: Option<String>,
    pub sql: Option<String>,
    pub query: Option<String>,
    pub documentation: Option<String>,
    pub search_path: Option<String>,
    pub search_path_prefix: Option<String>,
    pub tags: Option<BTreeMap<String, String>>,
    pub args: Option<DynamicValue>,
    pub params: Vec<ParamDef>,
    pub metadata: Option<ResourceMetadata>,
}

impl Introspectable for Control {
    const COLUMNS: &'static [ColumnDescriptor<Self>] = columns!(Control {
        "resource_name": Text => |c| Some(FieldValue::text(&c.short_name)),
        "title": Text => |c| c.title.as_ref().map(FieldValue::text),
        "description": Text => |c| c.description.as_ref().map(FieldValue::text),
        "severity": Text => |c| c.severity.as_ref().map(FieldValue::text),
        "sql": Text => |c| c.sql.as_ref().map(FieldValue::text),
        "query": Text => |c| c.query.as_ref().map(FieldValue::text),
        "documentation": Text => |c| c.documentation.as_ref().map(FieldValue::text),
        "search_path": Text => |c| c.search_path.as_ref().map(FieldValue::text),
        "search_path_prefix": Text => |c| c.search_path_prefix.as_ref().map(FieldValue::text),
        "tags": Jsonb => |c| c.tags.as_ref().map(FieldValue::json),
        "args": Jsonb => |c| c.args.as_ref().map(FieldValue::Dynamic),
        "params": Jsonb => |c| (!c.params.is_empty()).then(|| FieldValue::json(&c.params)),
    });
}

impl Resource for Control {
    const KIND: ResourceKind = ResourceKind::Control;
    fn name(&self) -> String {
        self.full_name.clone()
    }
    fn short_name(&self) -> &str {
        &self.short_name
    }
    fn metadata(&self) -> Option<&ResourceMetadata> {
        self.metadata.as_ref()
    }
    fn collection(resources: &WorkspaceResources) -> &BTreeMap<String, Self> {
        &resources.controls
    }
    fn collection_mut(resources: &mut WorkspaceResources) -> &mut BTreeMap<String, Self> {
        &mut resources.controls
    }
    fn fill_name(&mut self, key: &str) {
        fill_names(key, &mut self.full_name, &mut self.short_name);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Query {
    pub short_name: String,
    pub full_name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub sql: Option<String>,
    pub documentation: Option<String>,
    pub search_path: Option<String>,
    pub search_path_prefix: Option<String>,
    pub tags: Option<BTreeMap<String, String>>,
    pub params: Vec<ParamDef>,
    pub metadata: Option<ResourceMetadata>,
}

impl Introspectable for Query {
    const COLUMNS: &'static [ColumnDescriptor<Self>] = columns!(Query {
        "resource_name": Text => |q| Some(FieldValue::text(&q.short_name)),
        "title": Text => |q| q.title.as_ref().map(FieldValue::text),
        "description": Text => |q| q.description.as_ref().map(FieldValue::text),
        "sql": Text => |q| q.sql.as_ref().map(FieldValue::text),
        "documentation": Text => |q| q.documentation.as_ref().map(FieldValue::text),
        "search_path": Text => |q| q.search_path.as_ref().map(FieldValue::text),
        "search_path_prefix": Text => |q| q.search_path_prefix.as_ref().map(FieldValue::text),
        "tags": Jsonb => |q| q.tags.as_ref().map(FieldValue::json),
        "params": Jsonb => |q| (!q.params.is_empty()).then(|| FieldValue::json(&q.params)),
    });
}

impl Resource for Query {
    const KIND: ResourceKind = ResourceKind::Query;
    fn name(&self) -> String {
        self.full_name.clone()
    }
    fn short_name(&self) -> &str {
        &self.short_name
    }
    fn metadata(&self) -> Option<&ResourceMetadata> {
        self.metadata.as_ref()
    }
    fn collection(resources: &WorkspaceResources) -> &BTreeMap<String, Self> {
        &resources.queries
    }
    fn collection_mut(resources: &mut WorkspaceResources) -> &mut BTreeMap<String, Self> {
        &mut resources.queries
    }
    fn fill_name(&mut self, key: &str) {
        fill_names(key, &mut self.full_name, &mut self.short_name);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Benchmark {
    pub short_name: String,
    pub full_name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub documentation: Option<String>,
    pub tags: Option<BTreeMap<String, String>>,
    // names of the child controls and benchmarks
    pub children: Vec<String>,
    pub metadata: Option<ResourceMetadata>,
}

impl Introspectable for Benchmark {
    const COLUMNS: &'static [ColumnDescriptor<Self>] = columns!(Benchmark {
        "resource_name": Text => |b| Some(FieldValue::text(&b.short_name)),
        "title": Text => |b| b.title.as_ref().map(FieldValue::text),
        "description": Text => |b| b.description.as_ref().map(FieldValue::text),
        "documentation": Text => |b| b.documentation.as_ref().map(FieldValue::text),
        "tags": Jsonb => |b| b.tags.as_ref().map(FieldValue::json),
        "children": Jsonb => |b| (!b.children.is_empty()).then(|| FieldValue::json(&b.children)),
    });
}

impl Resource for Benchmark {
    const KIND: ResourceKind = ResourceKind::Benchmark;
    fn name(&self) -> String {
        self.full_name.clone()
    }
    fn short_name(&self) -> &str {
        &self.short_name
    }
    fn metadata(&self) -> Option<&ResourceMetadata> {
        self.metadata.as_ref()
    }
    fn collection(resources: &WorkspaceResources) -> &BTreeMap<String, Self> {
        &resources.benchmarks
    }
    fn collection_mut(resources: &mut WorkspaceResources) -> &mut BTreeMap<String, Self> {
        &mut resources.benchmarks
    }
    fn fill_name(&mut self, key: &str) {
        fill_names(key, &mut self.full_name, &mut self.short_name);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Mod {
    pub short_name: String,
    pub full_name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub documentation: Option<String>,
    pub icon: Option<String>,
    pub version: Option<String>,
    pub categories: Vec<String>,
    pub tags: Option<BTreeMap<String, String>>,
    pub metadata: Option<ResourceMetadata>,
}

impl Mod {
    pub fn is_default_mod(&self) -> bool {
        self.short_name == DEFAULT_MOD_NAME
    }
}

impl Introspectable for Mod {
    const COLUMNS: &'static [ColumnDescriptor<Self>] = columns!(Mod {
        "resource_name": Text => |m| Some(FieldValue::text(&m.short_name)),
        "title": Text => |m| m.title.as_ref().map(FieldValue::text),
        "description": Text => |m| m.description.as_ref().map(FieldValue::text),
        "color": Text => |m| m.color.as_ref().map(FieldValue::text),
        "documentation": Text => |m| m.documentation.as_ref().map(FieldValue::text),
        "icon": Text => |m| m.icon.as_ref().map(FieldValue::text),
        "version": Text => |m| m.version.as_ref().map(FieldValue::text),
        "categories": Jsonb => |m| (!m.categories.is_empty()).then(|| FieldValue::json(&m.categories)),
        "tags": Jsonb => |m| m.tags.as_ref().map(FieldValue::json),
    });
}

impl Resource for Mod {
    const KIND: ResourceKind = ResourceKind::Mod;
    fn name(&self) -> String {
        self.full_name.clone()
    }
    fn short_name(&self) -> &str {
        &self.short_name
    }
    fn metadata(&self) -> Option<&ResourceMetadata> {
        self.metadata.as_ref()
    }
    fn collection(resources: &WorkspaceResources) -> &BTreeMap<String, Self> {
        &resources.mods
    }
    fn collection_mut(resources: &mut WorkspaceResources) -> &mut BTreeMap<String, Self> {
        &mut resources.mods
    }
    fn fill_name(&mut self, key: &str) {
        fill_names(key, &mut self.full_name, &mut self.short_name);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Variable {
    pub short_name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub default: Option<DynamicValue>,
    #[serde(rename = "type")]
    pub var_type: Option<DynamicType>,
    pub value: Option<DynamicValue>,
    pub value_source: Option<String>,
    pub value_source_file_name: Option<String>,
    pub value_source_start_line_number: Option<i64>,
    pub value_source_end_line_number: Option<i64>,
    pub metadata: Option<ResourceMetadata>,
}

impl Introspectable for Variable {
    const COLUMNS: &'static [ColumnDescriptor<Self>] = columns!(Variable {
        "resource_name": Text => |v| Some(FieldValue::text(&v.short_name)),
        "description": Text => |v| v.description.as_ref().map(FieldValue::text),
        "default_value": Jsonb => |v| v.default.as_ref().map(FieldValue::Dynamic),
        "var_type": Text => |v| v.var_type.as_ref().map(FieldValue::Type),
        "value": Jsonb => |v| v.value.as_ref().map(FieldValue::Dynamic),
        "value_source": Text => |v| v.value_source.as_ref().map(FieldValue::text),
        "value_source_file_name": Text => |v| v.value_source_file_name.as_ref().map(FieldValue::text),
        "value_source_start_line_number": Integer => |v| v.value_source_start_line_number.map(FieldValue::Integer),
        "value_source_end_line_number": Integer => |v| v.value_source_end_line_number.map(FieldValue::Integer),
    });
}

impl Resource for Variable {
    const KIND: ResourceKind = ResourceKind::Variable;
    fn name(&self) -> String {
        self.full_name.clone()
    }
    fn short_name(&self) -> &str {
        &self.short_name
    }
    fn metadata(&self) -> Option<&ResourceMetadata> {
        self.metadata.as_ref()
    }
    fn collection(resources: &WorkspaceResources) -> &BTreeMap<String, Self> {
        &resources.variables
    }
    fn collection_mut(resources: &mut WorkspaceResources) -> &mut BTreeMap<String, Self> {
        &mut resources.variables
    }
    fn fill_name(&mut self, key: &str) {
        fill_names(key, &mut self.full_name, &mut self.short_name);
    }
}

/// A reference from an attribute of one block to another resource.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ResourceReference {
    pub reference_to: String,
    pub reference_from: String,
    pub block_type: String,
    pub block_name: String,
    pub attribute: String,
    pub metadata: Option<ResourceMetadata>,
}

impl Introspectable for ResourceReference {
    const COLUMNS: &'static [ColumnDescriptor<Self>] = columns!(ResourceReference {
        "reference_to": Text => |r| Some(FieldValue::text(&r.reference_to)),
        "reference_from": Text => |r| Some(FieldValue::text(&r.reference_from)),
        "from_block_type": Text => |r| Some(FieldValue::text(&r.block_type)),
        "from_block_name": Text => |r| Some(FieldValue::text(&r.block_name)),
        "from_attribute": Text => |r| Some(FieldValue::text(&r.attribute)),
    });
}

impl Resource for ResourceReference {
    const KIND: ResourceKind = ResourceKind::Reference;
    fn name(&self) -> String {
        format!("{}.{}->{}", self.reference_from, self.attribute, self.reference_to)
    }
    fn short_name(&self) -> &str {
        &self.reference_to
    }
    fn metadata(&self) -> Option<&ResourceMetadata> {
        self.metadata.as_ref()
    }
    fn collection(resources: &WorkspaceResources) -> &BTreeMap<String, Self> {
        &resources.references
    }
    fn collection_mut(resources: &mut WorkspaceResources) -> &mut BTreeMap<String, Self> {
        &mut resources.references
    }
    fn alias(&self) -> Option<String> {
        None
    }
}

// ------------- Collections -------------
/// All resources loaded from a workspace, one map per kind. The loader keys
/// each resource by its name and by its unqualified alias, so the same
/// resource can be present twice in a map.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct WorkspaceResources {
    pub controls: BTreeMap<String, Control>,
    pub queries: BTreeMap<String, Query>,
    pub benchmarks: BTreeMap<String, Benchmark>,
    pub mods: BTreeMap<String, Mod>,
    pub variables: BTreeMap<String, Variable>,
    pub references: BTreeMap<String, ResourceReference>,
}

impl WorkspaceResources {
    pub fn new() -> Self {
        Self::default()
    }
    /// Add a resource under its name and, if it has one, its alias.
    pub fn add<R: Resource + Clone>(&mut self, resource: R) {
        let collection = R::collection_mut(self);
        if let Some(alias) = resource.alias() {
            collection.insert(alias, resource.clone());
        }
        collection.insert(resource.name(), resource);
    }
    /// Parse a workspace file and [`normalize`](Self::normalize) it.
    pub fn from_json(text: &str) -> Result<Self> {
        let mut resources: WorkspaceResources = serde_json::from_str(text)?;
        resources.normalize();
        Ok(resources)
    }
    /// Entries without a name take it from their map key, so that no two
    /// of them collapse onto the same empty name.
    pub fn normalize(&mut self) {
        fn fill<R: Resource>(collection: &mut BTreeMap<String, R>) {
            for (key, resource) in collection.iter_mut() {
                resource.fill_name(key);
            }
        }
        fill(&mut self.controls);
        fill(&mut self.queries);
        fill(&mut self.benchmarks);
        fill(&mut self.mods);
        fill(&mut self.variables);
        fill(&mut self.references);
    }
    pub fn get<R: Resource>(&self, key: &str) -> Option<&R> {
        R::collection(self).get(key)
    }
    /// Number of map entries across all kinds, aliases included.
    pub fn len(&self) -> usize {
        self.controls.len()
            + self.queries.len()
            + self.benchmarks.len()
            + self.mods.len()
            + self.variables.len()
            + self.references.len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{columns_for, values_for};

    fn demo_mod() -> Mod {
        Mod { short_name: "demo".into(), full_name: "mod.demo".into(), ..Default::default() }
    }

    #[test]
    fn set_mod_records_names() {
        let mut metadata = ResourceMetadata::default();
        metadata.set_mod(&demo_mod());
        assert_eq!(metadata.mod_name.as_deref(), Some("mod.demo"));
        assert_eq!(metadata.mod_short_name.as_deref(), Some("demo"));
    }

    #[test]
    fn set_mod_skips_default_mod() {
        let mut metadata = ResourceMetadata::default();
        let local = Mod { short_name: DEFAULT_MOD_NAME.into(), full_name: "mod.local".into(), ..Default::default() };
        metadata.set_mod(&local);
        assert!(metadata.mod_name.is_none());
        assert!(metadata.mod_short_name.is_none());
    }

    #[test]
    fn resource_name_is_not_a_metadata_column() {
        assert!(columns_for::<ResourceMetadata>().iter().all(|c| c.name != "resource_name"));
        let metadata = ResourceMetadata { resource_name: "x".into(), ..Default::default() };
        assert!(values_for(&metadata).iter().all(|(c, _)| c.name != "resource_name"));
    }

    #[test]
    fn add_keys_by_name_and_alias() {
        let mut resources = WorkspaceResources::new();
        resources.add(Control {
            short_name: "my_check".into(),
            full_name: "demo.control.my_check".into(),
            ..Default::default()
        });
        assert_eq!(resources.controls.len(), 2);
        assert!(resources.get::<Control>("control.my_check").is_some());
        assert!(resources.get::<Control>("demo.control.my_check").is_some());
        resources.add(ResourceReference { reference_to: "query.q".into(), ..Default::default() });
        assert_eq!(resources.references.len(), 1);
    }

    #[test]
    fn every_kind_has_a_resource_column() {
        for names in [
            columns_for::<Control>(),
            columns_for::<Query>(),
            columns_for::<Benchmark>(),
            columns_for::<Mod>(),
            columns_for::<Variable>(),
        ] {
            assert_eq!(names[0].name, "resource_name");
        }
        assert_eq!(columns_for::<ResourceReference>()[0].name, "reference_to");
    }

    #[test]
    fn normalize_keeps_explicit_names() {
        let mut resources = WorkspaceResources::new();
        resources.controls.insert("control.a".into(), Control { short_name: "x".into(), full_name: "demo.control.x".into(), ..Default::default() });
        resources.queries.insert("demo.query.q".into(), Query::default());
        resources.normalize();
        assert_eq!(resources.controls["control.a"].full_name, "demo.control.x");
        assert_eq!(resources.controls["control.a"].short_name, "x");
        assert_eq!(resources.queries["demo.query.q"].full_name, "demo.query.q");
        assert_eq!(resources.queries["demo.query.q"].short_name, "q");
    }

    #[test]
    fn workspace_loads_from_json() {
        let json = r#"{
            "variables": {
                "var.port": {
                    "short_name": "port",
                    "full_name": "var.port",
                    "type": "number",
                    "default": 5432
                }
            }
        }"#;
        let resources: WorkspaceResources = serde_json::from_str(json).unwrap();
        let port = resources.get::<Variable>("var.port").unwrap();
        assert_eq!(port.var_type, Some(DynamicType::Number));
        assert_eq!(port.default, Some(DynamicValue::Number(5432.0)));
    }
}

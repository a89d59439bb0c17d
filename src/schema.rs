//! Schema document model, YAML loading, and validation.
//!
//! This module owns the [`SchemaDocument`] (the desired state of every managed
//! resource), the [`FieldType`] enum (5 supported column types), and the
//! conversion of declared fields into the [`FieldSpec`] values the diff engine
//! consumes.
//!
//! ## Responsibilities
//!
//! - YAML parsing via `serde_yaml` into a permissive raw form
//! - Validation with precise messages before any store access
//! - Defaults for the `x-header-row` / `x-header-column` overrides
//! - The commented template written by `init`

use std::{collections::HashSet, fmt, fs, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    diff::FieldSpec,
    error::{MigrateError, Result},
    locator,
};

pub const DATETIME_FORMATS: &[&str] = &["default", "date", "time"];

pub const DEFAULT_TEMPLATE: &str = r#"resources:
  - name: example_table # name is the sheet (tab) name
    # URL of the spreadsheet that holds the sheet
    path: https://docs.google.com/spreadsheets/d/1_XXXXXXXXXXXXXXXX-xXXXXXXXXXXXX
    # optional: row holding the column headers (default is 1)
    # x-header-row: 1
    # optional: first column of the table (default is 1)
    # x-header-column: 1
    fields:
      - name: id
        type: integer
        # optional: reserved, protects this field from being overwritten
        # x-protect: true
      - name: name
        type: string
      - name: created_at
        type: datetime
        format: default
        # optional: keep the column hidden
        # x-hidden: true
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    DateTime,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::DateTime => "datetime",
        }
    }

    pub fn variants() -> &'static [&'static str] {
        &["string", "integer", "number", "boolean", "datetime"]
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = MigrateError;

    fn from_str(value: &str) -> Result<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "string" | "text" => Ok(FieldType::String),
            "integer" | "int" => Ok(FieldType::Integer),
            "number" | "float" | "double" | "decimal" => Ok(FieldType::Number),
            "boolean" | "bool" => Ok(FieldType::Boolean),
            "datetime" | "date-time" | "timestamp" => Ok(FieldType::DateTime),
            _ => Err(MigrateError::schema(format!(
                "unknown field type '{value}'. Supported types: {}",
                FieldType::variants().join(", ")
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub format: String,
    #[serde(rename = "x-hidden", skip_serializing_if = "std::ops::Not::not")]
    pub hidden: bool,
    #[serde(rename = "x-protect", skip_serializing_if = "std::ops::Not::not")]
    pub protect: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            format: String::new(),
            hidden: false,
            protect: false,
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    pub name: String,
    pub path: String,
    #[serde(rename = "x-header-row")]
    pub header_row: usize,
    #[serde(rename = "x-header-column")]
    pub header_column: usize,
    pub fields: Vec<Field>,
}

impl Resource {
    pub fn new(name: impl Into<String>, path: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            header_row: 1,
            header_column: 1,
            fields,
        }
    }

    pub fn store_id(&self) -> Result<String> {
        locator::parse_store_id(&self.path)
            .map_err(|err| MigrateError::schema(format!("resource '{}': {err}", self.name)))
    }

    /// 0-based index of the first column the table occupies.
    pub fn column_offset(&self) -> usize {
        self.header_column.saturating_sub(1)
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|field| field.name.clone()).collect()
    }

    /// Fields in document order with their positions attached.
    pub fn field_specs(&self) -> Vec<FieldSpec> {
        self.fields
            .iter()
            .enumerate()
            .map(|(position, field)| FieldSpec {
                name: field.name.clone(),
                field_type: field.field_type,
                format: field.format.clone(),
                hidden: field.hidden,
                protect: field.protect,
                position,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaDocument {
    pub resources: Vec<Resource>,
}

impl SchemaDocument {
    pub fn parse_str(input: &str) -> Result<Self> {
        let raw: RawDocument = serde_yaml::from_str(input)
            .map_err(|err| MigrateError::schema(format!("invalid YAML: {err}")))?;
        raw.into_document()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|err| {
            MigrateError::schema(format!("cannot read schema file {path:?}: {err}"))
        })?;
        Self::parse_str(&contents)
    }

    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|resource| resource.name == name)
    }
}

pub fn default_template() -> String {
    format!("{}\n", DEFAULT_TEMPLATE.trim())
}

#[derive(Debug, Default, Deserialize)]
struct RawDocument {
    #[serde(default)]
    resources: Vec<RawResource>,
}

#[derive(Debug, Default, Deserialize)]
struct RawResource {
    #[serde(default)]
    name: String,
    #[serde(default)]
    path: String,
    #[serde(default, rename = "x-header-row")]
    header_row: Option<usize>,
    #[serde(default, rename = "x-header-column")]
    header_column: Option<usize>,
    #[serde(default)]
    fields: Vec<RawField>,
}

#[derive(Debug, Default, Deserialize)]
struct RawField {
    #[serde(default)]
    name: String,
    #[serde(default, rename = "type")]
    field_type: String,
    #[serde(default)]
    format: Option<String>,
    #[serde(default, rename = "x-hidden")]
    hidden: bool,
    #[serde(default, rename = "x-protect")]
    protect: bool,
}

impl RawDocument {
    fn into_document(self) -> Result<SchemaDocument> {
        if self.resources.is_empty() {
            return Err(MigrateError::schema("at least one resource is required"));
        }
        let mut seen = HashSet::new();
        let mut resources = Vec::with_capacity(self.resources.len());
        for (idx, raw) in self.resources.into_iter().enumerate() {
            let resource = raw.into_resource(idx)?;
            if !seen.insert(resource.name.clone()) {
                return Err(MigrateError::schema(format!(
                    "duplicate resource name '{}'",
                    resource.name
                )));
            }
            resources.push(resource);
        }
        Ok(SchemaDocument { resources })
    }
}

impl RawResource {
    fn into_resource(self, idx: usize) -> Result<Resource> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(MigrateError::schema(format!(
                "resources[{idx}]: resource name is required"
            )));
        }
        let path = self.path.trim().to_string();
        if path.is_empty() {
            return Err(MigrateError::schema(format!(
                "resource '{name}': resource path is required"
            )));
        }
        if self.fields.is_empty() {
            return Err(MigrateError::schema(format!(
                "resource '{name}': at least one field is required"
            )));
        }

        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(self.fields.len());
        for (field_idx, raw) in self.fields.into_iter().enumerate() {
            let field = raw.into_field().map_err(|msg| {
                MigrateError::schema(format!("resource '{name}': fields[{field_idx}]: {msg}"))
            })?;
            if !seen.insert(field.name.clone()) {
                return Err(MigrateError::schema(format!(
                    "resource '{name}': duplicate field name '{}'",
                    field.name
                )));
            }
            fields.push(field);
        }

        let resource = Resource {
            name,
            path,
            // 0 is treated like an omitted override
            header_row: self.header_row.filter(|row| *row > 0).unwrap_or(1),
            header_column: self.header_column.filter(|column| *column > 0).unwrap_or(1),
            fields,
        };
        resource.store_id()?;
        Ok(resource)
    }
}

impl RawField {
    fn into_field(self) -> std::result::Result<Field, String> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err("field name is required".to_string());
        }
        if self.field_type.trim().is_empty() {
            return Err(format!("field '{name}': field type is required"));
        }
        let field_type = FieldType::from_str(&self.field_type).map_err(|err| match err {
            MigrateError::Schema(msg) => format!("field '{name}': {msg}"),
            other => other.to_string(),
        })?;
        let format = self.format.unwrap_or_default().trim().to_string();
        if field_type == FieldType::DateTime
            && !format.is_empty()
            && !DATETIME_FORMATS.contains(&format.as_str())
        {
            return Err(format!(
                "field '{name}': datetime format must be one of {}, got '{format}'",
                DATETIME_FORMATS.join(", ")
            ));
        }
        Ok(Field {
            name,
            field_type,
            format,
            hidden: self.hidden,
            protect: self.protect,
        })
    }
}

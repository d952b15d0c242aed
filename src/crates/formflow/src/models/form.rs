//! Form definitions
//!
//! A [`Form`] owns a [`FormSchema`]: an ordered list of [`FormField`]s whose
//! ids are unique within the form. Field types are a closed sum type
//! ([`FieldKind`]) serialized with a `type` tag, so the persisted schema JSON
//! keeps the `{ id, label, required, placeholder?, type, ... }` shape.

use crate::error::{FormflowError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A form definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Form {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub schema: FormSchema,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Form {
    /// Create a new form with an empty schema
    pub fn new(title: impl Into<String>) -> Self {
        let title = title.into();
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.clone(),
            description: None,
            schema: FormSchema::new(title),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.schema.description = description.clone();
        self.description = Some(description);
        self
    }
}

/// Persisted schema JSON: `{ title, description, fields[] }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormSchema {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub fields: Vec<FormField>,
}

/// Discriminant of a field type, used where only the type matters
/// (condition rules, statistics)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Email,
    Number,
    Textarea,
    Select,
    Radio,
    Checkbox,
    Date,
    Relation,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Email => "email",
            Self::Number => "number",
            Self::Textarea => "textarea",
            Self::Select => "select",
            Self::Radio => "radio",
            Self::Checkbox => "checkbox",
            Self::Date => "date",
            Self::Relation => "relation",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Type-specific part of a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Email,
    Number,
    Textarea,
    Select {
        #[serde(default)]
        options: Vec<String>,
    },
    Radio {
        #[serde(default)]
        options: Vec<String>,
    },
    Checkbox,
    Date,
    Relation {
        #[serde(
            rename = "relationConfig",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        relation_config: Option<RelationConfig>,
    },
}

impl FieldKind {
    pub fn field_type(&self) -> FieldType {
        match self {
            Self::Text => FieldType::Text,
            Self::Email => FieldType::Email,
            Self::Number => FieldType::Number,
            Self::Textarea => FieldType::Textarea,
            Self::Select { .. } => FieldType::Select,
            Self::Radio { .. } => FieldType::Radio,
            Self::Checkbox => FieldType::Checkbox,
            Self::Date => FieldType::Date,
            Self::Relation { .. } => FieldType::Relation,
        }
    }

    /// Choice list of `select` and `radio` fields
    pub fn options(&self) -> Option<&[String]> {
        match self {
            Self::Select { options } | Self::Radio { options } => Some(options),
            _ => None,
        }
    }
}

/// Target of a `relation` field
///
/// The stored value of a relation field is the target form's id:
/// `value_field` always equals `form_id`. The response a user picks is kept
/// only as local control state (see `relation::RelationFieldState`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationConfig {
    pub form_id: String,
    #[serde(default)]
    pub form_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_field: Option<String>,
    pub value_field: String,
}

impl RelationConfig {
    pub fn new(form_id: impl Into<String>, form_title: impl Into<String>) -> Self {
        let form_id = form_id.into();
        Self {
            value_field: form_id.clone(),
            form_id,
            form_title: form_title.into(),
            display_field: None,
        }
    }

    pub fn with_display_field(mut self, field_id: impl Into<String>) -> Self {
        self.display_field = Some(field_id.into());
        self
    }

    /// Point the relation at another form, keeping `value_field` in step
    pub fn retarget(&mut self, form_id: impl Into<String>, form_title: impl Into<String>) {
        let form_id = form_id.into();
        self.value_field = form_id.clone();
        self.form_id = form_id;
        self.form_title = form_title.into();
        self.display_field = None;
    }

    /// Value persisted for a relation field configured with `self`
    pub fn stored_value(&self) -> &str {
        &self.value_field
    }
}

/// A single form field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(flatten)]
    pub kind: FieldKind,
}

impl FormField {
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            required: false,
            placeholder: None,
            kind,
        }
    }

    /// Field with a generated id
    pub fn generated(label: impl Into<String>, kind: FieldKind) -> Self {
        let id = format!("field_{}", uuid::Uuid::new_v4().simple());
        Self::new(id, label, kind)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn field_type(&self) -> FieldType {
        self.kind.field_type()
    }

    /// Relation target, if this is a configured relation field
    pub fn relation_config(&self) -> Option<&RelationConfig> {
        match &self.kind {
            FieldKind::Relation { relation_config } => relation_config.as_ref(),
            _ => None,
        }
    }
}

/// Problem found in a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaIssue {
    DuplicateFieldId(String),
    EmptyOptions { field_id: String },
    RelationNotConfigured { field_id: String },
    EmptyLabel { field_id: String },
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateFieldId(id) => write!(f, "duplicate field id '{}'", id),
            Self::EmptyOptions { field_id } => write!(f, "field '{}' has no options", field_id),
            Self::RelationNotConfigured { field_id } => {
                write!(f, "relation field '{}' has no target form", field_id)
            }
            Self::EmptyLabel { field_id } => write!(f, "field '{}' has no label", field_id),
        }
    }
}

/// Result of [`FormSchema::validate`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaReport {
    pub errors: Vec<SchemaIssue>,
    pub warnings: Vec<SchemaIssue>,
}

impl SchemaReport {
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }
}

impl FormSchema {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            fields: Vec::new(),
        }
    }

    pub fn field(&self, id: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.id == id)
    }

    fn position(&self, id: &str) -> Result<usize> {
        self.fields
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| FormflowError::not_found("Field", id))
    }

    /// Append a field; ids must stay unique
    pub fn add_field(&mut self, field: FormField) -> Result<()> {
        if self.field(&field.id).is_some() {
            return Err(FormflowError::validation(format!(
                "field id '{}' already exists",
                field.id
            )));
        }
        self.fields.push(field);
        Ok(())
    }

    /// Replace the field with `id`; the replacement may carry a new id as long
    /// as it does not collide with another field
    pub fn update_field(&mut self, id: &str, field: FormField) -> Result<()> {
        let index = self.position(id)?;
        if field.id != id && self.field(&field.id).is_some() {
            return Err(FormflowError::validation(format!(
                "field id '{}' already exists",
                field.id
            )));
        }
        self.fields[index] = field;
        Ok(())
    }

    pub fn remove_field(&mut self, id: &str) -> Result<FormField> {
        let index = self.position(id)?;
        Ok(self.fields.remove(index))
    }

    /// Move the field with `id` to position `to` (clamped to the end)
    pub fn move_field(&mut self, id: &str, to: usize) -> Result<()> {
        let from = self.position(id)?;
        let field = self.fields.remove(from);
        let to = to.min(self.fields.len());
        self.fields.insert(to, field);
        Ok(())
    }

    /// Relation fields, in schema order
    pub fn relation_fields(&self) -> impl Iterator<Item = &FormField> {
        self.fields
            .iter()
            .filter(|f| f.field_type() == FieldType::Relation)
    }

    /// Check the schema; only duplicate ids block saving
    pub fn validate(&self) -> SchemaReport {
        let mut report = SchemaReport::default();
        let mut seen = HashSet::new();

        for field in &self.fields {
            if !seen.insert(field.id.as_str()) {
                report
                    .errors
                    .push(SchemaIssue::DuplicateFieldId(field.id.clone()));
            }
            if field.label.trim().is_empty() {
                report.warnings.push(SchemaIssue::EmptyLabel {
                    field_id: field.id.clone(),
                });
            }
            match &field.kind {
                FieldKind::Select { options } | FieldKind::Radio { options }
                    if options.is_empty() =>
                {
                    report.warnings.push(SchemaIssue::EmptyOptions {
                        field_id: field.id.clone(),
                    });
                }
                FieldKind::Relation { relation_config }
                    if relation_config
                        .as_ref()
                        .map_or(true, |c| c.form_id.is_empty()) =>
                {
                    report.warnings.push(SchemaIssue::RelationNotConfigured {
                        field_id: field.id.clone(),
                    });
                }
                _ => {}
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_relation_field_wire_shape() {
        let field = FormField::new(
            "customer",
            "Customer",
            FieldKind::Relation {
                relation_config: Some(
                    RelationConfig::new("form-7", "Customers").with_display_field("name"),
                ),
            },
        )
        .required();

        let value = serde_json::to_value(&field).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "customer",
                "label": "Customer",
                "required": true,
                "type": "relation",
                "relationConfig": {
                    "formId": "form-7",
                    "formTitle": "Customers",
                    "displayField": "name",
                    "valueField": "form-7"
                }
            })
        );
    }

    #[test]
    fn test_parse_select_field() {
        let field: FormField = serde_json::from_value(json!({
            "id": "color",
            "label": "Color",
            "required": false,
            "placeholder": "Pick one",
            "type": "select",
            "options": ["red", "green"]
        }))
        .unwrap();
        assert_eq!(field.field_type(), FieldType::Select);
        assert_eq!(field.kind.options().unwrap().len(), 2);
        assert_eq!(field.placeholder.as_deref(), Some("Pick one"));
    }

    #[test]
    fn test_add_field_rejects_duplicate_ids() {
        let mut schema = FormSchema::new("Intake");
        schema
            .add_field(FormField::new("name", "Name", FieldKind::Text))
            .unwrap();
        let err = schema
            .add_field(FormField::new("name", "Other", FieldKind::Email))
            .unwrap_err();
        assert!(matches!(err, FormflowError::Validation(_)));
        assert_eq!(schema.fields.len(), 1);
    }

    #[test]
    fn test_update_and_move_fields() {
        let mut schema = FormSchema::new("Intake");
        for id in ["a", "b", "c"] {
            schema
                .add_field(FormField::new(id, id, FieldKind::Text))
                .unwrap();
        }
        assert!(schema
            .update_field("a", FormField::new("b", "clash", FieldKind::Text))
            .is_err());
        schema
            .update_field("a", FormField::new("a2", "renamed", FieldKind::Date))
            .unwrap();
        schema.move_field("c", 0).unwrap();

        let ids: Vec<_> = schema.fields.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a2", "b"]);
        assert_eq!(schema.remove_field("b").unwrap().label, "b");
        assert!(schema.remove_field("b").unwrap_err().is_not_found());
    }

    #[test]
    fn test_validate_warns_on_empty_options_and_unconfigured_relation() {
        let schema = FormSchema {
            title: "t".to_string(),
            description: String::new(),
            fields: vec![
                FormField::new("s", "Size", FieldKind::Select { options: vec![] }),
                FormField::new(
                    "r",
                    "Ref",
                    FieldKind::Relation {
                        relation_config: None,
                    },
                ),
                FormField::new("s", "Dup", FieldKind::Text),
            ],
        };
        let report = schema.validate();
        assert!(!report.ok());
        assert_eq!(report.errors, vec![SchemaIssue::DuplicateFieldId("s".to_string())]);
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn test_retarget_keeps_value_field_in_step() {
        let mut config = RelationConfig::new("f1", "One").with_display_field("x");
        config.retarget("f2", "Two");
        assert_eq!(config.value_field, "f2");
        assert_eq!(config.stored_value(), "f2");
        assert!(config.display_field.is_none());
    }
}

//! Field definitions
//!
//! A Field is a typed column of a database. Fields are read-only inputs to the
//! view pipeline: filters, sorts, grouping and summaries look them up by id to
//! decide how a row's string-encoded property should be interpreted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;

/// Reserved field id that addresses a row's title rather than a property.
pub const TITLE_FIELD_ID: &str = "title";

/// Field data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Number,
    Select,
    MultiSelect,
    Status,
    Date,
    Checkbox,
    Url,
    Email,
    Phone,
    Person,
    Relation,
    Formula,
    Rollup,
    Files,
    CreatedTime,
    LastEditedTime,
}

impl FieldType {
    /// Types whose values are free-form text and can be searched.
    pub fn is_text_like(self) -> bool {
        matches!(
            self,
            FieldType::Text | FieldType::Url | FieldType::Email | FieldType::Phone
        )
    }

    pub fn is_number_like(self) -> bool {
        matches!(self, FieldType::Number)
    }

    pub fn is_date_like(self) -> bool {
        matches!(
            self,
            FieldType::Date | FieldType::CreatedTime | FieldType::LastEditedTime
        )
    }

    /// Types that hold one value out of a fixed option list.
    pub fn is_option_like(self) -> bool {
        matches!(self, FieldType::Select | FieldType::Status)
    }

    /// Only number and date fields support group footers.
    pub fn supports_summary(self) -> bool {
        matches!(self, FieldType::Number | FieldType::Date)
    }
}

/// One choice of a select, multi-select or status field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// Type-specific configuration of a field.
///
/// Select options are modelled explicitly because the board layout orders its
/// columns by them; everything else (formula source, rollup target, number
/// format, ...) is carried through untouched in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSettings {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// A typed column definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub settings: FieldSettings,
}

impl Field {
    pub fn new(id: impl Into<String>, name: impl Into<String>, field_type: FieldType) -> Self {
        Field {
            id: id.into(),
            name: name.into(),
            field_type,
            settings: FieldSettings::default(),
        }
    }

    /// Attach select options, in display order.
    pub fn with_options<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.settings.options = names
            .into_iter()
            .map(|name| SelectOption {
                id: None,
                name: name.into(),
                color: None,
            })
            .collect();
        self
    }

    /// The pseudo-field standing for a row's title.
    pub fn title() -> Self {
        Field::new(TITLE_FIELD_ID, "Title", FieldType::Text)
    }

    pub fn is_title(&self) -> bool {
        self.id == TITLE_FIELD_ID
    }
}

/// Lookup from field id to definition.
///
/// Field definitions can be deleted independently of the view configuration
/// that references them, so every consumer goes through `get` and treats a
/// `None` as "skip this reference".
#[derive(Debug)]
pub struct FieldIndex<'a> {
    by_id: HashMap<&'a str, &'a Field>,
    title: Field,
}

impl<'a> FieldIndex<'a> {
    pub fn new(fields: &'a [Field]) -> Self {
        FieldIndex {
            by_id: fields.iter().map(|f| (f.id.as_str(), f)).collect(),
            title: Field::title(),
        }
    }

    /// Resolve a field id. The title pseudo-field always wins over a property
    /// that happens to share its id.
    pub fn get(&self, field_id: &str) -> Option<&Field> {
        if field_id == TITLE_FIELD_ID {
            return Some(&self.title);
        }
        self.by_id.get(field_id).copied()
    }

    /// Case-insensitive lookup by display name.
    pub fn find_by_name(&self, name: &str) -> Option<&Field> {
        self.by_id
            .values()
            .copied()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_classes() {
        assert!(FieldType::Number.is_number_like());
        assert!(FieldType::CreatedTime.is_date_like());
        assert!(FieldType::Email.is_text_like());
        assert!(FieldType::Status.is_option_like());
        assert!(!FieldType::MultiSelect.is_option_like());
        assert!(FieldType::Date.supports_summary());
        assert!(!FieldType::CreatedTime.supports_summary());
    }

    #[test]
    fn test_field_index_lookup() {
        let fields = vec![
            Field::new("f1", "Status", FieldType::Status),
            Field::new("f2", "Due Date", FieldType::Date),
        ];
        let index = FieldIndex::new(&fields);

        assert_eq!(index.len(), 2);
        assert_eq!(index.get("f2").map(|f| f.field_type), Some(FieldType::Date));
        assert!(index.get("gone").is_none());
        assert_eq!(index.find_by_name("due date").map(|f| f.id.as_str()), Some("f2"));
    }

    #[test]
    fn test_title_pseudo_field() {
        let fields = vec![Field::new("title", "Shadowed", FieldType::Number)];
        let index = FieldIndex::new(&fields);

        let title = index.get(TITLE_FIELD_ID).unwrap();
        assert!(title.is_title());
        assert_eq!(title.field_type, FieldType::Text);
    }

    #[test]
    fn test_field_json_shape() {
        let json = r#"{
            "id": "s",
            "name": "Stage",
            "type": "status",
            "settings": {
                "options": [{"name": "Todo", "color": "gray"}, {"name": "Done"}],
                "default_option": "Todo"
            }
        }"#;
        let field: Field = serde_json::from_str(json).unwrap();

        assert_eq!(field.field_type, FieldType::Status);
        assert_eq!(field.settings.options.len(), 2);
        assert_eq!(field.settings.options[0].color.as_deref(), Some("gray"));
        assert_eq!(
            field.settings.extra.get("default_option"),
            Some(&JsonValue::String("Todo".to_string()))
        );

        let minimal: Field = serde_json::from_str(r#"{"id":"n","name":"N","type":"number"}"#).unwrap();
        assert!(minimal.settings.options.is_empty());
    }
}

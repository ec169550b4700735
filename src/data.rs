use serde::{Deserialize, Serialize};

/// Name of the reserved identity field injected into every upserted document.
pub const ID_FIELD: &str = "_id";

/// The value type for fields in a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataValue {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),

    /// String content indexed verbatim as a single term (keywords, IDs).
    String(String),

    /// Text content to be run through the field's analyzer.
    Text(String),

    /// Date and time in UTC.
    DateTime(chrono::DateTime<chrono::Utc>),

    /// Raw bytes. Only indexable when they hold valid UTF-8.
    Bytes(Vec<u8>),
}

impl DataValue {
    /// Returns the text value if this is a Text or String variant.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            DataValue::Text(s) | DataValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as `f64` for Int64 and Float64 variants.
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            DataValue::Int64(i) => Some(*i as f64),
            DataValue::Float64(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            DataValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        match self {
            DataValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Number of plain-text bytes this value contributes to indexing stats.
    pub fn plain_text_bytes(&self) -> u64 {
        match self {
            DataValue::Text(s) | DataValue::String(s) => s.len() as u64,
            _ => 0,
        }
    }
}

impl From<String> for DataValue {
    fn from(v: String) -> Self {
        DataValue::Text(v)
    }
}

impl From<&str> for DataValue {
    fn from(v: &str) -> Self {
        DataValue::Text(v.to_string())
    }
}

impl From<i64> for DataValue {
    fn from(v: i64) -> Self {
        DataValue::Int64(v)
    }
}

impl From<i32> for DataValue {
    fn from(v: i32) -> Self {
        DataValue::Int64(v as i64)
    }
}

impl From<f64> for DataValue {
    fn from(v: f64) -> Self {
        DataValue::Float64(v)
    }
}

impl From<bool> for DataValue {
    fn from(v: bool) -> Self {
        DataValue::Bool(v)
    }
}

impl From<chrono::DateTime<chrono::Utc>> for DataValue {
    fn from(dt: chrono::DateTime<chrono::Utc>) -> Self {
        DataValue::DateTime(dt)
    }
}

/// How a field is indexed and stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    /// Whether the field is analyzed into the term dictionary.
    pub indexed: bool,
    /// Whether the original value is kept for retrieval.
    pub stored: bool,
    /// Whether the field contributes to composite fields.
    pub include_in_composites: bool,
}

impl Default for FieldOption {
    fn default() -> Self {
        FieldOption {
            indexed: true,
            stored: true,
            include_in_composites: true,
        }
    }
}

/// A named value together with its indexing options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value: DataValue,
    pub option: FieldOption,
}

impl Field {
    pub fn new(name: impl Into<String>, value: impl Into<DataValue>, option: FieldOption) -> Self {
        Field {
            name: name.into(),
            value: value.into(),
            option,
        }
    }

    /// The identity field carrying a document's external ID.
    pub(crate) fn identity(id: &str) -> Self {
        Field {
            name: ID_FIELD.to_string(),
            value: DataValue::String(id.to_string()),
            option: FieldOption {
                indexed: true,
                stored: true,
                include_in_composites: false,
            },
        }
    }
}

/// A derived field whose terms are the aggregate of other fields' terms.
///
/// An empty `include` list means every field except those in `exclude`.
/// The identity field never contributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeField {
    pub name: String,
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl CompositeField {
    pub fn new(name: impl Into<String>) -> Self {
        CompositeField {
            name: name.into(),
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }

    pub fn include(mut self, field: impl Into<String>) -> Self {
        self.include.push(field.into());
        self
    }

    pub fn exclude(mut self, field: impl Into<String>) -> Self {
        self.exclude.push(field.into());
        self
    }

    /// Whether the named plain field feeds this composite.
    pub fn includes_field(&self, field: &str) -> bool {
        if field == ID_FIELD || self.exclude.iter().any(|f| f == field) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|f| f == field)
    }
}

/// A document submitted for indexing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// External identifier. Batches assign a UUID (v4) when absent.
    pub id: Option<String>,

    pub fields: Vec<Field>,

    #[serde(default)]
    pub composite_fields: Vec<CompositeField>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_with_id(id: impl Into<String>) -> Self {
        Document {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Add a field with default options.
    pub fn add_field(self, name: impl Into<String>, value: impl Into<DataValue>) -> Self {
        self.add_field_with_option(name, value, FieldOption::default())
    }

    pub fn add_field_with_option(
        mut self,
        name: impl Into<String>,
        value: impl Into<DataValue>,
        option: FieldOption,
    ) -> Self {
        self.fields.push(Field::new(name, value, option));
        self
    }

    pub fn add_text(self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.add_field(name, DataValue::Text(text.into()))
    }

    pub fn add_keyword(self, name: impl Into<String>, keyword: impl Into<String>) -> Self {
        self.add_field(name, DataValue::String(keyword.into()))
    }

    pub fn add_integer(self, name: impl Into<String>, value: i64) -> Self {
        self.add_field(name, DataValue::Int64(value))
    }

    pub fn add_float(self, name: impl Into<String>, value: f64) -> Self {
        self.add_field(name, DataValue::Float64(value))
    }

    pub fn add_composite(mut self, composite: CompositeField) -> Self {
        self.composite_fields.push(composite);
        self
    }

    /// First field with the given name.
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn num_plain_text_bytes(&self) -> u64 {
        self.fields.iter().map(|f| f.value.plain_text_bytes()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_builder() {
        let doc = Document::new_with_id("doc1")
            .add_text("title", "Hello")
            .add_integer("year", 2024)
            .add_keyword("tag", "rust");

        assert_eq!(doc.id.as_deref(), Some("doc1"));
        assert_eq!(doc.fields.len(), 3);
        assert_eq!(doc.get("year").unwrap().value.as_numeric(), Some(2024.0));
        assert!(doc.has_field("tag"));
        assert_eq!(doc.num_plain_text_bytes(), 9);
    }

    #[test]
    fn test_composite_field_membership() {
        let all = CompositeField::new("_all").exclude("secret");
        assert!(all.includes_field("title"));
        assert!(!all.includes_field("secret"));
        assert!(!all.includes_field(ID_FIELD));

        let only_title = CompositeField::new("text").include("title");
        assert!(only_title.includes_field("title"));
        assert!(!only_title.includes_field("body"));
    }

    #[test]
    fn test_identity_field() {
        let field = Field::identity("doc7");
        assert_eq!(field.name, ID_FIELD);
        assert_eq!(field.value, DataValue::String("doc7".to_string()));
        assert!(!field.option.include_in_composites);
    }
}

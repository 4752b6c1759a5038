use serde::{Deserialize, Serialize};

use descriptor::{DescriptorFields, Document, Family, FamilySet, FieldValue, Fields};

/// Query-side descriptor bundle. Same typing as a [`Document`], without an id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryBundle {
    fields: Fields,
}

impl QueryBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: Fields) -> Self {
        Self { fields }
    }

    /// Copy the fields of `families` out of a stored document.
    pub fn from_document(doc: &Document, families: &FamilySet) -> Self {
        let fields = families
            .iter()
            .flat_map(Family::fields)
            .filter_map(|name| {
                doc.fields
                    .get(*name)
                    .map(|value| ((*name).to_string(), value.clone()))
            })
            .collect();
        Self { fields }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    /// Families fully present in the bundle.
    pub fn families(&self) -> FamilySet {
        Family::ALL
            .into_iter()
            .filter(|family| self.has_family(*family))
            .collect()
    }

    /// True when no family is fully present.
    pub fn is_empty(&self) -> bool {
        self.families().is_empty()
    }

    pub fn into_fields(self) -> Fields {
        self.fields
    }
}

impl DescriptorFields for QueryBundle {
    fn fields(&self) -> &Fields {
        &self.fields
    }
}

impl From<Fields> for QueryBundle {
    fn from(fields: Fields) -> Self {
        Self::from_fields(fields)
    }
}

//! Document and field types for the CBIR descriptor layer.
//!
//! A [`Document`] is the persisted unit: an id plus a map from field name to
//! a [`FieldValue`]. Field names are grouped into eight [`Family`] values;
//! the family table here is the single source every other crate (scoring,
//! averaging, store push-down) reads field names from.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::DescriptorError;

/// Field map shared by documents and query bundles.
pub type Fields = BTreeMap<String, FieldValue>;

/// One descriptor family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Family {
    #[serde(rename = "mean")]
    Mean,
    #[serde(rename = "hist", alias = "histogram")]
    Histogram,
    #[serde(rename = "glcm", alias = "texture")]
    Texture,
    #[serde(rename = "hog")]
    Hog,
    #[serde(rename = "gist")]
    Gist,
    #[serde(rename = "dct")]
    Dct,
    #[serde(rename = "wavelet")]
    Wavelet,
    #[serde(rename = "corners")]
    Corners,
}

const MEAN_FIELDS: &[&str] = &["r_mean", "g_mean", "b_mean", "i_mean"];
const HIST_FIELDS: &[&str] = &["r_hist", "g_hist", "b_hist", "i_hist"];
const TEXTURE_FIELDS: &[&str] = &[
    "energy",
    "contrast",
    "entropy",
    "dissimilarity",
    "homogeneity",
    "correlation",
];

impl Family {
    /// Every family, in canonical order.
    pub const ALL: [Family; 8] = [
        Family::Mean,
        Family::Histogram,
        Family::Texture,
        Family::Hog,
        Family::Gist,
        Family::Dct,
        Family::Wavelet,
        Family::Corners,
    ];

    /// Wire key used by feature selectors.
    pub fn key(self) -> &'static str {
        match self {
            Family::Mean => "mean",
            Family::Histogram => "hist",
            Family::Texture => "glcm",
            Family::Hog => "hog",
            Family::Gist => "gist",
            Family::Dct => "dct",
            Family::Wavelet => "wavelet",
            Family::Corners => "corners",
        }
    }

    /// Field names owned by this family, in storage order.
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            Family::Mean => MEAN_FIELDS,
            Family::Histogram => HIST_FIELDS,
            Family::Texture => TEXTURE_FIELDS,
            Family::Hog => &["hog"],
            Family::Gist => &["gist"],
            Family::Dct => &["dct"],
            Family::Wavelet => &["wavelet"],
            Family::Corners => &["corners"],
        }
    }

    /// Whether every field of the family is a scalar.
    pub fn is_scalar(self) -> bool {
        matches!(self, Family::Mean)
    }

    /// Resolve a selector key, accepting the long aliases.
    pub fn from_key(key: &str) -> Option<Family> {
        match key.trim().to_ascii_lowercase().as_str() {
            "mean" => Some(Family::Mean),
            "hist" | "histogram" => Some(Family::Histogram),
            "glcm" | "texture" => Some(Family::Texture),
            "hog" => Some(Family::Hog),
            "gist" => Some(Family::Gist),
            "dct" => Some(Family::Dct),
            "wavelet" => Some(Family::Wavelet),
            "corners" => Some(Family::Corners),
            _ => None,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Family {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Family::from_key(s)
            .ok_or_else(|| DescriptorError::InvalidRequest(format!("unknown feature key `{s}`")))
    }
}

/// A caller-selected set of families.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FamilySet(BTreeSet<Family>);

impl FamilySet {
    /// All eight families.
    pub fn all() -> Self {
        Family::ALL.into_iter().collect()
    }

    /// Parse selector keys. Unknown keys are rejected rather than ignored.
    pub fn from_keys<I, S>(keys: I) -> Result<Self, DescriptorError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        keys.into_iter()
            .map(|key| key.as_ref().parse::<Family>())
            .collect()
    }

    pub fn contains(&self, family: Family) -> bool {
        self.0.contains(&family)
    }

    pub fn insert(&mut self, family: Family) -> bool {
        self.0.insert(family)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Family> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Family> for FamilySet {
    fn from_iter<T: IntoIterator<Item = Family>>(iter: T) -> Self {
        FamilySet(iter.into_iter().collect())
    }
}

/// A single descriptor value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum FieldValue {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl FieldValue {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            FieldValue::Scalar(v) => Some(*v),
            FieldValue::Vector(_) => None,
        }
    }

    pub fn as_vector(&self) -> Option<&[f64]> {
        match self {
            FieldValue::Scalar(_) => None,
            FieldValue::Vector(v) => Some(v.as_slice()),
        }
    }

    /// Vector length, `None` for scalars.
    pub fn vector_len(&self) -> Option<usize> {
        self.as_vector().map(<[f64]>::len)
    }
}

/// Read access to a named field map, shared by documents and query bundles.
pub trait DescriptorFields {
    fn fields(&self) -> &Fields;

    fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields().get(name)
    }

    /// A family is present only when all of its fields are present with the
    /// variant the family requires.
    fn has_family(&self, family: Family) -> bool {
        family.fields().iter().all(|name| match self.field(name) {
            Some(FieldValue::Scalar(_)) => family.is_scalar(),
            Some(FieldValue::Vector(_)) => !family.is_scalar(),
            None => false,
        })
    }
}

/// Persisted descriptor bundle for one ingested image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Source filename; primary key.
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Fields::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Families fully present on this document.
    pub fn families(&self) -> FamilySet {
        Family::ALL
            .into_iter()
            .filter(|family| self.has_family(*family))
            .collect()
    }
}

impl DescriptorFields for Document {
    fn fields(&self) -> &Fields {
        &self.fields
    }
}

//! The fusion scoring function.
//!
//! A *unit* is one family's contribution. The total is the plain mean of the
//! included units, so a 12-value wavelet summary weighs as much as a
//! 1280-value DCT vector.

use descriptor::{DescriptorFields, Family, FieldValue};

/// Outcome of comparing one field pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cosine {
    Value(f64),
    /// One side has zero norm.
    ZeroNorm,
    /// Lengths differ.
    Mismatch,
}

/// Cosine similarity of two equal-length vectors.
pub fn cosine(a: &[f64], b: &[f64]) -> Cosine {
    if a.len() != b.len() {
        return Cosine::Mismatch;
    }
    let (mut dot, mut na, mut nb) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return Cosine::ZeroNorm;
    }
    Cosine::Value(dot / (na.sqrt() * nb.sqrt()))
}

fn vector<'a, T: DescriptorFields + ?Sized>(bundle: &'a T, name: &str) -> Option<&'a [f64]> {
    bundle.field(name).and_then(FieldValue::as_vector)
}

fn scalars<T: DescriptorFields + ?Sized>(bundle: &T, names: &[&str]) -> Option<Vec<f64>> {
    names
        .iter()
        .map(|name| bundle.field(name).and_then(FieldValue::as_scalar))
        .collect()
}

/// Contribution of `family`, or `None` when the family is excluded.
pub fn family_score<Q, D>(family: Family, query: &Q, doc: &D) -> Option<f64>
where
    Q: DescriptorFields + ?Sized,
    D: DescriptorFields + ?Sized,
{
    if !query.has_family(family) || !doc.has_family(family) {
        return None;
    }
    let names = family.fields();
    match family {
        Family::Mean => {
            let q = scalars(query, names)?;
            let d = scalars(doc, names)?;
            match cosine(&q, &d) {
                Cosine::Value(v) => Some(v),
                Cosine::ZeroNorm | Cosine::Mismatch => None,
            }
        }
        Family::Histogram | Family::Texture => {
            // zero-norm sub-vectors are undefined and leave the average
            let (mut sum, mut count) = (0.0, 0usize);
            for name in names {
                match cosine(vector(query, name)?, vector(doc, name)?) {
                    Cosine::Value(v) => {
                        sum += v;
                        count += 1;
                    }
                    Cosine::ZeroNorm => {}
                    Cosine::Mismatch => return None,
                }
            }
            (count > 0).then(|| sum / count as f64)
        }
        Family::Hog | Family::Gist | Family::Dct | Family::Wavelet | Family::Corners => {
            match cosine(vector(query, names[0])?, vector(doc, names[0])?) {
                Cosine::Value(v) => Some(v),
                Cosine::ZeroNorm | Cosine::Mismatch => None,
            }
        }
    }
}

/// Per-family contributions plus the fused total.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBreakdown {
    pub units: Vec<(Family, f64)>,
    pub total: f64,
}

/// Score with the per-family detail kept.
pub fn score_breakdown<Q, D>(query: &Q, doc: &D) -> ScoreBreakdown
where
    Q: DescriptorFields + ?Sized,
    D: DescriptorFields + ?Sized,
{
    let units: Vec<(Family, f64)> = Family::ALL
        .into_iter()
        .filter_map(|family| family_score(family, query, doc).map(|v| (family, v)))
        .collect();
    let total = if units.is_empty() {
        0.0
    } else {
        units.iter().map(|(_, v)| v).sum::<f64>() / units.len() as f64
    };
    ScoreBreakdown { units, total }
}

/// Fused similarity of `doc` to `query`; `0.0` when no unit is included.
pub fn score<Q, D>(query: &Q, doc: &D) -> f64
where
    Q: DescriptorFields + ?Sized,
    D: DescriptorFields + ?Sized,
{
    score_breakdown(query, doc).total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QueryBundle;
    use descriptor::{CanonicalImage, DescriptorConfig, Document, DocumentBuilder, FamilySet};
    use image::{Rgb, RgbImage};

    fn doc_with(id: &str, mean: [f64; 4], hist: f64, wavelet: Vec<f64>) -> Document {
        let mut doc = Document::new(id);
        for (name, v) in Family::Mean.fields().iter().zip(mean) {
            doc = doc.with_field(*name, FieldValue::Scalar(v));
        }
        for (i, name) in Family::Histogram.fields().iter().enumerate() {
            let mut h = vec![0.0; 4];
            h[i] = hist;
            h[3 - i] += 1.0;
            doc = doc.with_field(*name, FieldValue::Vector(h));
        }
        doc.with_field("wavelet", FieldValue::Vector(wavelet))
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn cosine_cases() {
        assert!(matches!(cosine(&[1.0, 0.0], &[2.0, 0.0]), Cosine::Value(v) if close(v, 1.0)));
        assert!(matches!(cosine(&[1.0, 0.0], &[0.0, 3.0]), Cosine::Value(v) if close(v, 0.0)));
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 1.0]), Cosine::ZeroNorm);
        assert_eq!(cosine(&[1.0], &[1.0, 1.0]), Cosine::Mismatch);
    }

    #[test]
    fn self_similarity_is_one() {
        let doc = doc_with("a", [10.0, 20.0, 30.0, 18.0], 0.5, vec![1.0, -2.0, 3.0]);
        let query = QueryBundle::from_document(&doc, &FamilySet::all());
        assert!(close(score(&query, &doc), 1.0));
        assert_eq!(score_breakdown(&query, &doc).units.len(), 3);
    }

    #[test]
    fn empty_query_scores_zero() {
        let doc = doc_with("a", [1.0, 1.0, 1.0, 1.0], 1.0, vec![1.0]);
        assert_eq!(score(&QueryBundle::new(), &doc), 0.0);
    }

    #[test]
    fn length_mismatch_excludes_family() {
        let doc = doc_with("a", [1.0, 2.0, 3.0, 4.0], 0.5, vec![1.0, 1.0]);
        let query = QueryBundle::new()
            .with_field("wavelet", FieldValue::Vector(vec![1.0, 1.0, 1.0]))
            .with_field("r_mean", FieldValue::Scalar(1.0))
            .with_field("g_mean", FieldValue::Scalar(2.0))
            .with_field("b_mean", FieldValue::Scalar(3.0))
            .with_field("i_mean", FieldValue::Scalar(4.0));
        let breakdown = score_breakdown(&query, &doc);
        assert_eq!(breakdown.units.len(), 1);
        assert_eq!(breakdown.units[0].0, Family::Mean);
        assert!(close(breakdown.total, 1.0));

        let only_wavelet = QueryBundle::new().with_field("wavelet", FieldValue::Vector(vec![1.0]));
        assert_eq!(score(&only_wavelet, &doc), 0.0);
    }

    #[test]
    fn missing_family_symmetry() {
        let full = doc_with("a", [5.0, 1.0, 2.0, 3.0], 0.25, vec![0.5, 0.5]);
        let other = doc_with("b", [1.0, 5.0, 2.0, 3.0], 0.75, vec![0.1, 0.9]);

        // dropping wavelet from the query ...
        let mut q_fields = QueryBundle::from_document(&full, &FamilySet::all()).into_fields();
        q_fields.remove("wavelet");
        let trimmed_query = QueryBundle::from_fields(q_fields);
        // ... equals scoring against a document without wavelet
        let full_query = QueryBundle::from_document(&full, &FamilySet::all());
        let mut trimmed_doc = other.clone();
        trimmed_doc.fields.remove("wavelet");

        assert!(close(
            score(&trimmed_query, &other),
            score(&full_query, &trimmed_doc)
        ));
    }

    #[test]
    fn zero_norm_mean_is_excluded_and_zero_histogram_channel_left_out() {
        let doc = doc_with("a", [0.0, 0.0, 0.0, 0.0], 1.0, vec![2.0]);
        let query = QueryBundle::from_document(&doc, &FamilySet::all());
        let breakdown = score_breakdown(&query, &doc);
        let families: Vec<Family> = breakdown.units.iter().map(|(f, _)| *f).collect();
        assert_eq!(families, vec![Family::Histogram, Family::Wavelet]);

        let mut zero_channel = doc.clone();
        zero_channel
            .fields
            .insert("r_hist".into(), FieldValue::Vector(vec![0.0; 4]));
        let hist = family_score(Family::Histogram, &query, &zero_channel).unwrap();
        assert!(close(hist, 1.0));

        let mut all_zero = doc.clone();
        for name in Family::Histogram.fields() {
            all_zero
                .fields
                .insert((*name).into(), FieldValue::Vector(vec![0.0; 4]));
        }
        assert_eq!(family_score(Family::Histogram, &query, &all_zero), None);
    }

    #[test]
    fn constant_image_scores_one_against_itself() {
        let cfg = DescriptorConfig::default();
        let rgb = RgbImage::from_pixel(cfg.image_width, cfg.image_height, Rgb([200, 30, 30]));
        let doc = DocumentBuilder::new(cfg)
            .build("red.png", &CanonicalImage::from_rgb(rgb), &FamilySet::all())
            .unwrap();
        assert_eq!(doc.field("contrast"), Some(&FieldValue::Vector(vec![0.0; 4])));

        let query = QueryBundle::from_document(&doc, &FamilySet::all());
        let breakdown = score_breakdown(&query, &doc);
        let texture = breakdown
            .units
            .iter()
            .find(|(family, _)| *family == Family::Texture)
            .map(|(_, v)| *v);
        assert!(matches!(texture, Some(v) if close(v, 1.0)), "{breakdown:?}");
        assert!((breakdown.total - 1.0).abs() < 1e-9, "{breakdown:?}");
    }

    #[test]
    fn scalar_stored_as_vector_does_not_count() {
        let doc = Document::new("a").with_field("wavelet", FieldValue::Scalar(1.0));
        let query = QueryBundle::new().with_field("wavelet", FieldValue::Vector(vec![1.0]));
        assert_eq!(family_score(Family::Wavelet, &query, &doc), None);
    }
}

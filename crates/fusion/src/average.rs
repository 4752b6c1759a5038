//! Exemplar averaging: a synthetic query built from several stored documents.

use descriptor::{DescriptorConfig, Document, FamilySet, FieldValue, Fields};

use crate::QueryBundle;

enum Accumulator {
    Scalar(f64),
    Vector(Vec<f64>),
}

/// Average the requested families over `docs`.
///
/// Each field is averaged over the documents that carry it with the
/// configured shape; a field carried by none of them is omitted. Callers
/// deduplicate ids before fetching.
pub fn average_documents<'a, I>(docs: I, families: &FamilySet, cfg: &DescriptorConfig) -> QueryBundle
where
    I: IntoIterator<Item = &'a Document>,
{
    let docs: Vec<&Document> = docs.into_iter().collect();
    let mut fields = Fields::new();

    for family in families.iter() {
        let shape = cfg.shape_of(family);
        for (name, len) in &shape.fields {
            let mut acc: Option<Accumulator> = None;
            let mut carriers = 0usize;
            for doc in &docs {
                match (doc.fields.get(*name), len) {
                    (Some(FieldValue::Scalar(v)), None) => {
                        match acc.get_or_insert(Accumulator::Scalar(0.0)) {
                            Accumulator::Scalar(sum) => *sum += v,
                            Accumulator::Vector(_) => continue,
                        }
                        carriers += 1;
                    }
                    (Some(FieldValue::Vector(v)), Some(len)) if v.len() == *len => {
                        match acc.get_or_insert_with(|| Accumulator::Vector(vec![0.0; *len])) {
                            Accumulator::Vector(sum) => {
                                for (s, x) in sum.iter_mut().zip(v) {
                                    *s += x;
                                }
                            }
                            Accumulator::Scalar(_) => continue,
                        }
                        carriers += 1;
                    }
                    _ => {}
                }
            }
            if carriers == 0 {
                continue;
            }
            let n = carriers as f64;
            let value = match acc {
                Some(Accumulator::Scalar(sum)) => FieldValue::Scalar(sum / n),
                Some(Accumulator::Vector(sum)) => {
                    FieldValue::Vector(sum.into_iter().map(|s| s / n).collect())
                }
                None => continue,
            };
            fields.insert((*name).to_string(), value);
        }
    }
    QueryBundle::from_fields(fields)
}

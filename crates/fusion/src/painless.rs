//! Elasticsearch `script_score` push-down of [`crate::score`].
//!
//! The script is rendered from the same family table the local function
//! reads, so both sides agree on field names, unit grouping and exclusion
//! rules. `script_score` rejects negative scores, so the script returns the
//! fused score plus [`SCORE_OFFSET`] and callers subtract it again.

use serde_json::{Map, Number, Value};

use descriptor::{DescriptorFields, Family, FieldValue};

use crate::QueryBundle;

/// Added to every pushed-down score to keep it non-negative.
pub const SCORE_OFFSET: f64 = 1.0;

const PRELUDE: &str = r#"boolean present(def doc, String f) {
  return doc.containsKey(f) && doc[f].size() != 0;
}
double cos(List q, def d) {
  if (q.size() != d.length) { return Double.NEGATIVE_INFINITY; }
  double dot = 0.0; double qn = 0.0; double dn = 0.0;
  for (int i = 0; i < d.length; ++i) {
    double a = ((Number) q.get(i)).doubleValue();
    double b = d[i];
    dot += a * b; qn += a * a; dn += b * b;
  }
  if (qn == 0.0 || dn == 0.0) { return Double.NaN; }
  return dot / (Math.sqrt(qn) * Math.sqrt(dn));
}
double total = 0.0;
int units = 0;
"#;

fn guard(names: &[&str]) -> String {
    names
        .iter()
        .map(|n| format!("params.containsKey('{n}') && present(doc, '{n}')"))
        .collect::<Vec<_>>()
        .join(" && ")
}

fn family_block(family: Family) -> String {
    let names = family.fields();
    let mut out = format!("if ({}) {{\n", guard(names));
    match family {
        Family::Mean => {
            out.push_str("  double dot = 0.0; double qn = 0.0; double dn = 0.0;\n");
            for n in names {
                out.push_str(&format!(
                    "  {{ double a = ((Number) params['{n}']).doubleValue(); double b = doc['{n}'].value; dot += a * b; qn += a * a; dn += b * b; }}\n"
                ));
            }
            out.push_str(
                "  if (qn != 0.0 && dn != 0.0) { total += dot / (Math.sqrt(qn) * Math.sqrt(dn)); units += 1; }\n",
            );
        }
        Family::Histogram | Family::Texture => {
            out.push_str("  double sum = 0.0; int count = 0; boolean ok = true;\n");
            for n in names {
                out.push_str(&format!(
                    "  {{ double c = cos(params['{n}'], doc['{n}'].vectorValue); if (c == Double.NEGATIVE_INFINITY) {{ ok = false; }} else if (!Double.isNaN(c)) {{ sum += c; count += 1; }} }}\n"
                ));
            }
            out.push_str("  if (ok && count > 0) { total += sum / count; units += 1; }\n");
        }
        Family::Hog | Family::Gist | Family::Dct | Family::Wavelet | Family::Corners => {
            let n = names[0];
            out.push_str(&format!(
                "  double c = cos(params['{n}'], doc['{n}'].vectorValue);\n"
            ));
            out.push_str(
                "  if (c != Double.NEGATIVE_INFINITY && !Double.isNaN(c)) { total += c; units += 1; }\n",
            );
        }
    }
    out.push_str("}\n");
    out
}

/// Painless source for the fused score, offset by [`SCORE_OFFSET`].
pub fn script() -> String {
    let mut out = String::from(PRELUDE);
    for family in Family::ALL {
        out.push_str(&family_block(family));
    }
    out.push_str(&format!(
        "return (units > 0 ? total / units : 0.0) + {SCORE_OFFSET:.1};"
    ));
    out
}

fn to_json(value: &FieldValue) -> Value {
    match value {
        FieldValue::Scalar(v) => Number::from_f64(*v).map(Value::Number).unwrap_or(Value::Null),
        FieldValue::Vector(v) => Value::Array(
            v.iter()
                .map(|x| Number::from_f64(*x).map(Value::Number).unwrap_or(Value::Null))
                .collect(),
        ),
    }
}

/// Script parameters: every field of every family fully present in `query`.
pub fn params(query: &QueryBundle) -> Map<String, Value> {
    let mut map = Map::new();
    for family in query.families().iter() {
        for name in family.fields() {
            if let Some(value) = query.field(name) {
                map.insert((*name).to_string(), to_json(value));
            }
        }
    }
    map
}

use glow_entities::StateValue;
use serde_json::Value;

use crate::error::BridgeError;

/// How a measurement's value is read out of a decoded payload.
///
/// Derivations only read the payload, so any number of them can be applied
/// to the same decoded message in any order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Derivation {
    /// Value found by walking a fixed sequence of object keys.
    Field(&'static [&'static str]),
    /// Today's cost for one meter: `standingcharge + day * unitrate`,
    /// rounded to two decimal places.
    ///
    /// With `nulls_as_zero`, a `null` operand counts as 0 instead of making
    /// the measurement inapplicable.
    DailyCost {
        meter: &'static str,
        nulls_as_zero: bool,
    },
}

impl Derivation {
    /// Derive the value for `payload`.
    ///
    /// `Ok(None)` means the field is present but `null`, which the host sees
    /// as "unknown". `Err(FieldMissing)` means the payload does not carry
    /// this measurement at all.
    pub fn derive(&self, payload: &Value) -> Result<Option<StateValue>, BridgeError> {
        match self {
            Self::Field(path) => {
                let v = lookup(payload, path)?;
                match v {
                    Value::Null => Ok(None),
                    Value::Number(n) => n
                        .as_f64()
                        .map(|f| Some(StateValue::Number(f)))
                        .ok_or_else(|| missing(path)),
                    Value::String(s) => Ok(Some(StateValue::Text(s.clone()))),
                    Value::Bool(b) => Ok(Some(StateValue::Text(b.to_string()))),
                    Value::Array(_) | Value::Object(_) => Err(missing(path)),
                }
            }
            Self::DailyCost {
                meter,
                nulls_as_zero,
            } => {
                let operand = |path: &[&str]| -> Result<f64, BridgeError> {
                    let full: Vec<&str> = [*meter, "energy", "import"]
                        .iter()
                        .chain(path.iter())
                        .copied()
                        .collect();
                    match lookup(payload, &full)? {
                        Value::Null if *nulls_as_zero => Ok(0.0),
                        Value::Number(n) => n.as_f64().ok_or_else(|| missing(&full)),
                        _ => Err(missing(&full)),
                    }
                };

                let standing = operand(&["price", "standingcharge"])?;
                let day = operand(&["day"])?;
                let rate = operand(&["price", "unitrate"])?;

                Ok(Some(StateValue::Number(round2(standing + day * rate))))
            }
        }
    }
}

fn lookup<'a>(payload: &'a Value, path: &[&str]) -> Result<&'a Value, BridgeError> {
    let mut cur = payload;
    for key in path {
        cur = cur.get(key).ok_or_else(|| missing(path))?;
    }
    Ok(cur)
}

fn missing(path: &[&str]) -> BridgeError {
    BridgeError::FieldMissing(path.join("."))
}

/// Two decimal places, exact halves to even.
fn round2(v: f64) -> f64 {
    (v * 100.0).round_ties_even() / 100.0
}

// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Response value type
//!
//! A [`ResponseValue`] is any value a question can suggest or an answer can
//! carry: scalars on the wire stay untagged (plain JSON booleans, numbers,
//! strings) and arrays map to [`ResponseValue::List`]. Values are hashable
//! by content so response-option lists can be deduplicated during export.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A suggested-response or collected-answer value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResponseValue {
    /// Boolean value
    Bool(bool),

    /// Integer value (64-bit signed)
    Integer(i64),

    /// Decimal value with exact precision
    Decimal(Decimal),

    /// Text value
    Text(String),

    /// Collection of values (a multi-select answer)
    List(Vec<ResponseValue>),
}

impl ResponseValue {
    /// Borrow the text content, if this is a text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of the value for ordered comparisons
    ///
    /// Integers widen, decimals pass through, and text is parsed; a value
    /// with no numeric reading returns `None`.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            ResponseValue::Integer(i) => Some(Decimal::from(*i)),
            ResponseValue::Decimal(d) => Some(*d),
            ResponseValue::Text(s) => Decimal::from_str(s.trim()).ok(),
            ResponseValue::Bool(_) | ResponseValue::List(_) => None,
        }
    }

    /// Whether the value counts as an answer being present
    ///
    /// Empty text and empty lists are absent; everything else, including
    /// `false` and `0`, is a deliberate answer.
    pub fn is_present(&self) -> bool {
        match self {
            ResponseValue::Text(s) => !s.is_empty(),
            ResponseValue::List(items) => items.iter().any(ResponseValue::is_present),
            _ => true,
        }
    }

    /// Flatten into scalar elements
    ///
    /// Scalars yield themselves; a list yields its elements. Conditions
    /// compare element-wise regardless of whether the stored answer was a
    /// scalar or a multi-select list.
    pub fn elements(&self) -> Vec<&ResponseValue> {
        match self {
            ResponseValue::List(items) => items.iter().collect(),
            other => vec![other],
        }
    }
}

impl fmt::Display for ResponseValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseValue::Bool(b) => write!(f, "{b}"),
            ResponseValue::Integer(i) => write!(f, "{i}"),
            ResponseValue::Decimal(d) => write!(f, "{d}"),
            ResponseValue::Text(s) => f.write_str(s),
            ResponseValue::List(items) => {
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<bool> for ResponseValue {
    fn from(value: bool) -> Self {
        ResponseValue::Bool(value)
    }
}

impl From<i64> for ResponseValue {
    fn from(value: i64) -> Self {
        ResponseValue::Integer(value)
    }
}

impl From<Decimal> for ResponseValue {
    fn from(value: Decimal) -> Self {
        ResponseValue::Decimal(value)
    }
}

impl From<&str> for ResponseValue {
    fn from(value: &str) -> Self {
        ResponseValue::Text(value.to_string())
    }
}

impl From<String> for ResponseValue {
    fn from(value: String) -> Self {
        ResponseValue::Text(value)
    }
}

impl<T: Into<ResponseValue>> From<Vec<T>> for ResponseValue {
    fn from(values: Vec<T>) -> Self {
        ResponseValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl Serialize for ResponseValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            ResponseValue::Bool(b) => serializer.serialize_bool(*b),
            ResponseValue::Integer(i) => serializer.serialize_i64(*i),
            ResponseValue::Decimal(d) => match d.to_f64() {
                Some(f) => serializer.serialize_f64(f),
                // Out of f64 range; the textual form is still exact
                None => serializer.serialize_str(&d.to_string()),
            },
            ResponseValue::Text(s) => serializer.serialize_str(s),
            ResponseValue::List(items) => items.serialize(serializer),
        }
    }
}

/// Custom deserialization so scalars stay untagged on the wire
impl<'de> Deserialize<'de> for ResponseValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ResponseValueVisitor;

        impl<'de> Visitor<'de> for ResponseValueVisitor {
            type Value = ResponseValue;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a boolean, number, string, or array of response values")
            }

            fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(ResponseValue::Bool(value))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(ResponseValue::Integer(value))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                i64::try_from(value)
                    .map(ResponseValue::Integer)
                    .map_err(|_| E::custom(format!("integer {value} out of range")))
            }

            fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                match Decimal::try_from(value) {
                    Ok(d) => Ok(ResponseValue::Decimal(d)),
                    Err(_) => Ok(ResponseValue::Text(value.to_string())),
                }
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(ResponseValue::Text(value.to_string()))
            }

            fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(ResponseValue::Text(value))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut items = Vec::new();
                while let Some(item) = seq.next_element()? {
                    items.push(item);
                }
                Ok(ResponseValue::List(items))
            }
        }

        deserializer.deserialize_any(ResponseValueVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_untagged_wire_round_trip() {
        let values: Vec<ResponseValue> = serde_json::from_str(r#"["Yes", 10, 2.5, true]"#).unwrap();
        assert_eq!(
            values,
            vec![
                ResponseValue::from("Yes"),
                ResponseValue::Integer(10),
                ResponseValue::Decimal(Decimal::from_str("2.5").unwrap()),
                ResponseValue::Bool(true),
            ]
        );

        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"["Yes",10,2.5,true]"#);
    }

    #[test]
    fn test_as_decimal() {
        assert_eq!(
            ResponseValue::from("15").as_decimal(),
            Some(Decimal::from(15))
        );
        assert_eq!(
            ResponseValue::Integer(10).as_decimal(),
            Some(Decimal::from(10))
        );
        assert_eq!(ResponseValue::from("abc").as_decimal(), None);
        assert_eq!(ResponseValue::Bool(true).as_decimal(), None);
    }

    #[test]
    fn test_presence() {
        assert!(ResponseValue::from("Yes").is_present());
        assert!(ResponseValue::Bool(false).is_present());
        assert!(ResponseValue::Integer(0).is_present());
        assert!(!ResponseValue::from("").is_present());
        assert!(!ResponseValue::List(vec![]).is_present());
        assert!(!ResponseValue::List(vec![ResponseValue::from("")]).is_present());
    }

    #[test]
    fn test_elements_flattening() {
        let list = ResponseValue::from(vec!["a", "b"]);
        assert_eq!(list.elements().len(), 2);

        let scalar = ResponseValue::from("a");
        assert_eq!(scalar.elements(), vec![&ResponseValue::from("a")]);
    }
}

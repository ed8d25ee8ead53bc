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

//! Response matcher
//!
//! Implements the comparison semantics for one case. Answers are compared
//! element-wise: a multi-select answer stored as a list is flattened, so
//! every match type sees a uniform collection of scalar elements.
//!
//! An absent answer (no elements at all) is no-match for every match type
//! except `none`, which is exactly the "no answer present" test.

use octofhir_collect_core::{MatchType, ResponseValue};

/// Equality with a numeric bridge
///
/// `Integer(10)`, `Decimal(10.0)`, and `Text("10")` all answer the same
/// question; stored answers and schema values do not always agree on the
/// representation, so equal numeric readings count as equal.
fn values_equal(a: &ResponseValue, b: &ResponseValue) -> bool {
    if a == b {
        return true;
    }
    match (a.as_decimal(), b.as_decimal()) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}

fn in_values(element: &ResponseValue, values: &[ResponseValue]) -> bool {
    values.iter().any(|value| values_equal(element, value))
}

/// Evaluate one case against the current answer elements
///
/// * `actual` - the values collected for the case's source, as stored
/// * `expected` - the case's comparison values
/// * `suggested` - the source instrument's suggested response values,
///   consulted only by the suggested/custom match types
pub fn test_case(
    actual: &[ResponseValue],
    match_type: MatchType,
    expected: &[ResponseValue],
    suggested: &[ResponseValue],
) -> bool {
    let elements: Vec<&ResponseValue> = actual
        .iter()
        .flat_map(ResponseValue::elements)
        .collect();

    if elements.is_empty() {
        return match_type == MatchType::None;
    }

    match match_type {
        MatchType::Match | MatchType::One => {
            elements.iter().any(|element| in_values(element, expected))
        }
        MatchType::Mismatch | MatchType::Zero => {
            !elements.iter().any(|element| in_values(element, expected))
        }
        MatchType::Any => elements.iter().any(|element| element.is_present()),
        MatchType::None => !elements.iter().any(|element| element.is_present()),
        MatchType::AllSuggested => elements
            .iter()
            .all(|element| in_values(element, suggested)),
        MatchType::OneSuggested => elements
            .iter()
            .any(|element| in_values(element, suggested)),
        MatchType::AllCustom => !elements
            .iter()
            .any(|element| in_values(element, suggested)),
        MatchType::OneCustom => elements
            .iter()
            .any(|element| !in_values(element, suggested)),
        MatchType::GreaterThan | MatchType::LessThan => {
            let Some(bound) = expected.first().and_then(ResponseValue::as_decimal) else {
                return false;
            };
            elements.iter().any(|element| {
                element.as_decimal().is_some_and(|value| {
                    if match_type == MatchType::GreaterThan {
                        value > bound
                    } else {
                        value < bound
                    }
                })
            })
        }
        MatchType::Contains | MatchType::NotContains => {
            let Some(needle) = expected.first().map(ResponseValue::to_string) else {
                return false;
            };
            if match_type == MatchType::Contains {
                elements
                    .iter()
                    .any(|element| element.to_string().contains(&needle))
            } else {
                elements
                    .iter()
                    .any(|element| !element.to_string().contains(&needle))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn text(values: &[&str]) -> Vec<ResponseValue> {
        values.iter().map(|v| ResponseValue::from(*v)).collect()
    }

    #[rstest]
    #[case("Yes", MatchType::Match, "Yes", true)]
    #[case("No", MatchType::Match, "Yes", false)]
    #[case("No", MatchType::Mismatch, "Yes", true)]
    #[case("15", MatchType::GreaterThan, "10", true)]
    #[case("5", MatchType::GreaterThan, "10", false)]
    #[case("abc", MatchType::GreaterThan, "10", false)]
    #[case("5", MatchType::LessThan, "10", true)]
    #[case("solar-panel", MatchType::Contains, "sol", true)]
    #[case("wind", MatchType::Contains, "sol", false)]
    #[case("wind", MatchType::NotContains, "sol", true)]
    fn truth_table(
        #[case] actual: &str,
        #[case] match_type: MatchType,
        #[case] value: &str,
        #[case] outcome: bool,
    ) {
        let actual = text(&[actual]);
        let expected = text(&[value]);
        assert_eq!(test_case(&actual, match_type, &expected, &[]), outcome);
    }

    #[test]
    fn test_match() {
        let expected = text(&["Yes"]);
        assert!(test_case(&text(&["Yes"]), MatchType::Match, &expected, &[]));
        assert!(!test_case(&text(&["No"]), MatchType::Match, &expected, &[]));
        assert!(!test_case(&[], MatchType::Match, &expected, &[]));
    }

    #[test]
    fn test_mismatch() {
        let expected = text(&["Yes"]);
        assert!(test_case(&text(&["No"]), MatchType::Mismatch, &expected, &[]));
        assert!(!test_case(&text(&["Yes"]), MatchType::Mismatch, &expected, &[]));
        // Absent answer is no-match even for the negated test
        assert!(!test_case(&[], MatchType::Mismatch, &expected, &[]));
    }

    #[test]
    fn test_collection_membership() {
        let expected = text(&["A", "B"]);
        let answer = vec![ResponseValue::from(vec!["B", "C"])];
        assert!(test_case(&answer, MatchType::One, &expected, &[]));
        assert!(!test_case(&answer, MatchType::Zero, &expected, &[]));

        let outside = vec![ResponseValue::from(vec!["C", "D"])];
        assert!(!test_case(&outside, MatchType::One, &expected, &[]));
        assert!(test_case(&outside, MatchType::Zero, &expected, &[]));
    }

    #[test]
    fn test_any_and_none() {
        assert!(test_case(&text(&["anything"]), MatchType::Any, &[], &[]));
        assert!(!test_case(&[], MatchType::Any, &[], &[]));
        // An empty string is not a present answer
        assert!(!test_case(&text(&[""]), MatchType::Any, &[], &[]));

        assert!(test_case(&[], MatchType::None, &[], &[]));
        assert!(test_case(&text(&[""]), MatchType::None, &[], &[]));
        assert!(!test_case(&text(&["x"]), MatchType::None, &[], &[]));
    }

    #[test]
    fn test_suggested_and_custom() {
        let suggested = text(&["Yes", "No"]);

        assert!(test_case(
            &text(&["Yes", "No"]),
            MatchType::AllSuggested,
            &[],
            &suggested
        ));
        assert!(!test_case(
            &text(&["Yes", "Other"]),
            MatchType::AllSuggested,
            &[],
            &suggested
        ));
        assert!(test_case(
            &text(&["Yes", "Other"]),
            MatchType::OneSuggested,
            &[],
            &suggested
        ));
        assert!(test_case(
            &text(&["Other", "Weird"]),
            MatchType::AllCustom,
            &[],
            &suggested
        ));
        assert!(!test_case(
            &text(&["Other", "Yes"]),
            MatchType::AllCustom,
            &[],
            &suggested
        ));
        assert!(test_case(
            &text(&["Other", "Yes"]),
            MatchType::OneCustom,
            &[],
            &suggested
        ));
        assert!(!test_case(
            &text(&["Yes"]),
            MatchType::OneCustom,
            &[],
            &suggested
        ));
    }

    #[test]
    fn test_numeric_comparisons() {
        let ten = vec![ResponseValue::Integer(10)];
        assert!(test_case(&text(&["15"]), MatchType::GreaterThan, &ten, &[]));
        assert!(!test_case(&text(&["5"]), MatchType::GreaterThan, &ten, &[]));
        assert!(test_case(&text(&["5"]), MatchType::LessThan, &ten, &[]));
        // Parse failure is no-match, not an error
        assert!(!test_case(&text(&["abc"]), MatchType::GreaterThan, &ten, &[]));
        assert!(!test_case(&text(&["abc"]), MatchType::LessThan, &ten, &[]));
    }

    #[test]
    fn test_substring() {
        let sol = text(&["sol"]);
        assert!(test_case(
            &text(&["solar-panel"]),
            MatchType::Contains,
            &sol,
            &[]
        ));
        assert!(!test_case(&text(&["wind"]), MatchType::Contains, &sol, &[]));
        // Case-sensitive
        assert!(!test_case(&text(&["SOLAR"]), MatchType::Contains, &sol, &[]));

        assert!(test_case(&text(&["wind"]), MatchType::NotContains, &sol, &[]));
        assert!(!test_case(
            &text(&["solar-panel"]),
            MatchType::NotContains,
            &sol,
            &[]
        ));
    }

    #[test]
    fn test_numeric_equality_bridge() {
        let expected = vec![ResponseValue::Integer(10)];
        assert!(test_case(&text(&["10"]), MatchType::Match, &expected, &[]));
        assert!(!test_case(&text(&["11"]), MatchType::Match, &expected, &[]));
    }
}

//! Condition and update expressions evaluated against a stored item.

use serde_json::Value;

use super::{Attributes, StoreError};

/// Predicate over the current state of an item. A write carrying a
/// condition only commits when the predicate holds.
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    /// The item exists.
    Exists,
    /// The item does not exist.
    NotExists,
    /// The attribute is present and equal to `value`.
    Equals { attr: String, value: Value },
    /// The attribute is an integer greater than or equal to `value`.
    AtLeast { attr: String, value: i64 },
    /// Every nested condition holds.
    And(Vec<Condition>),
}

impl Condition {
    pub fn equals(attr: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equals { attr: attr.into(), value: value.into() }
    }

    pub fn at_least(attr: impl Into<String>, value: i64) -> Self {
        Self::AtLeast { attr: attr.into(), value }
    }

    /// Evaluates the condition against the stored attributes, `None` meaning absent.
    pub fn evaluate(&self, current: Option<&Attributes>) -> bool {
        match self {
            Self::Exists => current.is_some(),
            Self::NotExists => current.is_none(),
            Self::Equals { attr, value } => current
                .and_then(|a| a.get(attr))
                .is_some_and(|v| v == value),
            Self::AtLeast { attr, value } => current
                .and_then(|a| a.get(attr))
                .and_then(Value::as_i64)
                .is_some_and(|v| v >= *value),
            Self::And(conditions) => conditions.iter().all(|c| c.evaluate(current)),
        }
    }
}

/// A single mutation inside an update expression.
#[derive(Clone, Debug, PartialEq)]
pub enum UpdateAction {
    /// Overwrite the attribute.
    Set { attr: String, value: Value },
    /// Add a signed delta to an integer attribute; a missing attribute counts as 0.
    Add { attr: String, delta: i64 },
}

impl UpdateAction {
    pub fn set(attr: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Set { attr: attr.into(), value: value.into() }
    }

    pub fn add(attr: impl Into<String>, delta: i64) -> Self {
        Self::Add { attr: attr.into(), delta }
    }
}

/// Applies the update actions in order. Fails without partial effects when
/// an `Add` targets a non-integer attribute.
pub fn apply_updates(attrs: &Attributes, actions: &[UpdateAction]) -> Result<Attributes, StoreError> {
    let mut next = attrs.clone();
    for action in actions {
        match action {
            UpdateAction::Set { attr, value } => {
                next.insert(attr.clone(), value.clone());
            }
            UpdateAction::Add { attr, delta } => {
                let current = match next.get(attr) {
                    None => 0,
                    Some(v) => v
                        .as_i64()
                        .ok_or_else(|| StoreError::Malformed(format!("attribute {attr} is not an integer")))?,
                };
                let sum = current
                    .checked_add(*delta)
                    .ok_or_else(|| StoreError::Malformed(format!("attribute {attr} overflowed")))?;
                next.insert(attr.clone(), Value::from(sum));
            }
        }
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: Value) -> Attributes {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_existence_conditions() {
        let item = attrs(json!({"stock": 3}));
        assert!(Condition::Exists.evaluate(Some(&item)));
        assert!(!Condition::Exists.evaluate(None));
        assert!(Condition::NotExists.evaluate(None));
        assert!(!Condition::NotExists.evaluate(Some(&item)));
    }

    #[test]
    fn test_equals_and_at_least() {
        let item = attrs(json!({"version": 2, "stock": 5}));
        assert!(Condition::equals("version", 2u64).evaluate(Some(&item)));
        assert!(!Condition::equals("version", 1u64).evaluate(Some(&item)));
        assert!(!Condition::equals("version", 2u64).evaluate(None));
        assert!(Condition::at_least("stock", 5).evaluate(Some(&item)));
        assert!(!Condition::at_least("stock", 6).evaluate(Some(&item)));
        assert!(!Condition::at_least("missing", 0).evaluate(Some(&item)));
        let both = Condition::And(vec![Condition::Exists, Condition::at_least("stock", 1)]);
        assert!(both.evaluate(Some(&item)));
    }

    #[test]
    fn test_apply_updates() {
        let item = attrs(json!({"quantity": 1, "version": 4}));
        let next = apply_updates(
            &item,
            &[UpdateAction::set("quantity", 7), UpdateAction::add("version", 1), UpdateAction::add("fresh", -2)],
        )
        .unwrap();
        assert_eq!(next["quantity"], json!(7));
        assert_eq!(next["version"], json!(5));
        assert_eq!(next["fresh"], json!(-2));
        // source untouched
        assert_eq!(item["version"], json!(4));
    }

    #[test]
    fn test_add_rejects_non_integer() {
        let item = attrs(json!({"name": "widget"}));
        let err = apply_updates(&item, &[UpdateAction::add("name", 1)]).unwrap_err();
        assert!(matches!(err, StoreError::Malformed(_)));
    }
}

//! Decides whether a predicate can be answered by a direct name lookup.
//!
//! Only the top-level node is inspected. The shortcut applies to exactly one shape:
//! `name == "literal"`, where the right-hand side is either an inline string literal or a
//! captured member that resolves to one. Everything else (conjunctions, negations, other
//! fields or operators, non-string values) needs a full scan.

use super::ast::{CompareOp, Field, Operand, Predicate, Value};
use crate::{RepositoryError, RepositoryResult};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameShortcut {
    is_equality: bool,
    left_is_name: bool,
    literal: Option<String>,
}

impl NameShortcut {
    /// Analyzes the top-level node of `predicate`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidArgument` if the predicate has no terms.
    pub fn analyze(predicate: &Predicate) -> RepositoryResult<Self> {
        if !predicate.has_terms() {
            return Err(RepositoryError::InvalidArgument(
                "predicate has no terms".into(),
            ));
        }

        let Predicate::Compare { op, left, right } = predicate else {
            return Ok(Self::default());
        };

        let literal = match right {
            Operand::Literal(value) => value.as_str().map(str::to_owned),
            Operand::Captured(captured) => captured
                .resolve()
                .and_then(Value::as_str)
                .map(str::to_owned),
            Operand::Field(_) => None,
        };

        Ok(Self {
            is_equality: *op == CompareOp::Eq,
            left_is_name: matches!(left, Operand::Field(Field::Name)),
            literal,
        })
    }

    pub fn can_answer_by_name(&self) -> bool {
        self.is_equality && self.left_is_name && self.literal.is_some()
    }

    /// The name to look up, when the shortcut applies.
    pub fn literal(&self) -> Option<&str> {
        if self.can_answer_by_name() {
            self.literal.as_deref()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::ast::{CapturedRef, CapturedScope};
    use std::sync::Arc;

    #[test]
    fn test_inline_name_equality() {
        let shortcut = NameShortcut::analyze(&Predicate::name_eq("report.pdf")).unwrap();
        assert!(shortcut.can_answer_by_name());
        assert_eq!(shortcut.literal(), Some("report.pdf"));
    }

    #[test]
    fn test_captured_name_equality() {
        let request = CapturedScope::new().with_value("file", "a.txt");
        let scope = Arc::new(CapturedScope::new().with_scope("request", request));
        let predicate = Predicate::name_eq_captured(CapturedRef::new(scope, ["request", "file"]));

        let shortcut = NameShortcut::analyze(&predicate).unwrap();
        assert_eq!(shortcut.literal(), Some("a.txt"));
    }

    #[test]
    fn test_unresolvable_capture_falls_back() {
        let scope = Arc::new(CapturedScope::new());
        let predicate = Predicate::name_eq_captured(CapturedRef::new(scope, ["nope"]));

        let shortcut = NameShortcut::analyze(&predicate).unwrap();
        assert!(!shortcut.can_answer_by_name());
    }

    #[test]
    fn test_other_shapes_fall_back() {
        let fallbacks = [
            Predicate::Always,
            Predicate::name_eq("a").and(Predicate::name_eq("a")),
            Predicate::name_eq("a").negate(),
            Predicate::compare(CompareOp::Ne, Field::Name, "a"),
            Predicate::compare(CompareOp::StartsWith, Field::Name, "a"),
            Predicate::field_eq(Field::ContentType, "image/png"),
            Predicate::field_eq(Field::Name, 42i64),
            Predicate::Compare {
                op: CompareOp::Eq,
                left: Operand::Literal(Value::from("a")),
                right: Operand::Field(Field::Name),
            },
        ];

        for predicate in fallbacks {
            let shortcut = NameShortcut::analyze(&predicate).unwrap();
            assert!(!shortcut.can_answer_by_name(), "{predicate:?}");
            assert_eq!(shortcut.literal(), None);
        }
    }

    #[test]
    fn test_termless_predicate_is_rejected() {
        assert!(matches!(
            NameShortcut::analyze(&Predicate::And(vec![])),
            Err(RepositoryError::InvalidArgument(_))
        ));
        assert!(matches!(
            NameShortcut::analyze(&Predicate::Or(vec![]).negate()),
            Err(RepositoryError::InvalidArgument(_))
        ));
    }
}

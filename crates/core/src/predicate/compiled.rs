//! Predicate compilation and evaluation.
//!
//! Compiling resolves every captured operand to a literal once, so evaluation against each
//! scanned entity is synchronous and cannot fail.

use super::ast::{CompareOp, Field, Operand, Predicate, Value};
use crate::entity::FileEntity;
use crate::{RepositoryError, RepositoryResult};

#[derive(Debug, Clone, PartialEq)]
enum Term {
    Field(Field),
    Literal(Value),
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Always,
    Compare { op: CompareOp, left: Term, right: Term },
    And(Vec<Node>),
    Or(Vec<Node>),
    Not(Box<Node>),
}

/// A predicate ready to evaluate against entities.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPredicate {
    root: Node,
}

impl CompiledPredicate {
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidArgument` if the predicate has no terms or a captured
    /// operand cannot be resolved.
    pub fn compile(predicate: &Predicate) -> RepositoryResult<Self> {
        if !predicate.has_terms() {
            return Err(RepositoryError::InvalidArgument(
                "predicate has no terms".into(),
            ));
        }
        Ok(Self {
            root: compile_node(predicate)?,
        })
    }

    /// Matches every entity.
    pub fn always() -> Self {
        Self { root: Node::Always }
    }

    pub fn matches(&self, entity: &FileEntity) -> bool {
        eval(&self.root, entity)
    }
}

fn compile_node(predicate: &Predicate) -> RepositoryResult<Node> {
    Ok(match predicate {
        Predicate::Always => Node::Always,
        Predicate::Compare { op, left, right } => Node::Compare {
            op: *op,
            left: compile_operand(left)?,
            right: compile_operand(right)?,
        },
        Predicate::And(parts) => Node::And(
            parts
                .iter()
                .map(compile_node)
                .collect::<RepositoryResult<_>>()?,
        ),
        Predicate::Or(parts) => Node::Or(
            parts
                .iter()
                .map(compile_node)
                .collect::<RepositoryResult<_>>()?,
        ),
        Predicate::Not(inner) => Node::Not(Box::new(compile_node(inner)?)),
    })
}

fn compile_operand(operand: &Operand) -> RepositoryResult<Term> {
    match operand {
        Operand::Field(field) => Ok(Term::Field(*field)),
        Operand::Literal(value) => Ok(Term::Literal(value.clone())),
        Operand::Captured(captured) => captured
            .resolve()
            .cloned()
            .map(Term::Literal)
            .ok_or_else(|| {
                RepositoryError::InvalidArgument(format!(
                    "captured member {} cannot be resolved",
                    captured.path().join(".")
                ))
            }),
    }
}

fn eval(node: &Node, entity: &FileEntity) -> bool {
    match node {
        Node::Always => true,
        Node::Compare { op, left, right } => {
            compare(*op, &term_value(left, entity), &term_value(right, entity))
        }
        Node::And(parts) => parts.iter().all(|p| eval(p, entity)),
        Node::Or(parts) => parts.iter().any(|p| eval(p, entity)),
        Node::Not(inner) => !eval(inner, entity),
    }
}

fn term_value(term: &Term, entity: &FileEntity) -> Value {
    match term {
        Term::Literal(value) => value.clone(),
        Term::Field(field) => field_value(*field, entity),
    }
}

fn field_value(field: Field, entity: &FileEntity) -> Value {
    match field {
        Field::Name => Value::Str(entity.name().to_owned()),
        Field::Path => entity
            .path()
            .map(|p| Value::Str(p.display().to_string()))
            .unwrap_or(Value::Null),
        Field::ContentType => Value::Str(entity.content_type().to_owned()),
        Field::Encoding => Value::Str(entity.encoding().as_str().to_owned()),
        Field::Size => entity
            .size()
            .and_then(|len| i64::try_from(len).ok())
            .map(Value::Int)
            .unwrap_or(Value::Null),
        Field::HasData => Value::Bool(entity.has_data()),
    }
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> bool {
    match op {
        CompareOp::Eq => left == right,
        CompareOp::Ne => left != right,
        CompareOp::StartsWith | CompareOp::EndsWith | CompareOp::Contains => {
            let (Value::Str(haystack), Value::Str(needle)) = (left, right) else {
                return false;
            };
            match op {
                CompareOp::StartsWith => haystack.starts_with(needle.as_str()),
                CompareOp::EndsWith => haystack.ends_with(needle.as_str()),
                _ => haystack.contains(needle.as_str()),
            }
        }
    }
}

//! Predicate AST nodes.

use std::collections::BTreeMap;
use std::sync::Arc;

/// Entity field a predicate can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    /// Containing directory.
    Path,
    ContentType,
    Encoding,
    /// File length in bytes.
    Size,
    HasData,
}

/// A literal value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Str(String),
    Int(i64),
    Bool(bool),
    Null,
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    StartsWith,
    EndsWith,
    Contains,
}

/// A member of a captured scope.
#[derive(Debug, Clone, PartialEq)]
pub enum Captured {
    Value(Value),
    Scope(Arc<CapturedScope>),
}

/// Named values captured from the caller's environment.
///
/// Scopes nest, so a captured operand can point at `filter.target.name` the way a closure
/// would reach through a captured object graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapturedScope {
    members: BTreeMap<String, Captured>,
}

impl CapturedScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, member: impl Into<String>, value: impl Into<Value>) -> Self {
        self.members
            .insert(member.into(), Captured::Value(value.into()));
        self
    }

    pub fn with_scope(mut self, member: impl Into<String>, scope: CapturedScope) -> Self {
        self.members
            .insert(member.into(), Captured::Scope(Arc::new(scope)));
        self
    }

    pub fn get(&self, member: &str) -> Option<&Captured> {
        self.members.get(member)
    }
}

/// Reference to a value inside a [`CapturedScope`], addressed member by member.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedRef {
    scope: Arc<CapturedScope>,
    path: Vec<String>,
}

impl CapturedRef {
    pub fn new<I, S>(scope: Arc<CapturedScope>, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            scope,
            path: path.into_iter().map(Into::into).collect(),
        }
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Walks the captured object graph. `None` if any member is missing, if the path ends on a
    /// scope, or if it tries to step through a value.
    pub fn resolve(&self) -> Option<&Value> {
        let (last, parents) = self.path.split_last()?;
        let mut scope: &CapturedScope = &self.scope;
        for member in parents {
            match scope.get(member)? {
                Captured::Scope(inner) => scope = inner,
                Captured::Value(_) => return None,
            }
        }
        match scope.get(last)? {
            Captured::Value(value) => Some(value),
            Captured::Scope(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Field(Field),
    Literal(Value),
    Captured(CapturedRef),
}

/// Boolean predicate over a file entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every entity.
    Always,
    Compare {
        op: CompareOp,
        left: Operand,
        right: Operand,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn compare(op: CompareOp, field: Field, value: impl Into<Value>) -> Self {
        Predicate::Compare {
            op,
            left: Operand::Field(field),
            right: Operand::Literal(value.into()),
        }
    }

    pub fn field_eq(field: Field, value: impl Into<Value>) -> Self {
        Self::compare(CompareOp::Eq, field, value)
    }

    /// `name == value`, the form the repository can answer without scanning.
    pub fn name_eq(value: impl Into<String>) -> Self {
        Self::field_eq(Field::Name, value.into())
    }

    /// `name == <captured member>`.
    pub fn name_eq_captured(captured: CapturedRef) -> Self {
        Predicate::Compare {
            op: CompareOp::Eq,
            left: Operand::Field(Field::Name),
            right: Operand::Captured(captured),
        }
    }

    /// Conjunction, flattening nested `And` nodes.
    pub fn and(self, other: Predicate) -> Self {
        let mut parts = Vec::new();
        for p in [self, other] {
            match p {
                Predicate::And(nested) => parts.extend(nested),
                other => parts.push(other),
            }
        }
        Predicate::And(parts)
    }

    /// Disjunction, flattening nested `Or` nodes.
    pub fn or(self, other: Predicate) -> Self {
        let mut parts = Vec::new();
        for p in [self, other] {
            match p {
                Predicate::Or(nested) => parts.extend(nested),
                other => parts.push(other),
            }
        }
        Predicate::Or(parts)
    }

    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    /// Checks if the predicate contains at least one concrete term.
    pub fn has_terms(&self) -> bool {
        match self {
            Predicate::Always | Predicate::Compare { .. } => true,
            Predicate::Not(inner) => inner.has_terms(),
            Predicate::And(parts) | Predicate::Or(parts) => parts.iter().any(Predicate::has_terms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captured_ref_walks_nested_scopes() {
        let scope = Arc::new(
            CapturedScope::new()
                .with_value("limit", 10i64)
                .with_scope("filter", CapturedScope::new().with_value("name", "a.txt")),
        );

        let name = CapturedRef::new(scope.clone(), ["filter", "name"]);
        assert_eq!(name.resolve(), Some(&Value::Str("a.txt".into())));

        assert_eq!(CapturedRef::new(scope.clone(), ["filter"]).resolve(), None);
        assert_eq!(CapturedRef::new(scope.clone(), ["limit", "x"]).resolve(), None);
        assert_eq!(CapturedRef::new(scope.clone(), ["missing"]).resolve(), None);
        assert_eq!(CapturedRef::new(scope, Vec::<String>::new()).resolve(), None);
    }

    #[test]
    fn test_and_or_flatten() {
        let p = Predicate::name_eq("a")
            .and(Predicate::name_eq("b"))
            .and(Predicate::name_eq("c"));
        assert!(matches!(&p, Predicate::And(parts) if parts.len() == 3));

        let p = Predicate::name_eq("a").or(Predicate::name_eq("b").or(Predicate::Always));
        assert!(matches!(&p, Predicate::Or(parts) if parts.len() == 3));
    }

    #[test]
    fn test_has_terms() {
        assert!(Predicate::Always.has_terms());
        assert!(Predicate::name_eq("a").negate().has_terms());
        assert!(!Predicate::And(vec![]).has_terms());
        assert!(!Predicate::Or(vec![Predicate::And(vec![])]).has_terms());
        assert!(!Predicate::And(vec![]).negate().has_terms());
    }
}

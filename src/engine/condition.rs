//! Attribute value filters
//!
//! A query condition is a tree of comparisons joined by AND/OR. Null cells
//! never satisfy a comparison; use `is_null` to select them.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::errors::{EngineError, EngineResult};
use super::scalar::Scalar;
use super::schema::ArraySchema;

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl ConditionOp {
    fn holds(&self, ordering: Ordering) -> bool {
        match self {
            ConditionOp::Lt => ordering == Ordering::Less,
            ConditionOp::Le => ordering != Ordering::Greater,
            ConditionOp::Gt => ordering == Ordering::Greater,
            ConditionOp::Ge => ordering != Ordering::Less,
            ConditionOp::Eq => ordering == Ordering::Equal,
            ConditionOp::Ne => ordering != Ordering::Equal,
        }
    }
}

/// Value filter over attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryCondition {
    Compare {
        field: String,
        op: ConditionOp,
        value: Scalar,
    },
    IsNull {
        field: String,
    },
    And(Box<QueryCondition>, Box<QueryCondition>),
    Or(Box<QueryCondition>, Box<QueryCondition>),
}

impl QueryCondition {
    pub fn new(field: impl Into<String>, op: ConditionOp, value: impl Into<Scalar>) -> Self {
        QueryCondition::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        QueryCondition::IsNull {
            field: field.into(),
        }
    }

    pub fn and(self, other: QueryCondition) -> Self {
        QueryCondition::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: QueryCondition) -> Self {
        QueryCondition::Or(Box::new(self), Box::new(other))
    }

    /// Attribute names referenced by this condition
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            QueryCondition::Compare { field, .. } | QueryCondition::IsNull { field } => {
                out.push(field)
            }
            QueryCondition::And(a, b) | QueryCondition::Or(a, b) => {
                a.collect_fields(out);
                b.collect_fields(out);
            }
        }
    }

    /// Checks every referenced field is an attribute and every operand fits
    /// its type. `is_null` additionally requires a nullable attribute.
    pub fn check(&self, schema: &ArraySchema) -> EngineResult<()> {
        match self {
            QueryCondition::Compare { field, value, .. } => {
                let attr = schema.attribute(field).ok_or_else(|| {
                    EngineError::Condition(format!("'{}' is not an attribute", field))
                })?;
                if value.coerce(attr.datatype).is_none() {
                    return Err(EngineError::Condition(format!(
                        "operand {} does not fit attribute '{}' ({})",
                        value, field, attr.datatype
                    )));
                }
                Ok(())
            }
            QueryCondition::IsNull { field } => match schema.attribute(field) {
                Some(attr) if attr.nullable => Ok(()),
                Some(_) => Err(EngineError::Condition(format!(
                    "attribute '{}' is not nullable",
                    field
                ))),
                None => Err(EngineError::Condition(format!(
                    "'{}' is not an attribute",
                    field
                ))),
            },
            QueryCondition::And(a, b) | QueryCondition::Or(a, b) => {
                a.check(schema)?;
                b.check(schema)
            }
        }
    }

    /// Evaluates against a cell. `lookup` resolves an attribute to its value,
    /// `None` meaning null.
    pub fn evaluate<'a, F>(&self, lookup: &F) -> bool
    where
        F: Fn(&str) -> Option<&'a Scalar>,
    {
        match self {
            QueryCondition::Compare { field, op, value } => lookup(field)
                .and_then(|cell| cell.compare(value))
                .map(|ordering| op.holds(ordering))
                .unwrap_or(false),
            QueryCondition::IsNull { field } => lookup(field).is_none(),
            QueryCondition::And(a, b) => a.evaluate(lookup) && b.evaluate(lookup),
            QueryCondition::Or(a, b) => a.evaluate(lookup) || b.evaluate(lookup),
        }
    }
}

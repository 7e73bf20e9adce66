//! Scan metadata filter
//!
//! A `QueryFilter` is a list of `name <op> value` clauses over scan metadata,
//! joined by AND or OR. A numeric value tests `scan_fdata`, a text value tests
//! `scan_sdata`. A scan lacking the named entry never matches that clause.

use crate::model::MetadataValue;
use rusqlite::types::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl FilterOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "<>",
            FilterOp::Lt => "<",
            FilterOp::Le => "<=",
            FilterOp::Gt => ">",
            FilterOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterClause {
    pub name: String,
    pub op: FilterOp,
    pub value: MetadataValue,
}

impl FilterClause {
    pub fn new(name: impl Into<String>, op: FilterOp, value: impl Into<MetadataValue>) -> Self {
        Self {
            name: name.into(),
            op,
            value: value.into(),
        }
    }
}

/// Parses `NAME<op>VALUE` with op one of `= != < <= > >=`.
/// VALUE is numeric if it parses as a finite `f64`, otherwise text.
impl FromStr for FilterClause {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let pos = s
            .find(|c| matches!(c, '<' | '>' | '=' | '!'))
            .ok_or_else(|| format!("no comparison operator in filter '{}'", s))?;

        let (name, rest) = s.split_at(pos);
        let (op, value) = if let Some(v) = rest.strip_prefix(">=") {
            (FilterOp::Ge, v)
        } else if let Some(v) = rest.strip_prefix("<=") {
            (FilterOp::Le, v)
        } else if let Some(v) = rest.strip_prefix("!=") {
            (FilterOp::Ne, v)
        } else if let Some(v) = rest.strip_prefix('=') {
            (FilterOp::Eq, v)
        } else if let Some(v) = rest.strip_prefix('<') {
            (FilterOp::Lt, v)
        } else if let Some(v) = rest.strip_prefix('>') {
            (FilterOp::Gt, v)
        } else {
            return Err(format!("bad comparison operator in filter '{}'", s));
        };

        let name = name.trim();
        let value = value.trim();
        if name.is_empty() || value.is_empty() {
            return Err(format!("filter '{}' needs both a name and a value", s));
        }

        // "inf" and "nan" parse as f64 but are enum-style text readbacks here
        let value = match value.parse::<f64>() {
            Ok(v) if v.is_finite() => MetadataValue::Float(v),
            _ => MetadataValue::Text(value.to_string()),
        };

        Ok(FilterClause::new(name, op, value))
    }
}

impl fmt::Display for FilterClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.name, self.op.as_sql(), self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Conjunction {
    #[default]
    All,
    Any,
}

/// Predicate over scan metadata, passed through `Query` to the store untouched
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryFilter {
    clauses: Vec<FilterClause>,
    conjunction: Conjunction,
}

impl QueryFilter {
    /// Empty filter that matches every scan
    pub fn all() -> Self {
        Self::default()
    }

    /// Empty filter whose clauses will be OR-ed together
    pub fn any() -> Self {
        Self {
            clauses: Vec::new(),
            conjunction: Conjunction::Any,
        }
    }

    pub fn with(mut self, clause: FilterClause) -> Self {
        self.clauses.push(clause);
        self
    }

    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    pub fn conjunction(&self) -> Conjunction {
        self.conjunction
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// SQL boolean expression over an outer `scan` table aliased `s`, plus
    /// its positional parameters. `None` when there are no clauses.
    pub(crate) fn to_sql(&self) -> Option<(String, Vec<Value>)> {
        if self.clauses.is_empty() {
            return None;
        }

        let mut params = Vec::with_capacity(self.clauses.len() * 2);
        let parts: Vec<String> = self
            .clauses
            .iter()
            .map(|clause| {
                let table = match clause.value {
                    MetadataValue::Float(v) => {
                        params.push(Value::Text(clause.name.clone()));
                        params.push(Value::Real(v));
                        "scan_fdata"
                    }
                    MetadataValue::Text(ref t) => {
                        params.push(Value::Text(clause.name.clone()));
                        params.push(Value::Text(t.clone()));
                        "scan_sdata"
                    }
                };
                format!(
                    "EXISTS (SELECT 1 FROM {table} m WHERE m.sid = s.sid AND m.name = ? AND m.value {op} ?)",
                    table = table,
                    op = clause.op.as_sql()
                )
            })
            .collect();

        let joiner = match self.conjunction {
            Conjunction::All => " AND ",
            Conjunction::Any => " OR ",
        };

        Some((format!("({})", parts.join(joiner)), params))
    }
}

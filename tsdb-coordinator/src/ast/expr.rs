// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Condition expressions carried by statements
//!
//! Only the parts of expression handling the coordinator itself needs live
//! here: rendering, `now()` reduction, splitting time bounds out of a WHERE
//! clause, and tag-predicate matching for metadata enumeration. Field
//! arithmetic and aggregation belong to the planner.

use super::{format_duration_literal, quote_ident, quote_string};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Name of the time column in conditions
pub const TIME_VAR: &str = "time";

/// Pseudo-tag holding the measurement name during metadata enumeration
pub const NAME_VAR: &str = "_name";

/// Pseudo-tag holding the tag key during SHOW TAG VALUES enumeration
pub const TAG_KEY_VAR: &str = "_tagKey";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConditionError {
    #[error("cannot use OR with time conditions")]
    TimeInOr,

    #[error("invalid operator {0} in time condition")]
    InvalidTimeOperator(BinaryOp),

    #[error("invalid time value in condition: {0}")]
    InvalidTimeValue(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    EqRegex,
    NeqRegex,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::Neq
                | BinaryOp::Lt
                | BinaryOp::Lte
                | BinaryOp::Gt
                | BinaryOp::Gte
                | BinaryOp::EqRegex
                | BinaryOp::NeqRegex
        )
    }

    /// Operator with its operands swapped (`a < b` == `b > a`)
    fn flip(self) -> Self {
        match self {
            BinaryOp::Lt => BinaryOp::Gt,
            BinaryOp::Lte => BinaryOp::Gte,
            BinaryOp::Gt => BinaryOp::Lt,
            BinaryOp::Gte => BinaryOp::Lte,
            other => other,
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Eq => "=",
            BinaryOp::Neq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Lte => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Gte => ">=",
            BinaryOp::EqRegex => "=~",
            BinaryOp::NeqRegex => "!~",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        };
        f.write_str(s)
    }
}

/// Compiled regular expression compared by its source pattern
#[derive(Debug, Clone)]
pub struct RegexLiteral(Regex);

impl RegexLiteral {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self(Regex::new(pattern)?))
    }

    pub fn is_match(&self, s: &str) -> bool {
        self.0.is_match(s)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl PartialEq for RegexLiteral {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl fmt::Display for RegexLiteral {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "/{}/", self.0.as_str().replace('/', "\\/"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    VarRef(String),
    StringLiteral(String),
    RegexLiteral(RegexLiteral),
    NumberLiteral(f64),
    IntegerLiteral(i64),
    BooleanLiteral(bool),
    TimeLiteral(DateTime<Utc>),
    DurationLiteral(Duration),
    Call { name: String, args: Vec<Expr> },
    Wildcard,
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Paren(Box<Expr>),
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Self {
        Expr::VarRef(name.into())
    }

    pub fn string(s: impl Into<String>) -> Self {
        Expr::StringLiteral(s.into())
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            name: name.into(),
            args,
        }
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn and(lhs: Expr, rhs: Expr) -> Self {
        Expr::binary(BinaryOp::And, lhs, rhs)
    }

    /// `lhs AND rhs` where either side may be absent
    pub fn and_opt(lhs: Option<Expr>, rhs: Option<Expr>) -> Option<Expr> {
        match (lhs, rhs) {
            (Some(l), Some(r)) => Some(Expr::and(l, r)),
            (Some(e), None) | (None, Some(e)) => Some(e),
            (None, None) => None,
        }
    }

    fn is_time_ref(&self) -> bool {
        matches!(self, Expr::VarRef(name) if name.eq_ignore_ascii_case(TIME_VAR))
    }

    /// Evaluate a tag predicate against a tag lookup
    ///
    /// Comparisons that do not involve a tag and a string or regex literal
    /// cannot be decided from tags alone and evaluate to true.
    pub fn eval_tags(&self, tags: &BTreeMap<String, String>) -> bool {
        match self {
            Expr::Paren(inner) => inner.eval_tags(tags),
            Expr::Binary { op, lhs, rhs } => match op {
                BinaryOp::And => lhs.eval_tags(tags) && rhs.eval_tags(tags),
                BinaryOp::Or => lhs.eval_tags(tags) || rhs.eval_tags(tags),
                _ => {
                    let (key, literal) = match (lhs.as_ref(), rhs.as_ref()) {
                        (Expr::VarRef(k), lit) | (lit, Expr::VarRef(k)) => (k, lit),
                        _ => return true,
                    };
                    let value = tags.get(key).map(String::as_str).unwrap_or("");
                    match (op, literal) {
                        (BinaryOp::Eq, Expr::StringLiteral(s)) => value == s,
                        (BinaryOp::Neq, Expr::StringLiteral(s)) => value != s,
                        (BinaryOp::EqRegex, Expr::RegexLiteral(re)) => re.is_match(value),
                        (BinaryOp::NeqRegex, Expr::RegexLiteral(re)) => !re.is_match(value),
                        _ => true,
                    }
                }
            },
            _ => true,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::VarRef(name) => f.write_str(&quote_ident(name)),
            Expr::StringLiteral(s) => f.write_str(&quote_string(s)),
            Expr::RegexLiteral(re) => write!(f, "{}", re),
            Expr::NumberLiteral(n) => write!(f, "{:.3}", n),
            Expr::IntegerLiteral(i) => write!(f, "{}", i),
            Expr::BooleanLiteral(b) => write!(f, "{}", b),
            Expr::TimeLiteral(t) => {
                write!(f, "'{}'", t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Expr::DurationLiteral(d) => f.write_str(&format_duration_literal(*d)),
            Expr::Call { name, args } => {
                let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "{}({})", name, args.join(", "))
            }
            Expr::Wildcard => f.write_str("*"),
            Expr::Binary { op, lhs, rhs } => write!(f, "{} {} {}", lhs, op, rhs),
            Expr::Paren(inner) => write!(f, "({})", inner),
        }
    }
}

/// Report whether a condition references the time column
pub fn has_time_expr(expr: &Expr) -> bool {
    match expr {
        Expr::Binary { op, lhs, rhs } => match op {
            BinaryOp::And | BinaryOp::Or => has_time_expr(lhs) || has_time_expr(rhs),
            _ => lhs.is_time_ref() || rhs.is_time_ref(),
        },
        Expr::Paren(inner) => has_time_expr(inner),
        _ => false,
    }
}

/// Replace `now()` with `now` and fold time arithmetic on literals
pub fn reduce_now(expr: &Expr, now: DateTime<Utc>) -> Expr {
    match expr {
        Expr::Call { name, args } if args.is_empty() && name.eq_ignore_ascii_case("now") => {
            Expr::TimeLiteral(now)
        }
        Expr::Call { name, args } => Expr::Call {
            name: name.clone(),
            args: args.iter().map(|a| reduce_now(a, now)).collect(),
        },
        Expr::Binary { op, lhs, rhs } => {
            let lhs = reduce_now(lhs, now);
            let rhs = reduce_now(rhs, now);
            match (op, &lhs, &rhs) {
                (BinaryOp::Add, Expr::TimeLiteral(t), Expr::DurationLiteral(d))
                | (BinaryOp::Add, Expr::DurationLiteral(d), Expr::TimeLiteral(t)) => {
                    Expr::TimeLiteral(offset_time(*t, *d))
                }
                (BinaryOp::Sub, Expr::TimeLiteral(t), Expr::DurationLiteral(d)) => {
                    Expr::TimeLiteral(offset_time(*t, -*d))
                }
                _ => Expr::binary(*op, lhs, rhs),
            }
        }
        Expr::Paren(inner) => match reduce_now(inner, now) {
            lit @ (Expr::TimeLiteral(_) | Expr::DurationLiteral(_)) => lit,
            other => Expr::Paren(Box::new(other)),
        },
        other => other.clone(),
    }
}

/// Shift `t` by `d`, saturating at the supported time limits
fn offset_time(t: DateTime<Utc>, d: Duration) -> DateTime<Utc> {
    let shifted = match t.checked_add_signed(d) {
        Some(shifted) => shifted,
        None if d < Duration::zero() => return TimeRange::min_supported(),
        None => return TimeRange::max_supported(),
    };
    shifted.clamp(TimeRange::min_supported(), TimeRange::max_supported())
}

/// Inclusive time bounds extracted from a condition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub min: Option<DateTime<Utc>>,
    pub max: Option<DateTime<Utc>>,
}

impl TimeRange {
    /// Smallest representable timestamp
    pub fn min_supported() -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(i64::MIN + 2)
    }

    /// Largest representable timestamp
    pub fn max_supported() -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(i64::MAX - 1)
    }

    /// Lower bound, or the smallest supported time when unbounded
    pub fn min_time(&self) -> DateTime<Utc> {
        self.min.unwrap_or_else(Self::min_supported)
    }

    /// Upper bound, or the largest supported time when unbounded
    pub fn max_time(&self) -> DateTime<Utc> {
        self.max.unwrap_or_else(Self::max_supported)
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    fn raise_min(&mut self, t: DateTime<Utc>) {
        self.min = Some(self.min.map_or(t, |m| m.max(t)));
    }

    fn lower_max(&mut self, t: DateTime<Utc>) {
        self.max = Some(self.max.map_or(t, |m| m.min(t)));
    }
}

/// Split a condition into its non-time remainder and the time range it
/// selects
pub fn condition_expr(
    cond: Option<&Expr>,
    now: DateTime<Utc>,
) -> Result<(Option<Expr>, TimeRange), ConditionError> {
    let mut range = TimeRange::default();
    let rest = match cond {
        Some(expr) => split_time(expr, now, &mut range)?,
        None => None,
    };
    Ok((rest, range))
}

fn split_time(
    expr: &Expr,
    now: DateTime<Utc>,
    range: &mut TimeRange,
) -> Result<Option<Expr>, ConditionError> {
    match expr {
        Expr::Paren(inner) => {
            Ok(split_time(inner, now, range)?.map(|e| Expr::Paren(Box::new(e))))
        }
        Expr::Binary {
            op: BinaryOp::And,
            lhs,
            rhs,
        } => {
            let lhs = split_time(lhs, now, range)?;
            let rhs = split_time(rhs, now, range)?;
            Ok(Expr::and_opt(lhs, rhs))
        }
        Expr::Binary {
            op: BinaryOp::Or, ..
        } => {
            if has_time_expr(expr) {
                return Err(ConditionError::TimeInOr);
            }
            Ok(Some(expr.clone()))
        }
        Expr::Binary { op, lhs, rhs } if op.is_comparison() => {
            let (op, other) = if lhs.is_time_ref() {
                (*op, rhs.as_ref())
            } else if rhs.is_time_ref() {
                (op.flip(), lhs.as_ref())
            } else {
                return Ok(Some(expr.clone()));
            };
            let t = time_value(other, now)?;
            let one = Duration::nanoseconds(1);
            match op {
                BinaryOp::Eq => {
                    range.raise_min(t);
                    range.lower_max(t);
                }
                BinaryOp::Gt => range.raise_min(offset_time(t, one)),
                BinaryOp::Gte => range.raise_min(t),
                BinaryOp::Lt => range.lower_max(offset_time(t, -one)),
                BinaryOp::Lte => range.lower_max(t),
                other => return Err(ConditionError::InvalidTimeOperator(other)),
            }
            Ok(None)
        }
        other => Ok(Some(other.clone())),
    }
}

fn time_value(expr: &Expr, now: DateTime<Utc>) -> Result<DateTime<Utc>, ConditionError> {
    match reduce_now(expr, now) {
        Expr::TimeLiteral(t) => Ok(t),
        Expr::IntegerLiteral(ns) => Ok(DateTime::from_timestamp_nanos(ns)),
        Expr::StringLiteral(s) => DateTime::parse_from_rfc3339(&s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| ConditionError::InvalidTimeValue(s)),
        other => Err(ConditionError::InvalidTimeValue(other.to_string())),
    }
}

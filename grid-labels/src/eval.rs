use crate::ast::{CmpOp, Expr, Literal};
use crate::error::ScopeError;
use crate::value::{LabelMap, LabelValue};
use regex::Regex;

/// A compiled form of [`Expr`] with `matches` patterns pre-built into [`Regex`]
/// objects, so evaluation never re-parses a pattern or fails.
#[derive(Debug)]
enum Compiled {
    True,
    Cmp {
        key: String,
        op: CmpOp,
        literal: Literal,
        regex: Option<Regex>,
    },
    Not(Box<Compiled>),
    And(Box<Compiled>, Box<Compiled>),
    Or(Box<Compiled>, Box<Compiled>),
}

fn compile_node(expr: &Expr) -> Result<Compiled, ScopeError> {
    Ok(match expr {
        Expr::True => Compiled::True,
        Expr::Not(inner) => Compiled::Not(Box::new(compile_node(inner)?)),
        Expr::And(l, r) => Compiled::And(Box::new(compile_node(l)?), Box::new(compile_node(r)?)),
        Expr::Or(l, r) => Compiled::Or(Box::new(compile_node(l)?), Box::new(compile_node(r)?)),
        Expr::Cmp { key, op, literal } => {
            let regex = if *op == CmpOp::Matches {
                let Literal::Str(pattern) = literal else {
                    return Err(ScopeError::Syntax("'matches' requires a string pattern".into()));
                };
                Some(Regex::new(pattern).map_err(|e| ScopeError::InvalidRegex(e.to_string()))?)
            } else {
                None
            };
            Compiled::Cmp {
                key: key.clone(),
                op: *op,
                literal: literal.clone(),
                regex,
            }
        }
    })
}

/// A compiled, thread-safe, cacheable label-scope evaluator.
///
/// Construct via [`crate::compile`] or [`crate::ScopeCache`]. Evaluation never
/// fails: missing keys and type mismatches are "undefined" and behave as
/// `false` in any comparison, per the evaluator's undefined-key semantics.
#[derive(Debug)]
pub struct Evaluator {
    source: String,
    root: Compiled,
}

impl Evaluator {
    pub(crate) fn new(source: String, expr: &Expr) -> Result<Self, ScopeError> {
        let root = compile_node(expr)?;
        Ok(Self { source, root })
    }

    /// The original expression string this evaluator was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate the compiled expression against a label map.
    pub fn evaluate(&self, labels: &LabelMap) -> bool {
        eval_node(&self.root, labels)
    }
}

fn eval_node(node: &Compiled, labels: &LabelMap) -> bool {
    match node {
        Compiled::True => true,
        Compiled::Not(inner) => !eval_node(inner, labels),
        Compiled::And(l, r) => eval_node(l, labels) && eval_node(r, labels),
        Compiled::Or(l, r) => eval_node(l, labels) || eval_node(r, labels),
        Compiled::Cmp { key, op, literal, regex } => {
            let Some(actual) = labels.get(key) else {
                // Undefined key: every comparison is false, but evaluation continues.
                return false;
            };
            eval_cmp(actual, *op, literal, regex.as_ref())
        }
    }
}

fn eval_cmp(actual: &LabelValue, op: CmpOp, literal: &Literal, regex: Option<&Regex>) -> bool {
    match op {
        CmpOp::Matches => {
            let (Some(s), Some(re)) = (actual.as_str(), regex) else {
                return false;
            };
            re.is_match(s)
        }
        CmpOp::Eq | CmpOp::Ne => {
            let equal = match (actual, literal) {
                (LabelValue::Str(a), Literal::Str(b)) => a == b,
                (LabelValue::Num(a), Literal::Num(b)) => a == b,
                (LabelValue::Bool(a), Literal::Bool(b)) => a == b,
                _ => return false, // type mismatch: undefined, never matches
            };
            if op == CmpOp::Eq { equal } else { !equal }
        }
        CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => {
            let (LabelValue::Num(a), Literal::Num(b)) = (actual, literal) else {
                return false;
            };
            match op {
                CmpOp::Lt => a < b,
                CmpOp::Le => a <= b,
                CmpOp::Gt => a > b,
                CmpOp::Ge => a >= b,
                _ => unreachable!(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use std::collections::BTreeMap;

    fn eval(expr: &str, labels: &[(&str, LabelValue)]) -> bool {
        let ast = parse(expr).unwrap();
        let compiled = Evaluator::new(expr.to_string(), &ast).unwrap();
        let map: LabelMap = labels.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        compiled.evaluate(&map)
    }

    #[test]
    fn empty_expression_is_true() {
        let map: LabelMap = BTreeMap::new();
        let ast = parse("").unwrap();
        let compiled = Evaluator::new(String::new(), &ast).unwrap();
        assert!(compiled.evaluate(&map));
    }

    #[test]
    fn basic_equality() {
        assert!(eval("env == \"dev\"", &[("env", LabelValue::Str("dev".into()))]));
        assert!(!eval("env == \"dev\"", &[("env", LabelValue::Str("prod".into()))]));
    }

    #[test]
    fn and_or_not() {
        let labels = [
            ("env", LabelValue::Str("dev".into())),
            ("team", LabelValue::Str("platform".into())),
        ];
        assert!(eval("env == \"dev\" and team == \"platform\"", &labels));
        assert!(!eval("env == \"prod\" and team == \"platform\"", &labels));
        assert!(eval("env == \"prod\" or team == \"platform\"", &labels));
        assert!(eval("not (env == \"prod\")", &labels));
    }

    #[test]
    fn missing_key_is_false_but_does_not_abort_or() {
        let labels = [("team", LabelValue::Str("platform".into()))];
        // `env` is undefined; the comparison is false, but `or` still evaluates the rhs.
        assert!(eval("env == \"dev\" or team == \"platform\"", &labels));
        assert!(!eval("env == \"dev\"", &labels));
    }

    #[test]
    fn numeric_and_matches() {
        let labels = [
            ("replicas", LabelValue::Num(3.0)),
            ("name", LabelValue::Str("svc-a".into())),
        ];
        assert!(eval("replicas >= 2", &labels));
        assert!(!eval("replicas >= 4", &labels));
        assert!(eval("name matches \"^svc-\"", &labels));
    }

    #[test]
    fn invalid_regex_fails_to_compile() {
        let ast = parse("name matches \"(\"").unwrap();
        assert!(Evaluator::new("name matches \"(\"".into(), &ast).is_err());
    }
}

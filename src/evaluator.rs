use std::{cmp::Ordering, collections::HashMap};

use rust_decimal::{Decimal, prelude::FromPrimitive, prelude::ToPrimitive};
use thiserror::Error;

use crate::{
    age,
    ast::{BinOp, Callable, Expr},
    value::Value,
};

/// Errors raised while evaluating callables or running stages.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// Type mismatch or invalid operation for the given type
    #[error("Type error: {0}")]
    TypeError(String),

    /// A bare name other than `x` that is not a function being called
    #[error("Unknown name: {0}")]
    UnknownName(String),

    #[error("Unknown function: {0}()")]
    UnknownFunction(String),

    #[error("Unknown method: .{0}()")]
    UnknownMethod(String),

    #[error("Division by zero")]
    DivisionByZero,

    /// A stage parameter has the wrong type or value
    #[error("Invalid argument for {stage}: {message}")]
    InvalidArgument { stage: String, message: String },

    #[error("Unknown stage: {0}")]
    UnknownStage(String),

    /// Attribute, index or call suffixes after a stage call
    #[error("Stage {0} does not support trailing calls or accessors")]
    UnsupportedTrailer(String),
}

/// Evaluates callable expressions against one record at a time.
///
/// The record is bound to `x`; `.id` is short for `x.id`.
///
/// # Examples
///
/// ```
/// use jf_lang::{Evaluator, Value};
/// use jf_lang::lower::parse_expr;
/// use std::collections::HashMap;
///
/// let mut record = HashMap::new();
/// record.insert("id".to_string(), Value::Integer(2));
///
/// let expr = parse_expr(".id > 1").unwrap();
/// let result = Evaluator::new().call(&expr, &Value::Object(record)).unwrap();
/// assert_eq!(result, Value::Boolean(true));
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct Evaluator;

/// Integer view of a decimal result when it is whole, float otherwise.
fn decimal_value(result: Decimal) -> Option<Value> {
    if result.is_integer()
        && let Some(r) = result.to_i64()
    {
        return Some(Value::Integer(r));
    }
    result.to_f64().map(Value::Float)
}

fn to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Integer(n) => Decimal::from_i64(*n),
        Value::Float(n) => Decimal::from_f64(*n),
        _ => None,
    }
}

fn expect_array<'a>(name: &str, value: &'a Value) -> Result<&'a [Value], EvalError> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(EvalError::TypeError(format!(
            "{}() requires array, got {}",
            name,
            other.type_name()
        ))),
    }
}

fn expect_string<'a>(name: &str, value: &'a Value) -> Result<&'a str, EvalError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(EvalError::TypeError(format!(
            ".{}() requires string, got {}",
            name,
            other.type_name()
        ))),
    }
}

fn expect_object<'a>(name: &str, value: &'a Value) -> Result<&'a HashMap<String, Value>, EvalError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(EvalError::TypeError(format!(
            "{}() requires object, got {}",
            name,
            other.type_name()
        ))),
    }
}

/// Name of the always-available numeric function table.
const MATH: &str = "math";

fn math_constant(name: &str) -> Result<Value, EvalError> {
    match name {
        "pi" => Ok(Value::Float(std::f64::consts::PI)),
        "e" => Ok(Value::Float(std::f64::consts::E)),
        "inf" => Ok(Value::Float(f64::INFINITY)),
        _ => Err(EvalError::UnknownName(format!("{MATH}.{name}"))),
    }
}

fn math_operand(name: &str, value: &Value) -> Result<f64, EvalError> {
    value.as_float().ok_or_else(|| {
        EvalError::TypeError(format!(
            "math.{}() requires number, got {}",
            name,
            value.type_name()
        ))
    })
}

fn math_result(value: f64) -> Result<Value, EvalError> {
    if value.is_infinite() {
        return Err(EvalError::TypeError("math range error".into()));
    }
    Ok(Value::Float(value))
}

fn math_domain_error() -> EvalError {
    EvalError::TypeError("math domain error".into())
}

/// `math.floor` / `math.ceil` keep integers and round floats to integers.
fn math_rounded(name: &str, args: &[Value], round: fn(f64) -> f64) -> Result<Value, EvalError> {
    arity(&format!("{MATH}.{name}"), args, 1, 1)?;
    if let Value::Integer(n) = args[0] {
        return Ok(Value::Integer(n));
    }
    let rounded = round(math_operand(name, &args[0])?);
    if rounded.is_finite() && rounded >= i64::MIN as f64 && rounded < i64::MAX as f64 {
        Ok(Value::Integer(rounded as i64))
    } else {
        Err(EvalError::TypeError(format!(
            "cannot convert {} to integer",
            rounded
        )))
    }
}

/// Calls `math.<name>(args)`.
fn call_math(name: &str, args: &[Value]) -> Result<Value, EvalError> {
    let qualified = format!("{MATH}.{name}");
    match name {
        "floor" => math_rounded(name, args, f64::floor),
        "ceil" => math_rounded(name, args, f64::ceil),
        "sqrt" => {
            arity(&qualified, args, 1, 1)?;
            let x = math_operand(name, &args[0])?;
            if x < 0.0 {
                return Err(math_domain_error());
            }
            math_result(x.sqrt())
        }
        "exp" => {
            arity(&qualified, args, 1, 1)?;
            math_result(math_operand(name, &args[0])?.exp())
        }
        "log" | "log2" | "log10" => {
            let max = if name == "log" { 2 } else { 1 };
            arity(&qualified, args, 1, max)?;
            let x = math_operand(name, &args[0])?;
            if x <= 0.0 {
                return Err(math_domain_error());
            }
            match (name, args.get(1)) {
                ("log2", _) => math_result(x.log2()),
                ("log10", _) => math_result(x.log10()),
                (_, None) => math_result(x.ln()),
                (_, Some(base)) => {
                    let base = math_operand(name, base)?;
                    if base <= 0.0 {
                        return Err(math_domain_error());
                    }
                    if base == 1.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    math_result(x.ln() / base.ln())
                }
            }
        }
        "pow" => {
            arity(&qualified, args, 2, 2)?;
            let base = math_operand(name, &args[0])?;
            let exponent = math_operand(name, &args[1])?;
            if base < 0.0 && exponent.fract() != 0.0 {
                return Err(math_domain_error());
            }
            math_result(base.powf(exponent))
        }
        _ => Err(EvalError::UnknownFunction(qualified)),
    }
}

fn arity(name: &str, args: &[Value], min: usize, max: usize) -> Result<(), EvalError> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            min.to_string()
        } else {
            format!("{} to {}", min, max)
        };
        return Err(EvalError::TypeError(format!(
            "{}() takes {} argument(s), got {}",
            name,
            expected,
            args.len()
        )));
    }
    Ok(())
}

/// Object entries in key order.
fn sorted_entries(map: &HashMap<String, Value>) -> Vec<(&String, &Value)> {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by(|(a, _), (b, _)| a.cmp(b));
    entries
}

/// Stable sort of `(key, item)` pairs by key; keys that do not compare are
/// an error. `reverse` keeps equal keys in their original order.
pub fn sort_keyed<T>(items: &mut [(Value, T)], reverse: bool) -> Result<(), EvalError> {
    let mut failure = None;
    items.sort_by(|(a, _), (b, _)| {
        let (a, b) = if reverse { (b, a) } else { (a, b) };
        a.compare(b).unwrap_or_else(|| {
            failure.get_or_insert_with(|| {
                EvalError::TypeError(format!(
                    "Cannot order {} and {}",
                    a.type_name(),
                    b.type_name()
                ))
            });
            Ordering::Equal
        })
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Evaluator
    }

    /// Evaluates `expr` with `x` bound to `record`.
    pub fn call(&self, expr: &Expr, record: &Value) -> Result<Value, EvalError> {
        self.eval_expr(expr, record)
    }

    /// Applies a stage callable to a record.
    ///
    /// One expression yields its value, several yield an array of values,
    /// and no expression at all yields the record unchanged.
    pub fn call_callable(&self, callable: &Callable, record: &Value) -> Result<Value, EvalError> {
        match callable.exprs() {
            [] => Ok(record.clone()),
            [single] => self.eval_expr(single, record),
            exprs => exprs
                .iter()
                .map(|e| self.eval_expr(e, record))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
        }
    }

    /// Evaluates each callable expression on its own with `x` bound to null,
    /// for stages whose parameters are plain values (`first(2)`).
    pub fn params(&self, callable: &Callable) -> Result<Vec<Value>, EvalError> {
        callable
            .exprs()
            .iter()
            .map(|e| self.eval_expr(e, &Value::Null))
            .collect()
    }

    fn eval_expr(&self, expr: &Expr, record: &Value) -> Result<Value, EvalError> {
        match expr {
            Expr::Float(n) => Ok(Value::Float(*n)),
            Expr::Integer(n) => Ok(Value::Integer(*n)),
            Expr::String(s) => Ok(Value::String(s.clone())),
            Expr::Boolean(b) => Ok(Value::Boolean(*b)),
            Expr::Null => Ok(Value::Null),
            Expr::Arg => Ok(record.clone()),
            Expr::Name(name) => Err(EvalError::UnknownName(name.clone())),
            Expr::Attr { object, name } => {
                if let Expr::Name(module) = object.as_ref()
                    && module == MATH
                {
                    return math_constant(name);
                }
                let object = self.eval_expr(object, record)?;
                self.apply_access(&object, &Value::String(name.clone()))
            }
            Expr::Index { object, index } => {
                let object = self.eval_expr(object, record)?;
                let index = self.eval_expr(index, record)?;
                self.apply_access(&object, &index)
            }
            Expr::Call {
                function,
                args,
                kwargs,
            } => {
                let args = args
                    .iter()
                    .map(|a| self.eval_expr(a, record))
                    .collect::<Result<Vec<_>, _>>()?;
                let kwargs = kwargs
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), self.eval_expr(v, record)?)))
                    .collect::<Result<Vec<_>, EvalError>>()?;
                match function.as_ref() {
                    Expr::Name(name) => self.call_function(name, &args, &kwargs),
                    Expr::Attr { object, name } => match object.as_ref() {
                        Expr::Name(module) if module == MATH => call_math(name, &args),
                        object => {
                            let object = self.eval_expr(object, record)?;
                            self.eval_method_call(&object, name, &args, &kwargs)
                        }
                    },
                    other => Err(EvalError::TypeError(format!("'{}' is not callable", other))),
                }
            }
            Expr::BinaryOp { op, left, right } => match op {
                BinOp::And => {
                    let left = self.eval_expr(left, record)?;
                    if !left.is_truthy() {
                        return Ok(Value::Boolean(false));
                    }
                    Ok(Value::Boolean(self.eval_expr(right, record)?.is_truthy()))
                }
                BinOp::Or => {
                    let left = self.eval_expr(left, record)?;
                    if left.is_truthy() {
                        return Ok(Value::Boolean(true));
                    }
                    Ok(Value::Boolean(self.eval_expr(right, record)?.is_truthy()))
                }
                _ => {
                    let left = self.eval_expr(left, record)?;
                    let right = self.eval_expr(right, record)?;
                    self.apply_binop(*op, &left, &right)
                }
            },
            Expr::Not(operand) => Ok(Value::Boolean(!self.eval_expr(operand, record)?.is_truthy())),
            Expr::Negate(operand) => match self.eval_expr(operand, record)? {
                Value::Integer(n) => n
                    .checked_neg()
                    .map(Value::Integer)
                    .ok_or_else(|| EvalError::TypeError("Integer overflow".into())),
                Value::Float(n) => Ok(Value::Float(-n)),
                other => Err(EvalError::TypeError(format!(
                    "Cannot negate {}",
                    other.type_name()
                ))),
            },
            Expr::Array(items) | Expr::Tuple(items) => items
                .iter()
                .map(|e| self.eval_expr(e, record))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Expr::Object(items) => {
                let mut map = HashMap::new();
                for (key, value) in items {
                    let key = match self.eval_expr(key, record)? {
                        Value::String(s) => s,
                        other => other.as_string(),
                    };
                    map.insert(key, self.eval_expr(value, record)?);
                }
                Ok(Value::Object(map))
            }
        }
    }

    fn apply_access(&self, object: &Value, key: &Value) -> Result<Value, EvalError> {
        match (object, key) {
            (Value::Object(map), Value::String(k)) => Ok(map.get(k).cloned().unwrap_or(Value::Null)),
            (Value::Object(map), k @ (Value::Integer(_) | Value::Float(_) | Value::Boolean(_))) => {
                Ok(map.get(&k.as_string()).cloned().unwrap_or(Value::Null))
            }
            (Value::Array(arr), Value::Integer(n)) => {
                let index = if *n < 0 {
                    // -1 is the last element
                    let back = n.unsigned_abs() as usize;
                    if back > arr.len() {
                        return Ok(Value::Null);
                    }
                    arr.len() - back
                } else {
                    *n as usize
                };
                Ok(arr.get(index).cloned().unwrap_or(Value::Null))
            }
            (Value::String(s), Value::Integer(n)) => {
                let chars: Vec<char> = s.chars().collect();
                let index = if *n < 0 {
                    chars.len().checked_sub(n.unsigned_abs() as usize)
                } else {
                    Some(*n as usize)
                };
                Ok(index
                    .and_then(|i| chars.get(i))
                    .map(|c| Value::String(c.to_string()))
                    .unwrap_or(Value::Null))
            }
            (Value::Null, _) => Ok(Value::Null),
            (Value::Array(_), Value::String(k)) => Err(EvalError::TypeError(format!(
                "Cannot use string key '{}' on array; use integer index instead",
                k
            ))),
            _ => Err(EvalError::TypeError(format!(
                "Cannot access {} with {} key",
                object.type_name(),
                key.type_name()
            ))),
        }
    }

    /// `+ - * / %` on numbers; mixed integer/float goes through decimals so
    /// whole results stay integers.
    fn arithmetic(&self, op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
        if matches!(op, BinOp::Divide | BinOp::Modulo)
            && right.as_float().is_some_and(|r| r == 0.0)
        {
            return Err(EvalError::DivisionByZero);
        }

        match (left, right) {
            (Value::Integer(a), Value::Integer(b)) => {
                let result = match op {
                    BinOp::Add => a.checked_add(*b),
                    BinOp::Subtract => a.checked_sub(*b),
                    BinOp::Multiply => a.checked_mul(*b),
                    BinOp::Divide if a.checked_rem(*b) == Some(0) => a.checked_div(*b),
                    BinOp::Divide => return Ok(Value::Float(*a as f64 / *b as f64)),
                    _ => a.checked_rem_euclid(*b).map(|r| if *b < 0 && r != 0 { r + b } else { r }),
                };
                result
                    .map(Value::Integer)
                    .ok_or_else(|| EvalError::TypeError("Integer overflow".into()))
            }
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(match op {
                BinOp::Add => a + b,
                BinOp::Subtract => a - b,
                BinOp::Multiply => a * b,
                BinOp::Divide => a / b,
                _ => {
                    // result takes the sign of the divisor
                    let r = a.rem_euclid(*b);
                    if *b < 0.0 && r != 0.0 { r + b } else { r }
                }
            })),
            (Value::Integer(_), Value::Float(_)) | (Value::Float(_), Value::Integer(_)) => {
                if let (Some(ad), Some(bd)) = (to_decimal(left), to_decimal(right)) {
                    let result = match op {
                        BinOp::Add => ad.checked_add(bd),
                        BinOp::Subtract => ad.checked_sub(bd),
                        BinOp::Multiply => ad.checked_mul(bd),
                        BinOp::Divide => ad.checked_div(bd),
                        _ => ad.checked_rem(bd),
                    };
                    if let Some(value) = result.and_then(decimal_value) {
                        return Ok(value);
                    }
                }
                let (a, b) = (left.as_float().unwrap_or(0.0), right.as_float().unwrap_or(0.0));
                self.arithmetic(op, &Value::Float(a), &Value::Float(b))
            }
            (Value::String(a), Value::String(b)) if op == BinOp::Add => {
                Ok(Value::String(format!("{}{}", a, b)))
            }
            (Value::Array(a), Value::Array(b)) if op == BinOp::Add => {
                Ok(Value::Array(a.iter().chain(b).cloned().collect()))
            }
            (a, b) => Err(EvalError::TypeError(format!(
                "Unsupported operand types for {}: {} and {}",
                op,
                a.type_name(),
                b.type_name()
            ))),
        }
    }

    fn apply_binop(&self, op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
        match op {
            BinOp::Add | BinOp::Subtract | BinOp::Multiply | BinOp::Divide | BinOp::Modulo => {
                self.arithmetic(op, left, right)
            }
            BinOp::Equal => Ok(Value::Boolean(left.loose_eq(right))),
            BinOp::NotEqual => Ok(Value::Boolean(!left.loose_eq(right))),
            BinOp::LessThan | BinOp::GreaterThan | BinOp::LessEqual | BinOp::GreaterEqual => {
                let ordering = left.compare(right).ok_or_else(|| {
                    EvalError::TypeError(format!(
                        "Cannot compare {} {} {}",
                        left.type_name(),
                        op,
                        right.type_name()
                    ))
                })?;
                Ok(Value::Boolean(match op {
                    BinOp::LessThan => ordering == Ordering::Less,
                    BinOp::GreaterThan => ordering == Ordering::Greater,
                    BinOp::LessEqual => ordering != Ordering::Greater,
                    _ => ordering != Ordering::Less,
                }))
            }
            BinOp::In => match (left, right) {
                (item, Value::Array(items)) => {
                    Ok(Value::Boolean(items.iter().any(|v| v.loose_eq(item))))
                }
                (Value::String(needle), Value::String(haystack)) => {
                    Ok(Value::Boolean(haystack.contains(needle.as_str())))
                }
                (Value::String(key), Value::Object(map)) => Ok(Value::Boolean(map.contains_key(key))),
                (a, b) => Err(EvalError::TypeError(format!(
                    "Cannot test {} in {}",
                    a.type_name(),
                    b.type_name()
                ))),
            },
            BinOp::And => Ok(Value::Boolean(left.is_truthy() && right.is_truthy())),
            BinOp::Or => Ok(Value::Boolean(left.is_truthy() || right.is_truthy())),
        }
    }

    /// Dispatch builtin function calls
    fn call_function(
        &self,
        name: &str,
        args: &[Value],
        kwargs: &[(String, Value)],
    ) -> Result<Value, EvalError> {
        match name {
            "len" => self.function_len(args),
            "str" => {
                arity(name, args, 1, 1)?;
                Ok(Value::String(args[0].as_string()))
            }
            "int" => self.function_int(args),
            "float" => self.function_float(args),
            "abs" => {
                arity(name, args, 1, 1)?;
                match &args[0] {
                    Value::Integer(n) => Ok(Value::Integer(n.saturating_abs())),
                    Value::Float(n) => Ok(Value::Float(n.abs())),
                    other => Err(EvalError::TypeError(format!(
                        "abs() requires number, got {}",
                        other.type_name()
                    ))),
                }
            }
            "round" => self.function_round(args),
            "sum" => self.function_sum(args),
            "min" => self.function_extreme(name, args, Ordering::Less),
            "max" => self.function_extreme(name, args, Ordering::Greater),
            "sorted" => {
                arity(name, args, 1, 1)?;
                let mut keyed: Vec<(Value, ())> = expect_array(name, &args[0])?
                    .iter()
                    .map(|v| (v.clone(), ()))
                    .collect();
                let reverse = kwargs
                    .iter()
                    .find(|(k, _)| k == "reverse")
                    .is_some_and(|(_, v)| v.is_truthy());
                sort_keyed(&mut keyed, reverse)?;
                Ok(Value::Array(keyed.into_iter().map(|(v, _)| v).collect()))
            }
            "keys" => {
                arity(name, args, 1, 1)?;
                self.method_keys(&args[0])
            }
            "values" => {
                arity(name, args, 1, 1)?;
                self.method_values(&args[0])
            }
            "age" => {
                arity(name, args, 1, 1)?;
                let text = match &args[0] {
                    Value::String(s) => s,
                    other => {
                        return Err(EvalError::TypeError(format!(
                            "age() requires a timestamp or duration string, got {}",
                            other.type_name()
                        )));
                    }
                };
                age::age(text).map(Value::Float).ok_or_else(|| {
                    EvalError::TypeError(format!(
                        "age() cannot read '{}' as a timestamp or duration",
                        text
                    ))
                })
            }
            _ => Err(EvalError::UnknownFunction(name.to_string())),
        }
    }

    fn function_len(&self, args: &[Value]) -> Result<Value, EvalError> {
        arity("len", args, 1, 1)?;
        let len = match &args[0] {
            Value::String(s) => s.chars().count(),
            Value::Array(arr) => arr.len(),
            Value::Object(obj) => obj.len(),
            other => {
                return Err(EvalError::TypeError(format!(
                    "len() requires string, array or object, got {}",
                    other.type_name()
                )));
            }
        };
        Ok(Value::Integer(len as i64))
    }

    fn function_int(&self, args: &[Value]) -> Result<Value, EvalError> {
        arity("int", args, 1, 1)?;
        match &args[0] {
            Value::Integer(n) => Ok(Value::Integer(*n)),
            Value::Float(n) => Ok(Value::Integer(n.trunc() as i64)),
            Value::Boolean(b) => Ok(Value::Integer(*b as i64)),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| EvalError::TypeError(format!("int() cannot parse '{}'", s))),
            other => Err(EvalError::TypeError(format!(
                "int() requires number or string, got {}",
                other.type_name()
            ))),
        }
    }

    fn function_float(&self, args: &[Value]) -> Result<Value, EvalError> {
        arity("float", args, 1, 1)?;
        match &args[0] {
            Value::Integer(n) => Ok(Value::Float(*n as f64)),
            Value::Float(n) => Ok(Value::Float(*n)),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| EvalError::TypeError(format!("float() cannot parse '{}'", s))),
            other => Err(EvalError::TypeError(format!(
                "float() requires number or string, got {}",
                other.type_name()
            ))),
        }
    }

    /// round(n) gives an integer, round(n, digits) a number with that many
    /// decimals.
    fn function_round(&self, args: &[Value]) -> Result<Value, EvalError> {
        arity("round", args, 1, 2)?;
        let digits = match args.get(1) {
            None => None,
            Some(Value::Integer(d)) => Some(*d),
            Some(other) => {
                return Err(EvalError::TypeError(format!(
                    "round() digits must be integer, got {}",
                    other.type_name()
                )));
            }
        };
        match (&args[0], digits) {
            (Value::Integer(n), _) => Ok(Value::Integer(*n)),
            (Value::Float(n), None) => Ok(Value::Integer(n.round_ties_even() as i64)),
            (Value::Float(n), Some(d)) => {
                let rounded = Decimal::from_f64(*n)
                    .map(|dec| dec.round_dp(d.clamp(0, 28) as u32))
                    .and_then(|dec| dec.to_f64())
                    .unwrap_or(*n);
                Ok(Value::Float(rounded))
            }
            (other, _) => Err(EvalError::TypeError(format!(
                "round() requires number, got {}",
                other.type_name()
            ))),
        }
    }

    fn function_sum(&self, args: &[Value]) -> Result<Value, EvalError> {
        arity("sum", args, 1, 1)?;
        let mut total = Value::Integer(0);
        for item in expect_array("sum", &args[0])? {
            if item.as_float().is_none() {
                return Err(EvalError::TypeError(format!(
                    "sum() requires numeric values, got {}",
                    item.type_name()
                )));
            }
            total = self.arithmetic(BinOp::Add, &total, item)?;
        }
        Ok(total)
    }

    /// min()/max() over one array argument or over several arguments.
    fn function_extreme(&self, name: &str, args: &[Value], wanted: Ordering) -> Result<Value, EvalError> {
        let items = match args {
            [] => return Err(EvalError::TypeError(format!("{}() expects at least 1 argument", name))),
            [single] => expect_array(name, single)?,
            many => many,
        };

        let mut best: Option<&Value> = None;
        for item in items {
            best = match best {
                None => Some(item),
                Some(current) => {
                    let ordering = item.compare(current).ok_or_else(|| {
                        EvalError::TypeError(format!(
                            "{}() cannot compare {} and {}",
                            name,
                            item.type_name(),
                            current.type_name()
                        ))
                    })?;
                    Some(if ordering == wanted { item } else { current })
                }
            };
        }
        Ok(best.cloned().unwrap_or(Value::Null))
    }

    /// Dispatch method calls to their implementations
    fn eval_method_call(
        &self,
        object: &Value,
        method: &str,
        args: &[Value],
        kwargs: &[(String, Value)],
    ) -> Result<Value, EvalError> {
        match method {
            // Object methods
            "get" => self.method_get(object, args, kwargs),
            "keys" => self.method_keys(object),
            "values" => self.method_values(object),
            "items" => self.method_items(object),
            "update" => self.method_update(object, args),
            // String methods
            "lower" => Ok(Value::String(expect_string(method, object)?.to_lowercase())),
            "upper" => Ok(Value::String(expect_string(method, object)?.to_uppercase())),
            "strip" => self.method_strip(object, args),
            "split" => self.method_split(object, args),
            "startswith" | "endswith" => {
                let s = expect_string(method, object)?;
                arity(method, args, 1, 1)?;
                let affix = expect_string(method, &args[0])?;
                Ok(Value::Boolean(if method == "startswith" {
                    s.starts_with(affix)
                } else {
                    s.ends_with(affix)
                }))
            }
            _ => Err(EvalError::UnknownMethod(method.to_string())),
        }
    }

    /// .get(key, default=None) on objects, .get(index) on arrays
    fn method_get(
        &self,
        object: &Value,
        args: &[Value],
        kwargs: &[(String, Value)],
    ) -> Result<Value, EvalError> {
        arity("get", args, 1, 2)?;
        let default = args
            .get(1)
            .or_else(|| kwargs.iter().find(|(k, _)| k == "default").map(|(_, v)| v))
            .cloned()
            .unwrap_or(Value::Null);
        let found = match object {
            Value::Object(map) => map.get(&args[0].as_string()).cloned(),
            Value::Array(_) => match self.apply_access(object, &args[0])? {
                Value::Null => None,
                found => Some(found),
            },
            other => {
                return Err(EvalError::TypeError(format!(
                    ".get() requires object or array, got {}",
                    other.type_name()
                )));
            }
        };
        Ok(found.unwrap_or(default))
    }

    fn method_keys(&self, object: &Value) -> Result<Value, EvalError> {
        let map = expect_object("keys", object)?;
        Ok(Value::Array(
            sorted_entries(map)
                .into_iter()
                .map(|(k, _)| Value::String(k.clone()))
                .collect(),
        ))
    }

    fn method_values(&self, object: &Value) -> Result<Value, EvalError> {
        let map = expect_object("values", object)?;
        Ok(Value::Array(
            sorted_entries(map).into_iter().map(|(_, v)| v.clone()).collect(),
        ))
    }

    fn method_items(&self, object: &Value) -> Result<Value, EvalError> {
        let map = expect_object("items", object)?;
        Ok(Value::Array(
            sorted_entries(map)
                .into_iter()
                .map(|(k, v)| Value::Array(vec![Value::String(k.clone()), v.clone()]))
                .collect(),
        ))
    }

    /// .update(other) returns a copy with the fields of `other` merged in
    fn method_update(&self, object: &Value, args: &[Value]) -> Result<Value, EvalError> {
        arity("update", args, 1, 1)?;
        let mut merged = expect_object("update", object)?.clone();
        for (k, v) in expect_object("update", &args[0])? {
            merged.insert(k.clone(), v.clone());
        }
        Ok(Value::Object(merged))
    }

    fn method_strip(&self, object: &Value, args: &[Value]) -> Result<Value, EvalError> {
        let s = expect_string("strip", object)?;
        arity("strip", args, 0, 1)?;
        let stripped = match args.first() {
            Some(chars) => {
                let chars = expect_string("strip", chars)?;
                s.trim_matches(|c: char| chars.contains(c))
            }
            None => s.trim(),
        };
        Ok(Value::String(stripped.to_string()))
    }

    fn method_split(&self, object: &Value, args: &[Value]) -> Result<Value, EvalError> {
        let s = expect_string("split", object)?;
        arity("split", args, 0, 1)?;
        let parts: Vec<Value> = match args.first() {
            None => s.split_whitespace().map(|p| Value::String(p.to_string())).collect(),
            Some(delim) => {
                let delim = expect_string("split", delim)?;
                if delim.is_empty() {
                    return Err(EvalError::TypeError(".split() separator is empty".into()));
                }
                s.split(delim).map(|p| Value::String(p.to_string())).collect()
            }
        };
        Ok(Value::Array(parts))
    }
}

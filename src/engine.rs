//! Stage engine: runs a compiled [`Pipeline`] over a stream of records.
//!
//! Every stage turns one lazy record stream into another. `sorted`, `last`
//! and `reduce_list` need the whole input before yielding anything; all
//! other stages stream.
//!
//! | stage | behaviour |
//! |---|---|
//! | `map` | replace each record with `callable(record)` |
//! | `filter` | keep records whose `callable(record)` is truthy |
//! | `update` | merge the object returned by the callable into the record |
//! | `hide` | remove the listed keys from each record |
//! | `sorted` | sort by `callable(record)`, keyword `reverse` |
//! | `unique` | drop records whose key was already seen |
//! | `first` / `last` | first or last N records, default 1 |
//! | `islice` | `(stop)`, `(start, stop)` or `(start, stop, step)` |
//! | `reduce_list` | collect the stream into one array |
//! | `yield_all` | flatten arrays returned by the callable |

use std::collections::{HashSet, VecDeque};

use log::debug;

use crate::{
    ast::{Callable, Invocation, Pipeline, Stage},
    evaluator::{EvalError, Evaluator, sort_keyed},
    output::to_json,
    value::Value,
};

/// A lazy stream of records; evaluation errors travel inside the stream.
pub type Records<'a> = Box<dyn Iterator<Item = Result<Value, EvalError>> + 'a>;

#[derive(Debug, Default, Clone, Copy)]
pub struct Engine {
    evaluator: Evaluator,
}

fn fail<'a>(err: EvalError) -> Records<'a> {
    Box::new(std::iter::once(Err(err)))
}

fn invalid(stage: &str, message: impl Into<String>) -> EvalError {
    EvalError::InvalidArgument {
        stage: stage.to_string(),
        message: message.into(),
    }
}

/// Non-negative count parameter.
fn count(stage: &str, value: &Value) -> Result<usize, EvalError> {
    match value.as_int() {
        Some(n) if n >= 0 => Ok(n as usize),
        _ => Err(invalid(
            stage,
            format!("expected a non-negative count, got {}", value.as_string()),
        )),
    }
}

/// Collects a stream, stopping at the first error.
fn buffer(records: Records<'_>) -> Result<Vec<Value>, EvalError> {
    records.collect()
}

/// Runs a whole-stream computation once the first record is requested.
fn deferred<'a, F>(compute: F) -> Records<'a>
where
    F: FnOnce() -> Result<Vec<Value>, EvalError> + 'a,
{
    let mut compute = Some(compute);
    let mut output: Option<std::vec::IntoIter<Value>> = None;
    Box::new(std::iter::from_fn(move || {
        if let Some(compute) = compute.take() {
            match compute() {
                Ok(values) => output = Some(values.into_iter()),
                Err(err) => return Some(Err(err)),
            }
        }
        output.as_mut()?.next().map(Ok)
    }))
}

impl Engine {
    pub fn new() -> Self {
        Engine::default()
    }

    /// Runs every stage of `pipeline` over `input`, in order.
    ///
    /// # Examples
    ///
    /// ```
    /// use jf_lang::{Engine, Value, compile};
    ///
    /// let pipeline = compile("filter(x > 1), first(2)").unwrap();
    /// let input = (0..5).map(Value::Integer);
    /// let output: Result<Vec<Value>, _> = Engine::new().run(&pipeline, input).collect();
    /// assert_eq!(output.unwrap(), vec![Value::Integer(2), Value::Integer(3)]);
    /// ```
    pub fn run<'a, I>(&self, pipeline: &Pipeline, input: I) -> Records<'a>
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: 'a,
    {
        let mut records: Records<'a> = Box::new(input.into_iter().map(Ok));
        for stage in &pipeline.stages {
            records = self.apply(stage, records);
        }
        records
    }

    fn apply<'a>(&self, stage: &Stage, records: Records<'a>) -> Records<'a> {
        let passthrough = Invocation {
            callable: Callable::Passthrough,
            kwargs: vec![],
        };
        let (name, invocation) = match stage {
            Stage::Reference(name) => (name.as_str(), &passthrough),
            Stage::Call(call) => {
                if !call.trailers.is_empty() {
                    return fail(EvalError::UnsupportedTrailer(call.name.clone()));
                }
                (call.name.as_str(), &call.invocation)
            }
        };

        debug!("stage {}: {}", name, invocation);
        match self.build(name, invocation, records) {
            Ok(records) => records,
            Err(err) => fail(err),
        }
    }

    fn build<'a>(
        &self,
        name: &str,
        invocation: &Invocation,
        records: Records<'a>,
    ) -> Result<Records<'a>, EvalError> {
        for (key, _) in &invocation.kwargs {
            if !(name == "sorted" && key == "reverse") {
                return Err(invalid(name, format!("unexpected keyword argument '{}'", key)));
            }
        }

        let evaluator = self.evaluator;
        let callable = invocation.callable.clone();

        let stream: Records<'a> = match name {
            "map" => Box::new(records.map(move |r| r.and_then(|v| evaluator.call_callable(&callable, &v)))),
            "filter" => Box::new(records.filter_map(move |r| match r {
                Ok(v) => match evaluator.call_callable(&callable, &v) {
                    Ok(keep) if keep.is_truthy() => Some(Ok(v)),
                    Ok(_) => None,
                    Err(e) => Some(Err(e)),
                },
                Err(e) => Some(Err(e)),
            })),
            "update" => Box::new(records.map(move |r| {
                let record = r?;
                let changes = evaluator.call_callable(&callable, &record)?;
                match (record, changes) {
                    (Value::Object(mut base), Value::Object(changes)) => {
                        base.extend(changes);
                        Ok(Value::Object(base))
                    }
                    (record, changes) => Err(EvalError::TypeError(format!(
                        "update() merges an object into an object, got {} and {}",
                        changes.type_name(),
                        record.type_name()
                    ))),
                }
            })),
            "hide" => {
                let keys: Vec<String> = evaluator
                    .params(&callable)?
                    .iter()
                    .map(Value::as_string)
                    .collect();
                Box::new(records.map(move |r| {
                    r.map(|record| match record {
                        Value::Object(mut map) => {
                            for key in &keys {
                                map.remove(key);
                            }
                            Value::Object(map)
                        }
                        other => other,
                    })
                }))
            }
            "sorted" => {
                let reverse = match invocation.kwarg("reverse") {
                    Some(expr) => evaluator.call(expr, &Value::Null)?.is_truthy(),
                    None => false,
                };
                deferred(move || {
                    let mut keyed = Vec::new();
                    for record in buffer(records)? {
                        let key = evaluator.call_callable(&callable, &record)?;
                        keyed.push((key, record));
                    }
                    sort_keyed(&mut keyed, reverse)?;
                    Ok(keyed.into_iter().map(|(_, record)| record).collect())
                })
            }
            "unique" => {
                let mut seen = HashSet::new();
                Box::new(records.filter_map(move |r| match r {
                    Ok(v) => match evaluator.call_callable(&callable, &v) {
                        Ok(key) => seen.insert(to_json(&key)).then_some(Ok(v)),
                        Err(e) => Some(Err(e)),
                    },
                    Err(e) => Some(Err(e)),
                }))
            }
            "first" => {
                let n = self.single_count(name, &callable)?;
                Box::new(records.take(n))
            }
            "last" => {
                let n = self.single_count(name, &callable)?;
                deferred(move || {
                    let mut tail = VecDeque::with_capacity(n);
                    for record in buffer(records)? {
                        if tail.len() == n {
                            tail.pop_front();
                        }
                        if n > 0 {
                            tail.push_back(record);
                        }
                    }
                    Ok(tail.into())
                })
            }
            "islice" => self.islice(&callable, records)?,
            "reduce_list" => deferred(move || Ok(vec![Value::Array(buffer(records)?)])),
            "yield_all" => Box::new(records.flat_map(move |r| {
                let expanded: Vec<Result<Value, EvalError>> =
                    match r.and_then(|v| evaluator.call_callable(&callable, &v)) {
                        Ok(Value::Array(items)) => items.into_iter().map(Ok).collect(),
                        Ok(other) => vec![Ok(other)],
                        Err(e) => vec![Err(e)],
                    };
                expanded
            })),
            _ => return Err(EvalError::UnknownStage(name.to_string())),
        };
        Ok(stream)
    }

    /// Count parameter of `first`/`last`, 1 when omitted.
    fn single_count(&self, stage: &str, callable: &Callable) -> Result<usize, EvalError> {
        match self.evaluator.params(callable)?.as_slice() {
            [] => Ok(1),
            [n] => count(stage, n),
            more => Err(invalid(stage, format!("expected one count, got {}", more.len()))),
        }
    }

    fn islice<'a>(&self, callable: &Callable, records: Records<'a>) -> Result<Records<'a>, EvalError> {
        let params = self.evaluator.params(callable)?;
        let optional = |value: &Value| match value {
            Value::Null => Ok(None),
            other => count("islice", other).map(Some),
        };

        let (start, stop, step) = match params.as_slice() {
            [stop] => (0, optional(stop)?, 1),
            [start, stop] => (optional(start)?.unwrap_or(0), optional(stop)?, 1),
            [start, stop, step] => (
                optional(start)?.unwrap_or(0),
                optional(stop)?,
                optional(step)?.unwrap_or(1),
            ),
            other => {
                return Err(invalid(
                    "islice",
                    format!("expected 1 to 3 arguments, got {}", other.len()),
                ));
            }
        };
        if step == 0 {
            return Err(invalid("islice", "step must be positive"));
        }

        let sliced = records.skip(start).step_by(step);
        let stream: Records<'a> = match stop {
            Some(stop) => Box::new(sliced.take(stop.saturating_sub(start).div_ceil(step))),
            None => Box::new(sliced),
        };
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile;

    fn run(query: &str, input: Vec<Value>) -> Result<Vec<Value>, EvalError> {
        let pipeline = compile(query).unwrap();
        Engine::new().run(&pipeline, input).collect()
    }

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().copied().map(Value::Integer).collect()
    }

    #[test]
    fn test_unique_without_key() {
        assert_eq!(run("unique", ints(&[1, 2, 4, 5, 5, 6, 7])).unwrap(), ints(&[1, 2, 4, 5, 6, 7]));
    }

    #[test]
    fn test_unique_keys_keep_their_type() {
        let input = vec![
            Value::Integer(1),
            Value::String("1".into()),
            Value::Boolean(true),
            Value::String("true".into()),
        ];
        assert_eq!(run("unique", input.clone()).unwrap(), input);
    }

    #[test]
    fn test_last_with_numeric_string() {
        assert_eq!(run("last(\"2\")", ints(&[1, 2, 3])).unwrap(), ints(&[2, 3]));
    }

    #[test]
    fn test_reduce_list() {
        assert_eq!(run("reduce_list", ints(&[1, 2])).unwrap(), vec![Value::Array(ints(&[1, 2]))]);
    }

    #[test]
    fn test_yield_all() {
        let input = vec![Value::Array(ints(&[1, 2])), Value::Array(ints(&[3, 4]))];
        assert_eq!(run("yield_all(x)", input).unwrap(), ints(&[1, 2, 3, 4]));
    }

    #[test]
    fn test_unknown_stage() {
        assert_eq!(
            run("explode(x)", ints(&[1])),
            Err(EvalError::UnknownStage("explode".into()))
        );
    }

    #[test]
    fn test_first_is_lazy() {
        let pipeline = compile("first(2)").unwrap();
        let output: Vec<Value> = Engine::new()
            .run(&pipeline, (0..).map(Value::Integer))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(output, ints(&[0, 1]));
    }
}

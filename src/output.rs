//! JSON rendering of pipeline results.
//!
//! Output is deterministic: object keys are sorted, and floats keep a
//! fractional part so `2.0` does not turn into the integer `2`.
//!
//! ```
//! use jf_lang::Value;
//! use jf_lang::output::{to_json, to_json_pretty};
//!
//! let results = Value::Array(vec![Value::Integer(3), Value::Float(1.5)]);
//! assert_eq!(to_json(&results), "[3,1.5]");
//! assert_eq!(to_json_pretty(&results), "[\n  3,\n  1.5\n]");
//! ```

use std::{collections::HashMap, fmt::Write};

use crate::value::Value;

pub struct JsonPrinter {
    pretty: bool,
}

impl JsonPrinter {
    pub fn new(pretty: bool) -> Self {
        JsonPrinter { pretty }
    }

    pub fn print(&self, value: &Value) -> String {
        let mut out = String::new();
        self.write_value(&mut out, value, 0);
        out
    }

    /// Prints a result stream as one JSON array.
    pub fn print_stream(&self, values: &[Value]) -> String {
        let mut out = String::new();
        self.write_array(&mut out, values, 0);
        out
    }

    fn write_value(&self, out: &mut String, value: &Value, indent: usize) {
        match value {
            Value::Null => out.push_str("null"),
            Value::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Integer(n) => {
                let _ = write!(out, "{}", n);
            }
            Value::Float(n) if !n.is_finite() => out.push_str("null"),
            Value::Float(n) if n.fract() == 0.0 && n.abs() < 1e16 => {
                let _ = write!(out, "{:.1}", n);
            }
            Value::Float(n) => {
                let _ = write!(out, "{}", n);
            }
            Value::String(s) => self.write_string(out, s),
            Value::Array(arr) => self.write_array(out, arr, indent),
            Value::Object(obj) => self.write_object(out, obj, indent),
        }
    }

    /// Opens a line for the next item of a container.
    fn item_break(&self, out: &mut String, first: bool, indent: usize) {
        if !first {
            out.push(',');
        }
        if self.pretty {
            out.push('\n');
            out.push_str(&"  ".repeat(indent));
        }
    }

    fn close(&self, out: &mut String, indent: usize, bracket: char) {
        if self.pretty {
            out.push('\n');
            out.push_str(&"  ".repeat(indent));
        }
        out.push(bracket);
    }

    fn write_array(&self, out: &mut String, arr: &[Value], indent: usize) {
        if arr.is_empty() {
            out.push_str("[]");
            return;
        }
        out.push('[');
        for (i, item) in arr.iter().enumerate() {
            self.item_break(out, i == 0, indent + 1);
            self.write_value(out, item, indent + 1);
        }
        self.close(out, indent, ']');
    }

    fn write_object(&self, out: &mut String, obj: &HashMap<String, Value>, indent: usize) {
        if obj.is_empty() {
            out.push_str("{}");
            return;
        }

        let mut entries: Vec<_> = obj.iter().collect();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));

        out.push('{');
        for (i, (key, value)) in entries.into_iter().enumerate() {
            self.item_break(out, i == 0, indent + 1);
            self.write_string(out, key);
            out.push_str(if self.pretty { ": " } else { ":" });
            self.write_value(out, value, indent + 1);
        }
        self.close(out, indent, '}');
    }

    fn write_string(&self, out: &mut String, s: &str) {
        out.push('"');
        for c in s.chars() {
            match c {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c if c.is_control() => {
                    let _ = write!(out, "\\u{:04x}", c as u32);
                }
                c => out.push(c),
            }
        }
        out.push('"');
    }
}

/// Compact JSON for a value.
pub fn to_json(value: &Value) -> String {
    JsonPrinter::new(false).print(value)
}

/// JSON with 2-space indentation.
pub fn to_json_pretty(value: &Value) -> String {
    JsonPrinter::new(true).print(value)
}

//! Arithmetic tools.
//!
//! Arguments are coerced to `f64` leniently (numbers, booleans and numeric
//! strings) and results are rendered in the shortest form that round-trips,
//! switching to exponent notation for very small or very large magnitudes.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::Result;
use crate::mcp::handler::{error_result, success_result, ToolHandler};
use crate::mcp::protocol::{Tool, ToolResult};
use crate::tool_schema;

/// Coerce a JSON value to a float. Missing arguments count as zero.
pub fn coerce_float(value: Option<&Value>) -> std::result::Result<f64, String> {
    match value {
        None => Ok(0.0),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| format!("number {} is out of range", n)),
        Some(Value::Bool(b)) => Ok(if *b { 1.0 } else { 0.0 }),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("could not convert string to float: '{}'", s)),
        Some(Value::Null) => Err(not_a_number("null")),
        Some(Value::Array(_)) => Err(not_a_number("an array")),
        Some(Value::Object(_)) => Err(not_a_number("an object")),
    }
}

fn not_a_number(kind: &str) -> String {
    format!("expected a number or numeric string, got {}", kind)
}

/// Render a float: integral values keep a trailing `.0`, magnitudes outside
/// `[1e-4, 1e16)` use a signed two-digit exponent (`1e-05`, `1.5e+20`).
pub fn format_float(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let magnitude = x.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let sci = format!("{:e}", x);
        if let Some((mantissa, exponent)) = sci.split_once('e') {
            if let Ok(exponent) = exponent.parse::<i32>() {
                let sign = if exponent < 0 { '-' } else { '+' };
                return format!("{}e{}{:02}", mantissa, sign, exponent.abs());
            }
        }
        return sci;
    }

    let plain = format!("{}", x);
    if plain.contains('.') {
        plain
    } else {
        format!("{}.0", plain)
    }
}

/// Digit sum of `|a|` as rendered by [`format_float`], scaled by
/// `0.1^(digits after the decimal point)`.
pub fn castellonian(a: f64) -> f64 {
    let rendered = format_float(a.abs());
    let digit_sum: u32 = rendered.chars().filter_map(|c| c.to_digit(10)).sum();
    let places = match rendered.split_once('.') {
        Some((_, fraction)) => fraction.chars().count(),
        None => 0,
    };
    f64::from(digit_sum) * 0.1_f64.powf(places as f64)
}

fn invalid_number(reason: String) -> ToolResult {
    error_result(format!("Error: Invalid number format - {}", reason))
}

fn number_schema(description_a: &str, description_b: &str) -> Value {
    tool_schema!(["a", "b"],
        "a": { "type": "number", "description": description_a },
        "b": { "type": "number", "description": description_b }
    )
}

fn operands(args: &HashMap<String, Value>) -> std::result::Result<(f64, f64), String> {
    Ok((coerce_float(args.get("a"))?, coerce_float(args.get("b"))?))
}

/// Addition tool.
pub struct AddNumbersTool;

#[async_trait]
impl ToolHandler for AddNumbersTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "add_numbers".to_string(),
            description: "Add two floating point numbers together".to_string(),
            input_schema: number_schema("First number to add", "Second number to add"),
        }
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        let (a, b) = match operands(&args) {
            Ok(pair) => pair,
            Err(reason) => return Ok(invalid_number(reason)),
        };
        Ok(success_result(format!(
            "Addition result: {} + {} = {}",
            format_float(a),
            format_float(b),
            format_float(a + b)
        )))
    }
}

/// Multiplication tool.
pub struct MultiplyNumbersTool;

#[async_trait]
impl ToolHandler for MultiplyNumbersTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "multiply_numbers".to_string(),
            description: "Multiply two floating point numbers".to_string(),
            input_schema: number_schema("First number to multiply", "Second number to multiply"),
        }
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        let (a, b) = match operands(&args) {
            Ok(pair) => pair,
            Err(reason) => return Ok(invalid_number(reason)),
        };
        Ok(success_result(format!(
            "Multiplication result: {} × {} = {}",
            format_float(a),
            format_float(b),
            format_float(a * b)
        )))
    }
}

/// Castellonian value tool.
pub struct CastellonianTool;

#[async_trait]
impl ToolHandler for CastellonianTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "castellonian_tool".to_string(),
            description:
                "use this function to calculate the castellonian value of a floating point number"
                    .to_string(),
            input_schema: tool_schema!(["a"],
                "a": {
                    "type": "number",
                    "description": "floating point number to calculate the castellonian value of"
                }
            ),
        }
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        let a = match coerce_float(args.get("a")) {
            Ok(a) => a,
            Err(reason) => return Ok(invalid_number(reason)),
        };
        Ok(success_result(format!(
            "the castellonian of {} is {}",
            format_float(a),
            format_float(castellonian(a))
        )))
    }
}

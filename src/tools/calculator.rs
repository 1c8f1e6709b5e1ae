//! Integer calculator tools.
//!
//! Operands are signed 64-bit integers. Overflow and division by zero are
//! argument errors rather than wrapped or infinite results.

use schemars::JsonSchema;
use serde::Deserialize;

use crate::error::{Result, ToolError};
use crate::tool::{Tool, ToolBuilder};

/// Operands of a binary operation.
#[derive(Debug, Clone, Copy, Deserialize, JsonSchema)]
pub struct BinaryInput {
    /// Left operand
    pub a: i64,
    /// Right operand
    pub b: i64,
}

/// Operand of a unary operation.
#[derive(Debug, Clone, Copy, Deserialize, JsonSchema)]
pub struct UnaryInput {
    /// Operand
    pub a: i64,
}

pub fn add(a: i64, b: i64) -> std::result::Result<i64, ToolError> {
    a.checked_add(b).ok_or_else(|| overflow("add", a, b))
}

pub fn subtract(a: i64, b: i64) -> std::result::Result<i64, ToolError> {
    a.checked_sub(b).ok_or_else(|| overflow("subtract", a, b))
}

pub fn multiply(a: i64, b: i64) -> std::result::Result<i64, ToolError> {
    a.checked_mul(b).ok_or_else(|| overflow("multiply", a, b))
}

/// True division.
pub fn divide(a: i64, b: i64) -> std::result::Result<f64, ToolError> {
    if b == 0 {
        return Err(ToolError::invalid_argument("division by zero"));
    }
    Ok(a as f64 / b as f64)
}

pub fn square(a: i64) -> std::result::Result<i64, ToolError> {
    a.checked_mul(a).ok_or_else(|| overflow("square", a, a))
}

fn overflow(op: &str, a: i64, b: i64) -> ToolError {
    ToolError::invalid_argument(format!("{} overflows for operands {} and {}", op, a, b))
}

/// Build all calculator tools.
pub fn tools() -> Result<Vec<Tool>> {
    Ok(vec![
        ToolBuilder::new("add")
            .description("Add two numbers")
            .handler(|i: BinaryInput| async move { add(i.a, i.b) })
            .build()?,
        ToolBuilder::new("subtract")
            .description("Subtract two numbers")
            .handler(|i: BinaryInput| async move { subtract(i.a, i.b) })
            .build()?,
        ToolBuilder::new("multiply")
            .description("Multiply two numbers")
            .handler(|i: BinaryInput| async move { multiply(i.a, i.b) })
            .build()?,
        ToolBuilder::new("divide")
            .description("Divide two numbers")
            .handler(|i: BinaryInput| async move { divide(i.a, i.b) })
            .build()?,
        ToolBuilder::new("square")
            .description("Square a number")
            .handler(|i: UnaryInput| async move { square(i.a) })
            .build()?,
    ])
}

//! Integer arithmetic tools
//!
//! `add`, `subtract`, `multiply` and `divide` over signed 64-bit integers,
//! each taking `{"a": int, "b": int}`. Integer division truncates toward zero.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{int_arg, DynTool, Tool, ToolDefinition, ToolParameter};
use crate::error::ToolError;

/// What `divide` does when the divisor is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DivisionByZeroPolicy {
    /// Return 0 as the result
    #[default]
    Sentinel,
    /// Report `ToolError::DivisionByZero` back to the model
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl ArithmeticOp {
    pub const ALL: [ArithmeticOp; 4] = [Self::Add, Self::Subtract, Self::Multiply, Self::Divide];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::Add => "Adds two integers and returns the sum.",
            Self::Subtract => "Subtracts the second integer from the first and returns the difference.",
            Self::Multiply => "Multiplies two integers and returns the product.",
            Self::Divide => "Divides the first integer by the second and returns the integer quotient.",
        }
    }

    pub fn apply(&self, a: i64, b: i64, policy: DivisionByZeroPolicy) -> Result<i64, ToolError> {
        let result = match self {
            Self::Add => a.checked_add(b),
            Self::Subtract => a.checked_sub(b),
            Self::Multiply => a.checked_mul(b),
            Self::Divide if b == 0 => {
                return match policy {
                    DivisionByZeroPolicy::Sentinel => Ok(0),
                    DivisionByZeroPolicy::Error => Err(ToolError::DivisionByZero),
                }
            }
            Self::Divide => a.checked_div(b),
        };
        result.ok_or_else(|| ToolError::Overflow(self.name().to_string()))
    }
}

/// One arithmetic operation exposed as a tool.
#[derive(Debug, Clone)]
pub struct ArithmeticTool {
    op: ArithmeticOp,
    policy: DivisionByZeroPolicy,
}

impl ArithmeticTool {
    pub fn new(op: ArithmeticOp, policy: DivisionByZeroPolicy) -> Self {
        Self { op, policy }
    }
}

impl Tool for ArithmeticTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            self.op.name(),
            self.op.description(),
            &[
                ToolParameter::integer("a", "The first integer"),
                ToolParameter::integer("b", "The second integer"),
            ],
        )
    }

    fn invoke(&self, arguments: &Value) -> Result<String, ToolError> {
        let a = int_arg(arguments, "a")?;
        let b = int_arg(arguments, "b")?;
        Ok(self.op.apply(a, b, self.policy)?.to_string())
    }

    fn name(&self) -> String {
        self.op.name().to_string()
    }
}

/// The four arithmetic tools with the given division policy.
pub fn math_tools(policy: DivisionByZeroPolicy) -> Vec<DynTool> {
    ArithmeticOp::ALL
        .iter()
        .map(|op| Arc::new(ArithmeticTool::new(*op, policy)) as DynTool)
        .collect()
}

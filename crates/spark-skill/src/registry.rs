// SPDX-FileCopyrightText: 2026 Spark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Name-keyed tool registry with schema-validated dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use jsonschema::Validator;
use serde_json::{Map, Number, Value};
use spark_core::{SparkError, ToolDeclaration};
use tracing::{debug, warn};

use crate::tool::{Tool, ToolResult};

struct RegisteredTool {
    tool: Arc<dyn Tool>,
    validator: Validator,
}

/// Registry of available tools, indexed by name.
///
/// Built once at startup and shared read-only between requests.
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
}

impl ToolRegistry {
    /// Creates an empty tool registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registers a tool under its `name()`.
    ///
    /// Fails if the name is taken or the parameter schema does not compile.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), SparkError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(SparkError::DuplicateTool { name });
        }
        let schema = tool.parameters_schema();
        let validator = jsonschema::validator_for(&schema).map_err(|e| {
            SparkError::Config(format!("tool `{name}` has an invalid parameter schema: {e}"))
        })?;
        debug!(tool = %name, "tool registered");
        self.tools.insert(name, RegisteredTool { tool, validator });
        Ok(())
    }

    /// Validates and runs a tool call requested by the model.
    ///
    /// Unknown names and schema violations are returned as errors and the
    /// tool is never invoked. Once invoked, any failure of the tool itself is
    /// folded into [`ToolResult::Failure`].
    pub async fn dispatch(&self, name: &str, args: Value) -> Result<ToolResult, SparkError> {
        let registered = self
            .tools
            .get(name)
            .ok_or_else(|| SparkError::UnknownTool {
                name: name.to_string(),
            })?;

        let args = normalize_args(args);
        let violations: Vec<String> = registered
            .validator
            .iter_errors(&args)
            .map(|e| {
                let path = e.instance_path.to_string();
                if path.is_empty() {
                    e.to_string()
                } else {
                    format!("{path}: {e}")
                }
            })
            .collect();
        if !violations.is_empty() {
            return Err(SparkError::InvalidArguments {
                tool: name.to_string(),
                message: violations.join("; "),
            });
        }

        match registered.tool.invoke(args).await {
            Ok(payload) => Ok(ToolResult::Success(payload)),
            Err(e) => {
                warn!(tool = name, error = %e, "tool execution failed");
                let message = match e {
                    SparkError::ToolExecution { message, .. } => message,
                    other => other.to_string(),
                };
                Ok(ToolResult::Failure { message })
            }
        }
    }

    /// Declarations for every registered tool, sorted by name.
    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        let mut decls: Vec<ToolDeclaration> = self
            .tools
            .values()
            .map(|r| ToolDeclaration {
                name: r.tool.name().to_string(),
                description: r.tool.description().to_string(),
                parameters: r.tool.parameters_schema(),
            })
            .collect();
        decls.sort_by(|a, b| a.name.cmp(&b.name));
        decls
    }

    /// Returns the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns true if no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Absent arguments become `{}`, and whole floats become integers, since
/// model APIs commonly encode every number as a double.
fn normalize_args(args: Value) -> Value {
    match args {
        Value::Null => Value::Object(Map::new()),
        other => normalize_numbers(other),
    }
}

fn normalize_numbers(value: Value) -> Value {
    match value {
        Value::Number(n) if n.is_f64() => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Value::Number(Number::from(f as i64)),
            _ => Value::Number(n),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_numbers).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, normalize_numbers(v)))
                .collect(),
        ),
        other => other,
    }
}

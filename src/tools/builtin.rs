//! Built-in demonstration tools.
//!
//! Provides `echo_tool`, `math_calculator` and `memory_tool`. They are useful
//! for exercising the registry end to end and as templates for custom tools.
//!
//! ```rust,no_run
//! use skiff::tools::{builtin::register_builtin_tools, ToolRegistry};
//!
//! let mut registry = ToolRegistry::new();
//! register_builtin_tools(&mut registry).unwrap();
//! assert_eq!(registry.len(), 3);
//! ```

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Mutex;

use crate::error::{Result, SkiffError};
use crate::tools::arguments::ToolArguments;
use crate::tools::registry::ToolRegistry;
use crate::tools::result::{ConfirmationDetails, ToolResult};
use crate::tools::tool::{Tool, ToolExecutionContext};
use crate::tools::types::ToolParameters;

const MAX_REPEAT: i64 = 5;
const MAX_EXPRESSION_LEN: usize = 4096;
const MAX_NESTING: usize = 256;

/// Echoes a message back, optionally numbered and repeated up to five times.
pub struct EchoTool {
    parameters: ToolParameters,
}

impl EchoTool {
    pub fn new() -> Self {
        Self {
            parameters: ToolParameters::object()
                .string("message", "The message to echo back", true)
                .integer(
                    "repeat_count",
                    "Number of times to repeat the message (default: 1, max: 5)",
                    false,
                )
                .build(),
        }
    }
}

impl Default for EchoTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo_tool"
    }

    fn display_name(&self) -> &str {
        "Echo Tool"
    }

    fn description(&self) -> &str {
        "Echoes back the provided message. Useful for testing and debugging."
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    fn is_output_markdown(&self) -> bool {
        true
    }

    fn describe(&self, args: &ToolArguments) -> String {
        let message = args.get_str_opt("message").unwrap_or("unknown");
        match args.get_i64_opt("repeat_count").unwrap_or(1) {
            1 => format!("Echoing message: '{message}'"),
            n => format!("Echoing message '{message}' {n} times"),
        }
    }

    async fn execute(&self, args: &ToolArguments, ctx: &ToolExecutionContext) -> Result<ToolResult> {
        let message = args.get_str("message")?;
        let repeat = args.get_i64_opt("repeat_count").unwrap_or(1);
        if !(1..=MAX_REPEAT).contains(&repeat) {
            return Err(SkiffError::InvalidArgument(format!(
                "repeat_count must be an integer between 1 and {MAX_REPEAT}, got {repeat}"
            )));
        }

        ctx.progress.report(format!("Echoing: {message}"));

        let echoed = if repeat == 1 {
            message.to_string()
        } else {
            (1..=repeat)
                .map(|i| format!("{i}. {message}"))
                .collect::<Vec<_>>()
                .join("\n")
        };

        Ok(ToolResult::new(
            json!(format!("Echoed: {echoed}")),
            format!("**Echo Output:**\n\n{echoed}"),
        ))
    }
}

/// Evaluates arithmetic expressions: `+ - * / % **`, unary minus, parentheses.
pub struct MathCalculatorTool {
    parameters: ToolParameters,
}

impl MathCalculatorTool {
    pub fn new() -> Self {
        Self {
            parameters: ToolParameters::object()
                .string(
                    "expression",
                    "The mathematical expression to evaluate (e.g., '2 + 3 * 4', '(10 + 5) / 3')",
                    true,
                )
                .build(),
        }
    }
}

impl Default for MathCalculatorTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for MathCalculatorTool {
    fn name(&self) -> &str {
        "math_calculator"
    }

    fn display_name(&self) -> &str {
        "Math Calculator"
    }

    fn description(&self) -> &str {
        "Calculates the result of mathematical expressions. Supports basic arithmetic operations (+, -, *, /, **, %, parentheses)."
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    fn describe(&self, args: &ToolArguments) -> String {
        format!(
            "Calculating the result of: {}",
            args.get_str_opt("expression").unwrap_or("unknown")
        )
    }

    async fn execute(&self, args: &ToolArguments, ctx: &ToolExecutionContext) -> Result<ToolResult> {
        let expression = args.get_str("expression")?.trim();
        if expression.is_empty() {
            return Err(SkiffError::InvalidArgument(
                "Expression cannot be empty".into(),
            ));
        }

        ctx.progress.report(format!("Calculating: {expression}"));

        let value = evaluate(expression).map_err(|reason| {
            let shown: String = expression.chars().take(80).collect();
            let ellipsis = if shown.len() < expression.len() { "..." } else { "" };
            SkiffError::tool_execution(
                self.name(),
                format!("Error calculating '{shown}{ellipsis}': {reason}"),
            )
        })?;
        let rendered = format_number(value);

        Ok(ToolResult::new(
            json!(format!("The result of {expression} is {rendered}")),
            format!("**Calculation Result:**\n\n`{expression} = {rendered}`"),
        ))
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

/// Evaluate an arithmetic expression.
pub fn evaluate(expression: &str) -> std::result::Result<f64, String> {
    if expression.len() > MAX_EXPRESSION_LEN {
        return Err(format!(
            "expression longer than {MAX_EXPRESSION_LEN} characters"
        ));
    }
    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if let Some(token) = parser.peek() {
        return Err(format!("unexpected token '{token}'"));
    }
    if !value.is_finite() {
        return Err("result is not a finite number".into());
    }
    Ok(value)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Plus,
    Minus,
    Star,
    Pow,
    Slash,
    Percent,
    LParen,
    RParen,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Num(n) => write!(f, "{n}"),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::Star => f.write_str("*"),
            Token::Pow => f.write_str("**"),
            Token::Slash => f.write_str("/"),
            Token::Percent => f.write_str("%"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
        }
    }
}

fn tokenize(input: &str) -> std::result::Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();
    while let Some(&(start, c)) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' => {
                chars.next();
            }
            '0'..='9' | '.' => {
                let end = number_end(input.as_bytes(), start);
                while matches!(chars.peek(), Some(&(i, _)) if i < end) {
                    chars.next();
                }
                let literal = &input[start..end];
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| format!("invalid number '{literal}'"))?;
                tokens.push(Token::Num(value));
            }
            '*' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, '*'))) {
                    chars.next();
                    tokens.push(Token::Pow);
                } else {
                    tokens.push(Token::Star);
                }
            }
            _ => {
                chars.next();
                tokens.push(match c {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '/' => Token::Slash,
                    '%' => Token::Percent,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    other => return Err(format!("unsupported character '{other}'")),
                });
            }
        }
    }
    Ok(tokens)
}

// digits and dots, then an optional exponent such as `e-3`
fn number_end(bytes: &[u8], start: usize) -> usize {
    let mut end = start;
    while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'.') {
        end += 1;
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp = end + 1;
        if exp < bytes.len() && matches!(bytes[exp], b'+' | b'-') {
            exp += 1;
        }
        if exp < bytes.len() && bytes[exp].is_ascii_digit() {
            while exp < bytes.len() && bytes[exp].is_ascii_digit() {
                exp += 1;
            }
            end = exp;
        }
    }
    end
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

// expr   := term (('+' | '-') term)*
// term   := unary (('*' | '/' | '%') unary)*
// unary  := '-' unary | '+' unary | power
// power  := atom ('**' unary)?
// atom   := number | '(' expr ')'
impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    /// Run `f` one nesting level deeper, failing past [`MAX_NESTING`].
    fn nested(
        &mut self,
        f: impl FnOnce(&mut Self) -> std::result::Result<f64, String>,
    ) -> std::result::Result<f64, String> {
        if self.depth >= MAX_NESTING {
            return Err("expression nested too deeply".into());
        }
        self.depth += 1;
        let value = f(self);
        self.depth -= 1;
        value
    }

    fn expr(&mut self) -> std::result::Result<f64, String> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    value += self.term()?;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> std::result::Result<f64, String> {
        let mut value = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    value *= self.unary()?;
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    let rhs = self.unary()?;
                    if rhs == 0.0 {
                        return Err("division by zero".into());
                    }
                    value /= rhs;
                }
                Some(Token::Percent) => {
                    self.pos += 1;
                    let rhs = self.unary()?;
                    if rhs == 0.0 {
                        return Err("modulo by zero".into());
                    }
                    // floored, so the result takes the divisor's sign
                    value -= rhs * (value / rhs).floor();
                }
                _ => return Ok(value),
            }
        }
    }

    fn unary(&mut self) -> std::result::Result<f64, String> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                self.nested(|p| Ok(-p.unary()?))
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.nested(Self::unary)
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> std::result::Result<f64, String> {
        let base = self.atom()?;
        if matches!(self.peek(), Some(Token::Pow)) {
            self.pos += 1;
            let exponent = self.nested(Self::unary)?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn atom(&mut self) -> std::result::Result<f64, String> {
        match self.next() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.nested(Self::expr)?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err("missing closing parenthesis".into()),
                }
            }
            Some(token) => Err(format!("unexpected token '{token}'")),
            None => Err("unexpected end of expression".into()),
        }
    }
}

/// Key/value memory that lives as long as the tool.
///
/// Clearing everything asks for confirmation first.
pub struct MemoryTool {
    parameters: ToolParameters,
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryTool {
    pub fn new() -> Self {
        Self {
            parameters: ToolParameters::object()
                .string_enum(
                    "action",
                    "The action to perform: store new info, retrieve existing info, update existing info, or clear all memory",
                    &["store", "retrieve", "update", "clear"],
                    true,
                )
                .string(
                    "key",
                    "The key/identifier for the memory item (required for store, retrieve, update)",
                    false,
                )
                .string(
                    "value",
                    "The value to store or update (required for store and update actions)",
                    false,
                )
                .build(),
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    fn required<'a>(args: &'a ToolArguments, action: &str, field: &str) -> Result<&'a str> {
        args.get_str_opt(field).ok_or_else(|| {
            SkiffError::InvalidArgument(format!("Action '{action}' requires a '{field}' parameter"))
        })
    }
}

impl Default for MemoryTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for MemoryTool {
    fn name(&self) -> &str {
        "memory_tool"
    }

    fn display_name(&self) -> &str {
        "Memory Tool"
    }

    fn description(&self) -> &str {
        "Manages user memory and context. Can store, retrieve, or update information that should be remembered across conversations."
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    fn is_output_markdown(&self) -> bool {
        true
    }

    fn describe(&self, args: &ToolArguments) -> String {
        let key = args.get_str_opt("key").unwrap_or_default();
        let preview: String = args
            .get_str_opt("value")
            .unwrap_or_default()
            .chars()
            .take(50)
            .collect();
        match args.get_str_opt("action").unwrap_or("unknown") {
            "store" => format!("Storing memory item '{key}': {preview}"),
            "retrieve" => format!("Retrieving memory item '{key}'"),
            "update" => format!("Updating memory item '{key}': {preview}"),
            "clear" => "Clearing all memory".to_string(),
            other => format!("Performing memory action: {other}"),
        }
    }

    fn should_confirm(&self, args: &ToolArguments) -> Option<ConfirmationDetails> {
        (args.get_str_opt("action") == Some("clear")).then(|| ConfirmationDetails {
            title: "Confirm Memory Clear".to_string(),
            description: self.describe(args),
            tool_name: self.name().to_string(),
            params: args.raw().clone(),
        })
    }

    async fn execute(&self, args: &ToolArguments, ctx: &ToolExecutionContext) -> Result<ToolResult> {
        let action = args.get_str("action")?;
        ctx.progress.report(format!("Memory operation: {action}"));

        let mut entries = self.entries.lock().await;
        let result = match action {
            "store" => {
                let key = Self::required(args, action, "key")?;
                let value = Self::required(args, action, "value")?;
                entries.insert(key.to_string(), value.to_string());
                ToolResult::new(
                    json!(format!("Stored memory item '{key}'")),
                    format!("**Memory Stored:**\n\n- **Key:** {key}\n- **Value:** {value}"),
                )
            }
            "retrieve" => {
                let key = Self::required(args, action, "key")?;
                match entries.get(key) {
                    Some(value) => ToolResult::new(
                        json!(format!("Retrieved memory item '{key}': {value}")),
                        format!("**Memory Retrieved:**\n\n- **Key:** {key}\n- **Value:** {value}"),
                    ),
                    None => ToolResult::new(
                        json!(format!("Memory item '{key}' not found")),
                        format!("**Memory Not Found:**\n\nNo memory item found with key '{key}'"),
                    ),
                }
            }
            "update" => {
                let key = Self::required(args, action, "key")?;
                let value = Self::required(args, action, "value")?;
                match entries.insert(key.to_string(), value.to_string()) {
                    Some(old) => ToolResult::new(
                        json!(format!("Updated memory item '{key}' from '{old}' to '{value}'")),
                        format!(
                            "**Memory Updated:**\n\n- **Key:** {key}\n- **Old Value:** {old}\n- **New Value:** {value}"
                        ),
                    ),
                    None => ToolResult::new(
                        json!(format!("Memory item '{key}' didn't exist, stored as new item")),
                        format!("**Memory Created:**\n\n- **Key:** {key}\n- **Value:** {value}"),
                    ),
                }
            }
            "clear" => {
                let cleared = entries.len();
                entries.clear();
                ToolResult::new(
                    json!(format!("Cleared all memory ({cleared} items)")),
                    format!("**Memory Cleared:**\n\nRemoved {cleared} memory items."),
                )
            }
            other => {
                return Err(SkiffError::InvalidArgument(format!(
                    "Invalid action: {other}. Must be one of: store, retrieve, update, clear"
                )))
            }
        };
        Ok(result)
    }
}

/// Register the three built-in tools.
pub fn register_builtin_tools(registry: &mut ToolRegistry) -> Result<()> {
    registry.register(MathCalculatorTool::new())?;
    registry.register(EchoTool::new())?;
    registry.register(MemoryTool::new())?;
    Ok(())
}

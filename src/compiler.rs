//! Expression Compiler: Text → Bytecode
//!
//! Compiles one shell line such as `x = (1/3 + 0.25) ^ 2` into bytecode for
//! the [`Evaluator`](crate::evaluator::Evaluator).
//!
//! Precedence, lowest first: `+ -`, `* / // %`, unary `+ -`, `^` / `**`.
//! Power is right associative and binds tighter than a unary minus on its
//! left, so `-2^2` is `-4`.

use crate::bytecode::{write_big_int_signed, write_big_int_unsigned, write_i32, write_u16, Func, Op};
use crate::error::{Error, Result};
use crate::fraction::Fraction;
use crate::to_js_error;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;
use wasm_bindgen::prelude::*;

/// Nesting limit for parentheses, unary operators and powers
const MAX_DEPTH: usize = 256;

/// Name holding the previous result in a session
pub const LAST_RESULT: &str = "_";

/// Compiled expression result
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompiledExpression {
    /// The compiled bytecode
    pub bytecode: Vec<u8>,
    /// Variable names; `LoadVar` operands index into this table
    pub names: Vec<String>,
    /// Assignment target for `name = expr` lines
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Source line as given
    #[serde(rename = "sourceText")]
    pub source_text: String,
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Number(String),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    SlashSlash,
    Percent,
    Caret,
    LParen,
    RParen,
    Assign,
    End,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    offset: usize,
}

fn tokenize(source: &str) -> Result<Vec<Token>> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let start = i;
        let kind = match c {
            b' ' | b'\t' | b'\r' | b'\n' => {
                i += 1;
                continue;
            }
            b'0'..=b'9' | b'.' => {
                i = scan_number(bytes, i);
                TokenKind::Number(source[start..i].to_string())
            }
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                TokenKind::Ident(source[start..i].to_string())
            }
            b'+' => {
                i += 1;
                TokenKind::Plus
            }
            b'-' => {
                i += 1;
                TokenKind::Minus
            }
            b'*' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                TokenKind::Caret
            }
            b'*' => {
                i += 1;
                TokenKind::Star
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                i += 2;
                TokenKind::SlashSlash
            }
            b'/' => {
                i += 1;
                TokenKind::Slash
            }
            b'%' => {
                i += 1;
                TokenKind::Percent
            }
            b'^' => {
                i += 1;
                TokenKind::Caret
            }
            b'(' => {
                i += 1;
                TokenKind::LParen
            }
            b')' => {
                i += 1;
                TokenKind::RParen
            }
            b'=' => {
                i += 1;
                TokenKind::Assign
            }
            _ => {
                let ch = source[start..].chars().next().unwrap_or('?');
                return Err(Error::syntax(start, format!("unexpected character '{}'", ch)));
            }
        };
        tokens.push(Token { kind, offset: start });
    }

    tokens.push(Token {
        kind: TokenKind::End,
        offset: source.len(),
    });
    Ok(tokens)
}

// digits [. digits] [(e|E) [+-] digits]
fn scan_number(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
        i += 1;
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        if j < bytes.len() && bytes[j].is_ascii_digit() {
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            i = j;
        }
    }
    i
}

/// Expression compiler
#[wasm_bindgen]
pub struct ExpressionCompiler {
    // Internal state for compilation
    bytecode: Vec<u8>,
    names: Vec<String>,
    name_index: HashMap<String, u16>,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

#[wasm_bindgen]
impl ExpressionCompiler {
    /// Create a new compiler
    #[wasm_bindgen(constructor)]
    pub fn new() -> ExpressionCompiler {
        ExpressionCompiler {
            bytecode: Vec::new(),
            names: Vec::new(),
            name_index: HashMap::new(),
            tokens: Vec::new(),
            pos: 0,
            depth: 0,
        }
    }

    /// Compile a text expression from JavaScript
    #[wasm_bindgen(js_name = compile)]
    pub fn compile_js(&mut self, text_expr: &str) -> std::result::Result<JsValue, JsValue> {
        let result = self.compile(text_expr).map_err(to_js_error)?;
        serde_wasm_bindgen::to_value(&result).map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

impl Default for ExpressionCompiler {
    fn default() -> Self {
        ExpressionCompiler::new()
    }
}

impl ExpressionCompiler {
    /// Compile a line: either `expr` or `name = expr`
    pub fn compile(&mut self, text_expr: &str) -> Result<CompiledExpression> {
        // Reset state
        self.bytecode.clear();
        self.names.clear();
        self.name_index.clear();
        self.pos = 0;
        self.depth = 0;
        self.tokens = tokenize(text_expr)?;

        let target = self.parse_target()?;
        if self.peek() == &TokenKind::End {
            return Err(Error::syntax(self.offset(), "expected an expression"));
        }
        self.parse_sum()?;
        if self.peek() != &TokenKind::End {
            return Err(Error::syntax(self.offset(), "unexpected input after expression"));
        }

        debug!(
            source = text_expr,
            bytes = self.bytecode.len(),
            names = self.names.len(),
            "compiled expression"
        );
        Ok(CompiledExpression {
            bytecode: self.bytecode.clone(),
            names: self.names.clone(),
            target,
            source_text: text_expr.to_string(),
        })
    }

    fn peek(&self) -> &TokenKind {
        // tokenize always ends with End, and End is never consumed
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    fn offset(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].offset
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<()> {
        if self.peek() == &kind {
            self.advance();
            Ok(())
        } else {
            Err(Error::syntax(self.offset(), format!("expected {}", what)))
        }
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(Error::syntax(self.offset(), "expression nested too deeply"));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// `name =` prefix, if any
    fn parse_target(&mut self) -> Result<Option<String>> {
        let name = match (&self.tokens[0].kind, self.tokens.get(1).map(|t| &t.kind)) {
            (TokenKind::Ident(name), Some(TokenKind::Assign)) => name.clone(),
            _ => return Ok(None),
        };
        if name == LAST_RESULT || Func::from_name(&name).is_some() {
            return Err(Error::syntax(0, format!("cannot assign to '{}'", name)));
        }
        self.pos = 2;
        Ok(Some(name))
    }

    /// term (('+' | '-') term)*
    fn parse_sum(&mut self) -> Result<()> {
        self.parse_product()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => Op::Add,
                TokenKind::Minus => Op::Sub,
                _ => return Ok(()),
            };
            self.advance();
            self.parse_product()?;
            self.bytecode.push(op as u8);
        }
    }

    /// unary (('*' | '/' | '//' | '%') unary)*
    fn parse_product(&mut self) -> Result<()> {
        self.parse_unary()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => Op::Mul,
                TokenKind::Slash => Op::Div,
                TokenKind::SlashSlash => Op::FloorDiv,
                TokenKind::Percent => Op::Mod,
                _ => return Ok(()),
            };
            self.advance();
            self.parse_unary()?;
            self.bytecode.push(op as u8);
        }
    }

    fn parse_unary(&mut self) -> Result<()> {
        self.enter()?;
        match self.peek() {
            TokenKind::Minus => {
                self.advance();
                self.parse_unary()?;
                self.bytecode.push(Op::Neg as u8);
            }
            TokenKind::Plus => {
                self.advance();
                self.parse_unary()?;
            }
            _ => self.parse_power()?,
        }
        self.leave();
        Ok(())
    }

    /// atom ('^' unary)?, right associative through parse_unary
    fn parse_power(&mut self) -> Result<()> {
        self.parse_atom()?;
        if self.peek() == &TokenKind::Caret {
            self.advance();
            self.parse_unary()?;
            self.bytecode.push(Op::Pow as u8);
        }
        Ok(())
    }

    fn parse_atom(&mut self) -> Result<()> {
        let offset = self.offset();
        match self.peek().clone() {
            TokenKind::Number(text) => {
                self.advance();
                let value = Fraction::parse_decimal(&text)
                    .map_err(|_| Error::syntax(offset, format!("invalid number '{}'", text)))?;
                self.emit_constant(&value)
            }
            TokenKind::Ident(name) => {
                self.advance();
                if self.peek() == &TokenKind::LParen {
                    let func = Func::from_name(&name)
                        .ok_or_else(|| Error::syntax(offset, format!("unknown function '{}'", name)))?;
                    self.advance();
                    self.parse_sum()?;
                    self.expect(TokenKind::RParen, "')'")?;
                    self.bytecode.push(Op::Call as u8);
                    self.bytecode.push(func as u8);
                    Ok(())
                } else {
                    self.emit_var(&name, offset)
                }
            }
            TokenKind::LParen => {
                self.advance();
                self.enter()?;
                self.parse_sum()?;
                self.leave();
                self.expect(TokenKind::RParen, "')'")
            }
            TokenKind::End => Err(Error::syntax(offset, "unexpected end of input")),
            _ => Err(Error::syntax(offset, "expected a number, a name or '('")),
        }
    }

    // === Bytecode emission ===

    fn emit_constant(&mut self, value: &Fraction) -> Result<()> {
        if let (Some(n), Some(d)) = (value.numer().to_i32(), value.denom().to_i32()) {
            self.bytecode.push(Op::LoadConst as u8);
            write_i32(&mut self.bytecode, n);
            write_i32(&mut self.bytecode, d);
            return Ok(());
        }
        self.bytecode.push(Op::LoadConstBig as u8);
        write_big_int_signed(&mut self.bytecode, value.numer())?;
        write_big_int_unsigned(&mut self.bytecode, value.denom())
    }

    fn emit_var(&mut self, name: &str, offset: usize) -> Result<()> {
        let index = match self.name_index.get(name) {
            Some(&index) => index,
            None => {
                let index = u16::try_from(self.names.len())
                    .map_err(|_| Error::syntax(offset, "too many distinct names"))?;
                self.names.push(name.to_string());
                self.name_index.insert(name.to_string(), index);
                index
            }
        };
        self.bytecode.push(Op::LoadVar as u8);
        write_u16(&mut self.bytecode, index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::read_i32;

    fn compile(src: &str) -> CompiledExpression {
        ExpressionCompiler::new().compile(src).unwrap()
    }

    fn syntax_offset(src: &str) -> usize {
        match ExpressionCompiler::new().compile(src) {
            Err(Error::Syntax { offset, .. }) => offset,
            other => panic!("expected syntax error for {:?}, got {:?}", src, other),
        }
    }

    #[test]
    fn test_compile_constant() {
        let result = compile("3/4");
        assert_eq!(result.bytecode[0], Op::LoadConst as u8);
        assert_eq!(read_i32(&result.bytecode, 1).unwrap(), 3);
        assert_eq!(read_i32(&result.bytecode, 5).unwrap(), 1);
        assert_eq!(result.bytecode[9], Op::LoadConst as u8);
        assert_eq!(*result.bytecode.last().unwrap(), Op::Div as u8);
        assert!(result.names.is_empty());
        assert_eq!(result.target, None);
    }

    #[test]
    fn test_compile_decimal_is_exact() {
        let result = compile("0.125");
        assert_eq!(result.bytecode.len(), 9);
        assert_eq!(read_i32(&result.bytecode, 1).unwrap(), 1);
        assert_eq!(read_i32(&result.bytecode, 5).unwrap(), 8);
    }

    #[test]
    fn test_compile_big_constant() {
        let result = compile("123456789012345678901234567890");
        assert_eq!(result.bytecode[0], Op::LoadConstBig as u8);
    }

    #[test]
    fn test_precedence() {
        // 1 + 2 * 3 -> 1 2 3 MUL ADD
        let result = compile("1 + 2 * 3");
        let ops: Vec<u8> = result.bytecode.iter().copied().filter(|b| *b >= 0x10).collect();
        assert_eq!(ops, vec![Op::Mul as u8, Op::Add as u8]);

        // -2^2 -> 2 2 POW NEG
        let result = compile("-2^2");
        let n = result.bytecode.len();
        assert_eq!(&result.bytecode[n - 2..], &[Op::Pow as u8, Op::Neg as u8]);
    }

    #[test]
    fn test_variables_share_slots() {
        let result = compile("x * x + y");
        assert_eq!(result.names, vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_assignment() {
        let result = compile("half = 1/2");
        assert_eq!(result.target.as_deref(), Some("half"));
        assert_eq!(syntax_offset("_ = 1"), 0);
        assert_eq!(syntax_offset("abs = 1"), 0);
    }

    #[test]
    fn test_function_call() {
        let result = compile("floor(7/2)");
        let n = result.bytecode.len();
        assert_eq!(&result.bytecode[n - 2..], &[Op::Call as u8, Func::Floor as u8]);
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(syntax_offset(""), 0);
        assert_eq!(syntax_offset("1 +"), 3);
        assert_eq!(syntax_offset("(1 + 2"), 6);
        assert_eq!(syntax_offset("1 2"), 2);
        assert_eq!(syntax_offset("2 $ 3"), 2);
        assert_eq!(syntax_offset("sqrt(2)"), 0);
        assert_eq!(syntax_offset("1..2"), 0);
        assert_eq!(syntax_offset("x = "), 4);
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert!(matches!(
            ExpressionCompiler::new().compile(&deep),
            Err(Error::Syntax { .. })
        ));
        let minus = format!("{}1", "-".repeat(MAX_DEPTH + 1));
        assert!(ExpressionCompiler::new().compile(&minus).is_err());
    }

    #[test]
    fn test_compiler_is_reusable() {
        let mut compiler = ExpressionCompiler::new();
        compiler.compile("a + b").unwrap();
        let second = compiler.compile("c").unwrap();
        assert_eq!(second.names, vec!["c".to_string()]);
    }
}

//! Stack-based Expression Evaluator
//!
//! Runs bytecode produced by the [`ExpressionCompiler`] on a stack of exact
//! [`Fraction`] values, and wraps compiler, evaluator and variable bindings
//! into a [`Session`] for a line-oriented shell.

use crate::bytecode::{read_big_int_signed, read_big_int_unsigned, read_i32, read_u16, read_u8, Func, Op};
use crate::compiler::{CompiledExpression, ExpressionCompiler, LAST_RESULT};
use crate::error::{Error, Result};
use crate::fraction::Fraction;
use crate::options::FormatOptions;
use crate::to_js_error;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use std::collections::HashMap;
use tracing::{debug, trace};
use wasm_bindgen::prelude::*;

/// Variable bindings visible to an expression
pub type Environment = HashMap<String, Fraction>;

/// Stack-based evaluator for compiled expressions
#[wasm_bindgen]
pub struct Evaluator {
    /// Evaluation stack
    stack: Vec<Fraction>,
    /// Maximum stack size (for safety)
    max_stack_size: usize,
}

#[wasm_bindgen]
impl Evaluator {
    /// Create a new evaluator
    #[wasm_bindgen(constructor)]
    pub fn new() -> Evaluator {
        Evaluator {
            stack: Vec::with_capacity(32),
            max_stack_size: 1024,
        }
    }

    /// Get current stack size (for debugging)
    #[wasm_bindgen(getter, js_name = stackSize)]
    pub fn stack_size(&self) -> usize {
        self.stack.len()
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Evaluator::new()
    }
}

impl Evaluator {
    /// Push a value onto the stack
    fn push(&mut self, value: Fraction) -> Result<()> {
        if self.stack.len() >= self.max_stack_size {
            return Err(Error::InvalidBytecode("stack overflow in evaluator".to_string()));
        }
        self.stack.push(value);
        Ok(())
    }

    /// Pop a value from the stack
    fn pop(&mut self) -> Result<Fraction> {
        self.stack
            .pop()
            .ok_or_else(|| Error::InvalidBytecode("stack underflow in evaluator".to_string()))
    }

    fn pop_pair(&mut self) -> Result<(Fraction, Fraction)> {
        let b = self.pop()?;
        let a = self.pop()?;
        Ok((a, b))
    }

    /// Evaluate a compiled expression against a set of bindings
    pub fn evaluate_compiled(&mut self, compiled: &CompiledExpression, env: &Environment) -> Result<Fraction> {
        self.evaluate(&compiled.bytecode, &compiled.names, env)
    }

    /// Evaluate raw bytecode
    ///
    /// # Arguments
    /// * `bytecode` - The bytecode to evaluate
    /// * `names` - Name table indexed by `LoadVar` operands
    /// * `env` - Current variable bindings
    pub fn evaluate(&mut self, bytecode: &[u8], names: &[String], env: &Environment) -> Result<Fraction> {
        if bytecode.is_empty() {
            return Ok(Fraction::zero());
        }

        self.stack.clear();
        let mut pc = 0;

        while pc < bytecode.len() {
            let op_byte = bytecode[pc];
            let op = Op::from_byte(op_byte).ok_or_else(|| {
                Error::InvalidBytecode(format!("unknown opcode 0x{:02x} at pc={}", op_byte, pc))
            })?;
            trace!(?op, pc, depth = self.stack.len(), "step");
            pc += 1;

            match op {
                Op::LoadConst => {
                    let num = read_i32(bytecode, pc)?;
                    let den = read_i32(bytecode, pc + 4)?;
                    pc += 8;
                    self.push(Fraction::new(BigInt::from(num), BigInt::from(den))?)?;
                }

                Op::LoadConstBig => {
                    let (num, num_bytes) = read_big_int_signed(bytecode, pc)?;
                    pc += num_bytes;
                    let (den, den_bytes) = read_big_int_unsigned(bytecode, pc)?;
                    pc += den_bytes;
                    self.push(Fraction::new(num, den)?)?;
                }

                Op::LoadVar => {
                    let index = read_u16(bytecode, pc)? as usize;
                    pc += 2;
                    let name = names.get(index).ok_or_else(|| {
                        Error::InvalidBytecode(format!("name index {} out of range", index))
                    })?;
                    let value = env.get(name).ok_or_else(|| Error::UnknownName(name.clone()))?;
                    self.push(value.clone())?;
                }

                Op::Add => {
                    let (a, b) = self.pop_pair()?;
                    self.push(Fraction::add(&a, &b))?;
                }

                Op::Sub => {
                    let (a, b) = self.pop_pair()?;
                    self.push(Fraction::sub(&a, &b))?;
                }

                Op::Mul => {
                    let (a, b) = self.pop_pair()?;
                    self.push(Fraction::mul(&a, &b))?;
                }

                Op::Div => {
                    let (a, b) = self.pop_pair()?;
                    self.push(a.div(&b)?)?;
                }

                Op::FloorDiv => {
                    let (a, b) = self.pop_pair()?;
                    self.push(a.floor_div(&b)?)?;
                }

                Op::Mod => {
                    let (a, b) = self.pop_pair()?;
                    self.push(a.modulo(&b)?)?;
                }

                Op::Neg => {
                    let a = self.pop()?;
                    self.push(Fraction::neg(&a))?;
                }

                Op::Pow => {
                    let (base, exp) = self.pop_pair()?;
                    self.push(base.pow(integer_exponent(&exp)?)?)?;
                }

                Op::Call => {
                    let id = read_u8(bytecode, pc)?;
                    pc += 1;
                    let func = Func::from_byte(id)
                        .ok_or_else(|| Error::InvalidBytecode(format!("unknown function id {}", id)))?;
                    let x = self.pop()?;
                    self.push(apply(func, &x)?)?;
                }
            }
        }

        let result = self.pop()?;
        if !self.stack.is_empty() {
            return Err(Error::InvalidBytecode(format!(
                "{} values left on the stack",
                self.stack.len()
            )));
        }
        Ok(result)
    }
}

fn integer_exponent(exp: &Fraction) -> Result<i64> {
    if !exp.is_integer() {
        return Err(Error::NonIntegerExponent(exp.to_string()));
    }
    exp.numer().to_i64().ok_or(Error::ExponentTooLarge)
}

fn apply(func: Func, x: &Fraction) -> Result<Fraction> {
    Ok(match func {
        Func::Abs => x.abs(),
        Func::Floor => x.floor(),
        Func::Ceil => x.ceil(),
        Func::Trunc => x.trunc(),
        Func::Round => x.round(),
        Func::Recip => x.recip()?,
        Func::Numer => Fraction::from_integer(x.numer().clone()),
        Func::Denom => Fraction::from_integer(x.denom().clone()),
    })
}

/// Compile and evaluate one expression without bindings, then format it
pub fn evaluate_str(source: &str, options: &FormatOptions) -> Result<String> {
    let compiled = ExpressionCompiler::new().compile(source)?;
    if compiled.target.is_some() {
        return Err(Error::syntax(0, "assignment needs a session"));
    }
    let value = Evaluator::new().evaluate_compiled(&compiled, &Environment::new())?;
    options.format(&value)
}

/// Shell state: bindings, the previous result and output options
#[wasm_bindgen]
pub struct Session {
    compiler: ExpressionCompiler,
    evaluator: Evaluator,
    env: Environment,
    options: FormatOptions,
}

#[wasm_bindgen]
impl Session {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Session {
        Session::with_options(FormatOptions::default())
    }

    /// Run one line and return its formatted result
    #[wasm_bindgen(js_name = run)]
    pub fn js_run(&mut self, line: &str) -> std::result::Result<String, JsValue> {
        self.run(line).map_err(to_js_error)
    }

    /// Replace the output options with a plain JS object
    #[wasm_bindgen(js_name = setOptions)]
    pub fn js_set_options(&mut self, options: JsValue) -> std::result::Result<(), JsValue> {
        let options: FormatOptions = serde_wasm_bindgen::from_value(options)
            .map_err(|e| to_js_error(Error::InvalidOptions(e.to_string())))?;
        self.set_options(options).map_err(to_js_error)
    }

    /// Look up a binding; `_` is the previous result
    #[wasm_bindgen(js_name = get)]
    pub fn js_get(&self, name: &str) -> Option<Fraction> {
        self.get(name).cloned()
    }

    /// Drop every binding, including `_`
    pub fn clear(&mut self) {
        self.env.clear();
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::new()
    }
}

impl Session {
    pub fn with_options(options: FormatOptions) -> Session {
        Session {
            compiler: ExpressionCompiler::new(),
            evaluator: Evaluator::new(),
            env: Environment::new(),
            options,
        }
    }

    pub fn options(&self) -> &FormatOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: FormatOptions) -> Result<()> {
        options.validate()?;
        self.options = options;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Fraction> {
        self.env.get(name)
    }

    /// Iterate over the current bindings
    pub fn bindings(&self) -> impl Iterator<Item = (&str, &Fraction)> {
        self.env.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Evaluate a line and store its value.
    ///
    /// Returns `None` for a blank line. Bindings change only when the whole
    /// line succeeds.
    pub fn eval(&mut self, line: &str) -> Result<Option<Fraction>> {
        if line.trim().is_empty() {
            return Ok(None);
        }
        let (target, value) = self.evaluate_line(line)?;
        self.commit(target, value.clone());
        Ok(Some(value))
    }

    /// Evaluate a line and format the result. A blank line gives `""`.
    pub fn run(&mut self, line: &str) -> Result<String> {
        if line.trim().is_empty() {
            return Ok(String::new());
        }
        let (target, value) = self.evaluate_line(line)?;
        let text = self.options.format(&value)?;
        self.commit(target, value);
        Ok(text)
    }

    fn evaluate_line(&mut self, line: &str) -> Result<(Option<String>, Fraction)> {
        let compiled = self.compiler.compile(line)?;
        let value = self.evaluator.evaluate_compiled(&compiled, &self.env).map_err(|e| {
            debug!(line, error = %e, "evaluation failed");
            e
        })?;
        Ok((compiled.target, value))
    }

    fn commit(&mut self, target: Option<String>, value: Fraction) {
        if let Some(target) = target {
            debug!(name = %target, value = %value, "bind");
            self.env.insert(target, value.clone());
        }
        self.env.insert(LAST_RESULT.to_string(), value);
    }
}

//! Bytecode for compiled shell expressions
//!
//! Multi-byte operands are big-endian. Every reader is bounds-checked and
//! reports truncated input as [`Error::InvalidBytecode`].

use crate::error::{Error, Result};
use num_bigint::{BigInt, Sign};

/// Bytecode opcodes
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    // Load operations
    LoadConst = 0x01,    // Push small fraction: [num(i32), den(i32)]
    LoadVar = 0x02,      // Push variable: [name_index(u16)]
    LoadConstBig = 0x04, // Push big fraction: [sign(1), num_len(4), num_bytes(n), den_len(4), den_bytes(n)]

    // Arithmetic operations
    Add = 0x10,      // Pop 2, push sum
    Sub = 0x11,      // Pop 2, push difference
    Mul = 0x12,      // Pop 2, push product
    Div = 0x13,      // Pop 2, push quotient
    Neg = 0x14,      // Pop 1, push negation
    Pow = 0x15,      // Pop 2 (base, exponent), push base^exponent
    FloorDiv = 0x16, // Pop 2, push floor(a / b)
    Mod = 0x17,      // Pop 2, push a - b * floor(a / b)

    // Builtins
    Call = 0x20, // Pop 1, push func(x): [func_id(u8)]
}

impl Op {
    /// Convert a byte to an opcode, returning None for invalid bytes
    pub fn from_byte(byte: u8) -> Option<Op> {
        match byte {
            0x01 => Some(Op::LoadConst),
            0x02 => Some(Op::LoadVar),
            0x04 => Some(Op::LoadConstBig),
            0x10 => Some(Op::Add),
            0x11 => Some(Op::Sub),
            0x12 => Some(Op::Mul),
            0x13 => Some(Op::Div),
            0x14 => Some(Op::Neg),
            0x15 => Some(Op::Pow),
            0x16 => Some(Op::FloorDiv),
            0x17 => Some(Op::Mod),
            0x20 => Some(Op::Call),
            _ => None,
        }
    }
}

/// Single-argument builtin functions
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Func {
    Abs = 0,
    Floor = 1,
    Ceil = 2,
    Trunc = 3,
    Round = 4,
    Recip = 5,
    Numer = 6,
    Denom = 7,
}

impl Func {
    pub fn from_byte(byte: u8) -> Option<Func> {
        match byte {
            0 => Some(Func::Abs),
            1 => Some(Func::Floor),
            2 => Some(Func::Ceil),
            3 => Some(Func::Trunc),
            4 => Some(Func::Round),
            5 => Some(Func::Recip),
            6 => Some(Func::Numer),
            7 => Some(Func::Denom),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Func::Abs => "abs",
            Func::Floor => "floor",
            Func::Ceil => "ceil",
            Func::Trunc => "trunc",
            Func::Round => "round",
            Func::Recip => "recip",
            Func::Numer => "numer",
            Func::Denom => "denom",
        }
    }

    pub fn from_name(name: &str) -> Option<Func> {
        match name {
            "abs" => Some(Func::Abs),
            "floor" => Some(Func::Floor),
            "ceil" => Some(Func::Ceil),
            "trunc" => Some(Func::Trunc),
            "round" => Some(Func::Round),
            "recip" => Some(Func::Recip),
            "numer" => Some(Func::Numer),
            "denom" => Some(Func::Denom),
            _ => None,
        }
    }
}

fn truncated(what: &str, offset: usize) -> Error {
    Error::InvalidBytecode(format!("unexpected end of bytecode reading {} at offset {}", what, offset))
}

/// Read one byte
#[inline]
pub fn read_u8(bytecode: &[u8], offset: usize) -> Result<u8> {
    bytecode.get(offset).copied().ok_or_else(|| truncated("u8", offset))
}

/// Read a 16-bit unsigned integer (big-endian)
#[inline]
pub fn read_u16(bytecode: &[u8], offset: usize) -> Result<u16> {
    match bytecode.get(offset..offset + 2) {
        Some(b) => Ok(u16::from_be_bytes([b[0], b[1]])),
        None => Err(truncated("u16", offset)),
    }
}

/// Read a 32-bit signed integer (big-endian)
#[inline]
pub fn read_i32(bytecode: &[u8], offset: usize) -> Result<i32> {
    match bytecode.get(offset..offset + 4) {
        Some(b) => Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]])),
        None => Err(truncated("i32", offset)),
    }
}

/// Read a 32-bit unsigned integer (big-endian)
#[inline]
pub fn read_u32(bytecode: &[u8], offset: usize) -> Result<u32> {
    match bytecode.get(offset..offset + 4) {
        Some(b) => Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]])),
        None => Err(truncated("u32", offset)),
    }
}

/// Write a 16-bit unsigned integer to a buffer (big-endian)
#[inline]
pub fn write_u16(buffer: &mut Vec<u8>, value: u16) {
    buffer.extend_from_slice(&value.to_be_bytes());
}

/// Write a 32-bit unsigned integer to a buffer (big-endian)
#[inline]
pub fn write_u32(buffer: &mut Vec<u8>, value: u32) {
    buffer.extend_from_slice(&value.to_be_bytes());
}

/// Write a 32-bit signed integer to a buffer (big-endian)
#[inline]
pub fn write_i32(buffer: &mut Vec<u8>, value: i32) {
    buffer.extend_from_slice(&value.to_be_bytes());
}

/// Read a variable-length signed BigInt
/// Format: [sign(1)] [len(4)] [bytes(n)], sign 0x01 means negative
/// Returns (BigInt, bytes_consumed)
pub fn read_big_int_signed(bytecode: &[u8], offset: usize) -> Result<(BigInt, usize)> {
    let sign_byte = read_u8(bytecode, offset)?;
    let (magnitude, mag_bytes) = read_big_int_unsigned(bytecode, offset + 1)?;
    let value = if sign_byte == 0x01 { -magnitude } else { magnitude };
    Ok((value, 1 + mag_bytes))
}

/// Read a variable-length unsigned BigInt
/// Format: [len(4)] [bytes(n)]
/// Returns (BigInt, bytes_consumed)
pub fn read_big_int_unsigned(bytecode: &[u8], offset: usize) -> Result<(BigInt, usize)> {
    let len = read_u32(bytecode, offset)? as usize;
    let start = offset + 4;
    let bytes = start
        .checked_add(len)
        .and_then(|end| bytecode.get(start..end))
        .ok_or_else(|| {
            Error::InvalidBytecode(format!(
                "unexpected end of bytecode reading BigInt bytes: need {} bytes at offset {}, have {}",
                len,
                start,
                bytecode.len()
            ))
        })?;
    Ok((BigInt::from_bytes_be(Sign::Plus, bytes), 4 + len))
}

/// Write a signed BigInt in the format read by [`read_big_int_signed`]
pub fn write_big_int_signed(buffer: &mut Vec<u8>, value: &BigInt) -> Result<()> {
    buffer.push(if value.sign() == Sign::Minus { 0x01 } else { 0x00 });
    write_big_int_unsigned(buffer, value)
}

/// Write the magnitude of a BigInt
pub fn write_big_int_unsigned(buffer: &mut Vec<u8>, value: &BigInt) -> Result<()> {
    let (_, bytes) = value.to_bytes_be();
    // a magnitude of 4 GiB or more cannot have been allocated on the way here
    let len = u32::try_from(bytes.len()).map_err(|_| Error::AllocationFailure)?;
    write_u32(buffer, len);
    buffer.extend_from_slice(&bytes);
    Ok(())
}

//! Primitive field codec.
//!
//! Every multi-byte value is little-endian with no padding. Reads are
//! bounds-checked and fail with [`CodecError::TruncatedPacket`] instead of
//! panicking, so a hostile length prefix can never walk past the buffer.

use crate::config::CodecConfig;
use crate::error::{CodecError, Result};
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

/// Longest 7-bit-group encoding of a 32-bit length.
const MAX_VARINT_BYTES: usize = 5;

/// One byte carrying up to eight boolean flags, bit 0 first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitsByte(u8);

impl BitsByte {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn from_flags(flags: [bool; 8]) -> Self {
        let mut bits = Self::new();
        for (index, flag) in flags.iter().enumerate() {
            bits.set(index, *flag);
        }
        bits
    }

    /// # Panics
    /// If `index >= 8`.
    pub fn get(self, index: usize) -> bool {
        assert!(index < 8, "BitsByte index {index} out of range");
        self.0 & (1 << index) != 0
    }

    /// # Panics
    /// If `index >= 8`.
    pub fn set(&mut self, index: usize, value: bool) {
        assert!(index < 8, "BitsByte index {index} out of range");
        if value {
            self.0 |= 1 << index;
        } else {
            self.0 &= !(1 << index);
        }
    }

    pub fn with(mut self, index: usize, value: bool) -> Self {
        self.set(index, value);
        self
    }

    pub fn any(self) -> bool {
        self.0 != 0
    }

    pub fn flags(self) -> [bool; 8] {
        let mut flags = [false; 8];
        for (index, flag) in flags.iter_mut().enumerate() {
            *flag = self.get(index);
        }
        flags
    }

    fn from_wire(byte: u8) -> Self {
        Self(byte)
    }

    fn to_wire(self) -> u8 {
        self.0
    }
}

/// RGB colour; alpha is never sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// World position or velocity in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Two IEEE-754 binary16 values packed into one `u32`, `x` in the low half.
///
/// The raw half-precision bits are stored so a decoded value re-encodes to
/// exactly the same packed word.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HalfVector2 {
    x: u16,
    y: u16,
}

impl HalfVector2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x: f32_to_f16_bits(x),
            y: f32_to_f16_bits(y),
        }
    }

    pub fn from_bits(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    pub fn from_packed(packed: u32) -> Self {
        Self {
            x: (packed & 0xFFFF) as u16,
            y: (packed >> 16) as u16,
        }
    }

    pub fn packed(self) -> u32 {
        (u32::from(self.y) << 16) | u32::from(self.x)
    }

    pub fn x(self) -> f32 {
        f16_bits_to_f32(self.x)
    }

    pub fn y(self) -> f32 {
        f16_bits_to_f32(self.y)
    }

    pub fn x_bits(self) -> u16 {
        self.x
    }

    pub fn y_bits(self) -> u16 {
        self.y
    }

    pub fn to_vector(self) -> Vector2 {
        Vector2::new(self.x(), self.y())
    }
}

impl From<Vector2> for HalfVector2 {
    fn from(value: Vector2) -> Self {
        HalfVector2::new(value.x, value.y)
    }
}

/// Converts to binary16 with round-to-nearest-even.
pub fn f32_to_f16_bits(value: f32) -> u16 {
    let bits = value.to_bits();
    let sign = ((bits >> 16) & 0x8000) as u16;
    let exponent = ((bits >> 23) & 0xFF) as i32;
    let mantissa = bits & 0x007F_FFFF;

    if exponent == 0xFF {
        // infinity, or NaN with the quiet bit forced so it stays a NaN
        let payload = if mantissa != 0 { 0x0200 | (mantissa >> 13) as u16 } else { 0 };
        return sign | 0x7C00 | payload;
    }

    let half_exponent = exponent - 127 + 15;
    if half_exponent >= 0x1F {
        return sign | 0x7C00;
    }

    if half_exponent <= 0 {
        if half_exponent < -10 {
            return sign;
        }
        let full = mantissa | 0x0080_0000;
        let shift = (14 - half_exponent) as u32;
        let halfway = 1u32 << (shift - 1);
        let rest = full & ((1u32 << shift) - 1);
        let mut half = full >> shift;
        if rest > halfway || (rest == halfway && half & 1 == 1) {
            half += 1;
        }
        return sign | half as u16;
    }

    let rest = mantissa & 0x1FFF;
    let mut half = ((half_exponent as u32) << 10) | (mantissa >> 13);
    // a carry out of the mantissa bumps the exponent, up to infinity
    if rest > 0x1000 || (rest == 0x1000 && half & 1 == 1) {
        half += 1;
    }
    sign | half as u16
}

pub fn f16_bits_to_f32(half: u16) -> f32 {
    let sign = u32::from(half & 0x8000) << 16;
    let exponent = u32::from((half >> 10) & 0x1F);
    let mantissa = u32::from(half & 0x03FF);

    let bits = match (exponent, mantissa) {
        (0, 0) => sign,
        (0, _) => {
            let mut shifts = 0u32;
            let mut normalized = mantissa;
            while normalized & 0x0400 == 0 {
                normalized <<= 1;
                shifts += 1;
            }
            let exponent = 127 - 15 + 1 - shifts;
            sign | (exponent << 23) | ((normalized & 0x03FF) << 13)
        }
        (0x1F, _) => sign | 0x7F80_0000 | (mantissa << 13),
        _ => sign | ((exponent + 127 - 15) << 23) | (mantissa << 13),
    };
    f32::from_bits(bits)
}

/// Bounds-checked cursor over a packet body.
pub struct PacketReader<'a> {
    buf: &'a [u8],
    pos: usize,
    config: &'a CodecConfig,
}

impl<'a> PacketReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self::with_config(buf, CodecConfig::shared_default())
    }

    pub fn with_config(buf: &'a [u8], config: &'a CodecConfig) -> Self {
        Self { buf, pos: 0, config }
    }

    pub fn config(&self) -> &'a CodecConfig {
        self.config
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(CodecError::truncated(len, self.remaining()));
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn read_remaining(&mut self) -> &'a [u8] {
        let bytes = &self.buf[self.pos..];
        self.pos = self.buf.len();
        bytes
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut array = [0u8; N];
        array.copy_from_slice(bytes);
        Ok(array)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(i8::from_le_bytes(self.read_array()?))
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    /// Reads a 7-bit-group length prefix.
    pub fn read_varint(&mut self) -> Result<u32> {
        let mut value: u32 = 0;
        for index in 0..MAX_VARINT_BYTES {
            let byte = self.read_u8().map_err(|_| {
                CodecError::MalformedLength(format!("length prefix ends after {index} bytes"))
            })?;
            if index == MAX_VARINT_BYTES - 1 && byte > 0x0F {
                return Err(CodecError::MalformedLength(
                    "length prefix overflows 32 bits".to_string(),
                ));
            }
            value |= u32::from(byte & 0x7F) << (7 * index);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(CodecError::MalformedLength(
            "length prefix longer than 5 bytes".to_string(),
        ))
    }

    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_varint()? as usize;
        let bytes = self.read_bytes(len)?;
        Ok(std::str::from_utf8(bytes)?.to_owned())
    }

    pub fn read_bits_byte(&mut self) -> Result<BitsByte> {
        Ok(BitsByte::from_wire(self.read_u8()?))
    }

    pub fn read_color(&mut self) -> Result<Color> {
        let [r, g, b] = self.read_array::<3>()?;
        Ok(Color { r, g, b })
    }

    pub fn read_vector2(&mut self) -> Result<Vector2> {
        let x = self.read_f32()?;
        let y = self.read_f32()?;
        Ok(Vector2 { x, y })
    }

    pub fn read_half_vector2(&mut self) -> Result<HalfVector2> {
        Ok(HalfVector2::from_packed(self.read_u32()?))
    }
}

/// Growable output buffer for packet bodies.
pub struct PacketWriter<'a> {
    buf: BytesMut,
    config: &'a CodecConfig,
}

impl PacketWriter<'static> {
    pub fn new() -> Self {
        Self::with_config(CodecConfig::shared_default())
    }
}

impl Default for PacketWriter<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> PacketWriter<'a> {
    pub fn with_config(config: &'a CodecConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(64),
            config,
        }
    }

    pub fn config(&self) -> &'a CodecConfig {
        self.config
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    pub fn into_inner(self) -> BytesMut {
        self.buf
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    pub fn write_i8(&mut self, value: i8) {
        self.buf.put_i8(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.put_u8(u8::from(value));
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.put_u16_le(value);
    }

    pub fn write_i16(&mut self, value: i16) {
        self.buf.put_i16_le(value);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.put_u32_le(value);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.put_i32_le(value);
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buf.put_u64_le(value);
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buf.put_i64_le(value);
    }

    pub fn write_f32(&mut self, value: f32) {
        self.buf.put_f32_le(value);
    }

    pub fn write_f64(&mut self, value: f64) {
        self.buf.put_f64_le(value);
    }

    pub fn write_varint(&mut self, mut value: u32) {
        while value >= 0x80 {
            self.buf.put_u8((value as u8 & 0x7F) | 0x80);
            value >>= 7;
        }
        self.buf.put_u8(value as u8);
    }

    pub fn write_string(&mut self, value: &str) -> Result<()> {
        let len = u32::try_from(value.len()).map_err(|_| {
            CodecError::InvalidValue(format!("string of {} bytes is too long", value.len()))
        })?;
        self.write_varint(len);
        self.buf.put_slice(value.as_bytes());
        Ok(())
    }

    pub fn write_bits_byte(&mut self, value: BitsByte) {
        self.buf.put_u8(value.to_wire());
    }

    pub fn write_color(&mut self, value: Color) {
        self.buf.put_slice(&[value.r, value.g, value.b]);
    }

    pub fn write_vector2(&mut self, value: Vector2) {
        self.write_f32(value.x);
        self.write_f32(value.y);
    }

    pub fn write_half_vector2(&mut self, value: HalfVector2) {
        self.write_u32(value.packed());
    }
}

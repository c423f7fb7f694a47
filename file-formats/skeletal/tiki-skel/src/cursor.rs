//! Bounds-checked byte reading and writing
//!
//! [`ByteReader`] walks a borrowed buffer, [`ByteWriter`] fills an owned one.
//! Both expose their position so sections addressed through offset tables can
//! be visited out of order. Every read checks that `offset + size` fits in the
//! buffer and reports [`SkelError::Truncated`] otherwise; a failed read never
//! moves the cursor.
//!
//! Strings in both formats are 8-bit Latin-1.

use glam::{Quat, Vec2, Vec3, Vec4};
use memchr::memchr;

use crate::error::{Result, SkelError};

/// Decode Latin-1 bytes into a `String`
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Encode a `String` as Latin-1 bytes
pub fn encode_latin1(value: &str) -> Result<Vec<u8>> {
    value
        .chars()
        .map(|c| u8::try_from(u32::from(c)).ok())
        .collect::<Option<Vec<u8>>>()
        .ok_or_else(|| SkelError::InvalidString {
            value: value.to_string(),
        })
}

macro_rules! read_numbers {
    ($($name:ident => $ty:ty, $conv:ident;)*) => {
        $(
            #[doc = concat!("Read a `", stringify!($ty), "` using `", stringify!($conv), "`")]
            pub fn $name(&mut self) -> Result<$ty> {
                Ok(<$ty>::$conv(self.read_array()?))
            }
        )*
    };
}

macro_rules! write_numbers {
    ($($name:ident => $ty:ty, $conv:ident;)*) => {
        $(
            #[doc = concat!("Write a `", stringify!($ty), "` using `", stringify!($conv), "`")]
            pub fn $name(&mut self, value: $ty) {
                self.put(&value.$conv());
            }
        )*
    };
}

/// A cursor for reading binary data from a byte slice
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a new reader at the beginning of the data
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Create a reader positioned at `offset`
    pub fn at(data: &'a [u8], offset: usize) -> Self {
        Self {
            data,
            position: offset,
        }
    }

    /// Current offset from the start of the buffer
    pub fn position(&self) -> usize {
        self.position
    }

    /// Move to an absolute offset. Seeking past the end is allowed, the next
    /// read reports the truncation.
    pub fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    /// Advance by `count` bytes, checking that they exist
    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.take(count).map(|_| ())
    }

    /// Total buffer length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the underlying buffer is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left after the current position
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// The whole underlying buffer
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Make sure `size` bytes are readable at `offset` without moving
    pub fn check(&self, offset: usize, size: usize) -> Result<()> {
        match offset.checked_add(size) {
            Some(end) if end <= self.data.len() => Ok(()),
            _ => Err(SkelError::Truncated {
                offset,
                size,
                len: self.data.len(),
            }),
        }
    }

    fn take(&mut self, size: usize) -> Result<&'a [u8]> {
        self.check(self.position, size)?;
        let bytes = &self.data[self.position..self.position + size];
        self.position += size;
        Ok(bytes)
    }

    /// Read exactly `N` bytes into an array
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Read exactly `count` bytes
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        self.take(count)
    }

    read_numbers! {
        read_u8 => u8, from_le_bytes;
        read_i8 => i8, from_le_bytes;
        read_u16_le => u16, from_le_bytes;
        read_u16_be => u16, from_be_bytes;
        read_i16_le => i16, from_le_bytes;
        read_i16_be => i16, from_be_bytes;
        read_u32_le => u32, from_le_bytes;
        read_u32_be => u32, from_be_bytes;
        read_i32_le => i32, from_le_bytes;
        read_i32_be => i32, from_be_bytes;
        read_u64_le => u64, from_le_bytes;
        read_u64_be => u64, from_be_bytes;
        read_i64_le => i64, from_le_bytes;
        read_i64_be => i64, from_be_bytes;
        read_f32_le => f32, from_le_bytes;
        read_f64_le => f64, from_le_bytes;
    }

    /// Read a little-endian `i32` that must not be negative (counts, offsets)
    pub fn read_count(&mut self, field: &'static str) -> Result<usize> {
        let offset = self.position;
        let value = self.read_i32_le()?;
        usize::try_from(value).map_err(|_| SkelError::InvalidField {
            field,
            value: i64::from(value),
            offset,
        })
    }

    /// Read two little-endian `f32`
    pub fn read_vec2(&mut self) -> Result<Vec2> {
        let bytes: [u8; 8] = self.read_array()?;
        Ok(Vec2::new(f32_at(&bytes, 0), f32_at(&bytes, 4)))
    }

    /// Read three little-endian `f32`
    pub fn read_vec3(&mut self) -> Result<Vec3> {
        let bytes: [u8; 12] = self.read_array()?;
        Ok(Vec3::new(
            f32_at(&bytes, 0),
            f32_at(&bytes, 4),
            f32_at(&bytes, 8),
        ))
    }

    /// Read four little-endian `f32`
    pub fn read_vec4(&mut self) -> Result<Vec4> {
        let bytes: [u8; 16] = self.read_array()?;
        Ok(Vec4::new(
            f32_at(&bytes, 0),
            f32_at(&bytes, 4),
            f32_at(&bytes, 8),
            f32_at(&bytes, 12),
        ))
    }

    /// Read a quaternion stored as `x y z w`
    pub fn read_quat(&mut self) -> Result<Quat> {
        Ok(Quat::from_vec4(self.read_vec4()?))
    }

    /// Read a NUL-padded string from a fixed-size field
    pub fn read_fixed_str(&mut self, len: usize) -> Result<String> {
        let bytes = self.take(len)?;
        let end = memchr(0, bytes).unwrap_or(len);
        Ok(decode_latin1(&bytes[..end]))
    }

    /// Read a NUL-terminated string; the terminator is consumed
    pub fn read_cstr(&mut self) -> Result<String> {
        let rest = self.data.get(self.position..).unwrap_or_default();
        let end = memchr(0, rest).ok_or(SkelError::Truncated {
            offset: self.position,
            size: rest.len() + 1,
            len: self.data.len(),
        })?;
        let bytes = self.take(end + 1)?;
        Ok(decode_latin1(&bytes[..end]))
    }

    /// Read a string prefixed with its little-endian `u32` byte length
    pub fn read_len_prefixed_str(&mut self) -> Result<String> {
        let start = self.position;
        let len = self.read_u32_le()? as usize;
        match self.take(len) {
            Ok(bytes) => Ok(decode_latin1(bytes)),
            Err(e) => {
                self.position = start;
                Err(e)
            }
        }
    }
}

fn f32_at(bytes: &[u8], at: usize) -> f32 {
    f32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// A cursor writing into a growable buffer
///
/// Writes land at the current position. Writing past the end grows the buffer
/// (zero filled), writing inside it overwrites, which is how offset fields are
/// back-patched once a section has been laid out.
#[derive(Debug, Clone, Default)]
pub struct ByteWriter {
    buffer: Vec<u8>,
    position: usize,
}

impl ByteWriter {
    /// Create an empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty writer with reserved capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            position: 0,
        }
    }

    /// Current write offset
    pub fn position(&self) -> usize {
        self.position
    }

    /// Move the write offset
    pub fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    /// Move the write offset to the end of the written data
    pub fn seek_end(&mut self) {
        self.position = self.buffer.len();
    }

    /// Length of the written data
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing has been written yet
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Bytes written so far
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Consume the writer and return the bytes
    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }

    fn put(&mut self, bytes: &[u8]) {
        let end = self.position + bytes.len();
        if end > self.buffer.len() {
            self.buffer.resize(end, 0);
        }
        self.buffer[self.position..end].copy_from_slice(bytes);
        self.position = end;
    }

    /// Write raw bytes
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.put(bytes);
    }

    /// Write `count` zero bytes
    pub fn write_zeros(&mut self, count: usize) {
        let end = self.position + count;
        if end > self.buffer.len() {
            self.buffer.resize(end, 0);
        }
        self.buffer[self.position..end].fill(0);
        self.position = end;
    }

    write_numbers! {
        write_u8 => u8, to_le_bytes;
        write_i8 => i8, to_le_bytes;
        write_u16_le => u16, to_le_bytes;
        write_u16_be => u16, to_be_bytes;
        write_i16_le => i16, to_le_bytes;
        write_i16_be => i16, to_be_bytes;
        write_u32_le => u32, to_le_bytes;
        write_u32_be => u32, to_be_bytes;
        write_i32_le => i32, to_le_bytes;
        write_i32_be => i32, to_be_bytes;
        write_u64_le => u64, to_le_bytes;
        write_u64_be => u64, to_be_bytes;
        write_i64_le => i64, to_le_bytes;
        write_i64_be => i64, to_be_bytes;
        write_f32_le => f32, to_le_bytes;
        write_f64_le => f64, to_le_bytes;
    }

    /// Write a count or offset as a little-endian `i32`
    pub fn write_count(&mut self, field: &'static str, value: usize) -> Result<()> {
        let value = i32::try_from(value).map_err(|_| SkelError::InvalidField {
            field,
            value: i64::try_from(value).unwrap_or(i64::MAX),
            offset: self.position,
        })?;
        self.write_i32_le(value);
        Ok(())
    }

    /// Write two little-endian `f32`
    pub fn write_vec2(&mut self, value: Vec2) {
        self.write_f32_le(value.x);
        self.write_f32_le(value.y);
    }

    /// Write three little-endian `f32`
    pub fn write_vec3(&mut self, value: Vec3) {
        self.write_f32_le(value.x);
        self.write_f32_le(value.y);
        self.write_f32_le(value.z);
    }

    /// Write four little-endian `f32`
    pub fn write_vec4(&mut self, value: Vec4) {
        self.write_f32_le(value.x);
        self.write_f32_le(value.y);
        self.write_f32_le(value.z);
        self.write_f32_le(value.w);
    }

    /// Write a quaternion as `x y z w`
    pub fn write_quat(&mut self, value: Quat) {
        self.write_vec4(Vec4::from(value));
    }

    /// Write a string into a fixed-size, NUL-padded field. A name that fills
    /// the field exactly is written without a terminator.
    pub fn write_fixed_str(&mut self, value: &str, len: usize) -> Result<()> {
        let bytes = encode_latin1(value)?;
        if bytes.len() > len {
            return Err(SkelError::NameTooLong {
                name: value.to_string(),
                max: len,
            });
        }
        self.put(&bytes);
        self.write_zeros(len - bytes.len());
        Ok(())
    }

    /// Write a NUL-terminated string
    pub fn write_cstr(&mut self, value: &str) -> Result<()> {
        let bytes = encode_latin1(value)?;
        self.put(&bytes);
        self.write_u8(0);
        Ok(())
    }

    /// Write a string prefixed with its little-endian `u32` byte length
    pub fn write_len_prefixed_str(&mut self, value: &str) -> Result<()> {
        let bytes = encode_latin1(value)?;
        self.write_count("string length", bytes.len())?;
        self.put(&bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_primitives() {
        let data = [
            0x01, 0x02, 0x03, 0x04, // u32
            0xff, 0xff, // i16
            0x00, 0x00, 0x80, 0x3f, // 1.0f32
        ];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_u32_le().unwrap(), 0x0403_0201);
        assert_eq!(reader.read_i16_le().unwrap(), -1);
        assert_eq!(reader.read_f32_le().unwrap(), 1.0);
        assert_eq!(reader.remaining(), 0);

        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_u32_be().unwrap(), 0x0102_0304);
    }

    #[test]
    fn test_truncated_read_reports_offset_and_keeps_position() {
        let data = [0u8; 6];
        let mut reader = ByteReader::new(&data);
        reader.read_u32_le().unwrap();
        let err = reader.read_u32_le().unwrap_err();
        assert_eq!(
            err,
            SkelError::Truncated {
                offset: 4,
                size: 4,
                len: 6
            }
        );
        assert_eq!(reader.position(), 4);
        assert_eq!(reader.read_u16_le().unwrap(), 0);
    }

    #[test]
    fn test_seek_past_end_then_read() {
        let data = [0u8; 4];
        let mut reader = ByteReader::new(&data);
        reader.set_position(10);
        assert!(matches!(
            reader.read_u8(),
            Err(SkelError::Truncated { offset: 10, size: 1, .. })
        ));
    }

    #[test]
    fn test_overflowing_offset_is_truncated() {
        let data = [0u8; 4];
        let reader = ByteReader::new(&data);
        assert!(reader.check(usize::MAX, 2).is_err());
    }

    #[test]
    fn test_read_count_rejects_negative() {
        let data = (-5i32).to_le_bytes();
        let mut reader = ByteReader::new(&data);
        assert!(matches!(
            reader.read_count("numBones"),
            Err(SkelError::InvalidField {
                field: "numBones",
                value: -5,
                offset: 0
            })
        ));
    }

    #[test]
    fn test_strings() {
        let mut writer = ByteWriter::new();
        writer.write_fixed_str("Bip01", 8).unwrap();
        writer.write_cstr("pelvis rot").unwrap();
        writer.write_len_prefixed_str("caf\u{e9}").unwrap();

        let bytes = writer.into_inner();
        assert_eq!(&bytes[..8], b"Bip01\0\0\0");

        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_fixed_str(8).unwrap(), "Bip01");
        assert_eq!(reader.read_cstr().unwrap(), "pelvis rot");
        assert_eq!(reader.read_len_prefixed_str().unwrap(), "caf\u{e9}");
    }

    #[test]
    fn test_unterminated_cstr_is_truncated() {
        let data = b"abc";
        let mut reader = ByteReader::new(data);
        assert!(matches!(
            reader.read_cstr(),
            Err(SkelError::Truncated { offset: 0, size: 4, len: 3 })
        ));
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn test_fixed_str_filling_the_field() {
        let mut writer = ByteWriter::new();
        writer.write_fixed_str("Bip01 L Forearm Twist Helper 012", 32).unwrap();
        writer.write_u8(0x7f);
        let bytes = writer.into_inner();
        assert_eq!(bytes.len(), 33);
        assert!(!bytes[..32].contains(&0));

        let mut reader = ByteReader::new(&bytes);
        assert_eq!(
            reader.read_fixed_str(32).unwrap(),
            "Bip01 L Forearm Twist Helper 012"
        );
        assert_eq!(reader.read_u8().unwrap(), 0x7f);
    }

    #[test]
    fn test_fixed_str_too_long() {
        let mut writer = ByteWriter::new();
        assert!(matches!(
            writer.write_fixed_str("a_really_long_name", 8),
            Err(SkelError::NameTooLong { max: 8, .. })
        ));
        assert!(writer.is_empty());
        assert!(matches!(
            writer.write_cstr("\u{4e2d}"),
            Err(SkelError::InvalidString { .. })
        ));
    }

    #[test]
    fn test_writer_back_patch() {
        let mut writer = ByteWriter::new();
        writer.write_i32_le(0);
        writer.write_u16_le(7);
        writer.set_position(0);
        writer.write_i32_le(42);
        writer.seek_end();
        writer.write_u8(1);

        let bytes = writer.into_inner();
        assert_eq!(bytes, vec![42, 0, 0, 0, 7, 0, 1]);
    }

    #[test]
    fn test_writer_gap_is_zero_filled() {
        let mut writer = ByteWriter::new();
        writer.set_position(3);
        writer.write_u8(9);
        assert_eq!(writer.into_inner(), vec![0, 0, 0, 9]);
    }

    #[test]
    fn test_vectors() {
        let mut writer = ByteWriter::new();
        writer.write_vec3(Vec3::new(1.0, -2.0, 3.5));
        writer.write_quat(Quat::from_xyzw(0.0, 0.0, 0.0, 1.0));
        writer.write_vec2(Vec2::new(0.25, 0.75));
        let bytes = writer.into_inner();

        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_vec3().unwrap(), Vec3::new(1.0, -2.0, 3.5));
        assert_eq!(reader.read_quat().unwrap(), Quat::IDENTITY);
        assert_eq!(reader.read_vec2().unwrap(), Vec2::new(0.25, 0.75));
    }
}

//! Primitive byte stream used by the table codec.
//!
//! Integers are little-endian; ports are big-endian (network order).

use std::io::{self, Read};

/// Append-only encoder.
#[derive(Debug, Default)]
pub struct StreamWriter {
    buf: Vec<u8>,
}

impl StreamWriter {
    /// Create a writer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Port in network byte order.
    pub fn write_port(&mut self, port: u16) {
        self.buf.extend_from_slice(&port.to_be_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Finished buffer.
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over a borrowed payload. Every read fails with
/// `UnexpectedEof` once the payload runs out.
#[derive(Debug)]
pub struct StreamReader<'a> {
    data: &'a [u8],
}

impl<'a> StreamReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Bytes not consumed yet.
    pub fn remaining(&self) -> usize {
        self.data.len()
    }

    pub fn read_array<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        let mut out = [0u8; N];
        self.data.read_exact(&mut out)?;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> io::Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_i32(&mut self) -> io::Result<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> io::Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> io::Result<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> io::Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Port in network byte order.
    pub fn read_port(&mut self) -> io::Result<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }
}

//! Low-level JSON emitter.
//!
//! Appends tokens to an in-memory buffer and tracks where separators are
//! needed. Strings and numbers are rendered by `serde_json` so escaping and
//! float formatting match the reader's tokenizer exactly.

use std::io;

/// Buffered JSON token writer.
#[derive(Debug, Clone, Default)]
pub struct JsonWriter {
    buf: Vec<u8>,
    /// One entry per open object or array: true once it holds an item.
    has_items: Vec<bool>,
    /// A member name was just written; the next value needs no separator.
    after_name: bool,
}

impl JsonWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty writer with `capacity` bytes preallocated.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Returns the bytes buffered since the last drain.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Number of bytes buffered.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Returns the number of open objects and arrays.
    pub fn open_containers(&self) -> usize {
        self.has_items.len()
    }

    /// Writes buffered bytes to `sink` and clears the buffer.
    pub fn drain_into<W: io::Write>(&mut self, sink: &mut W) -> io::Result<()> {
        if !self.buf.is_empty() {
            sink.write_all(&self.buf)?;
            self.buf.clear();
        }
        Ok(())
    }

    #[inline]
    fn separator(&mut self) {
        if self.after_name {
            self.after_name = false;
            return;
        }
        if let Some(has_items) = self.has_items.last_mut() {
            if *has_items {
                self.buf.push(b',');
            }
            *has_items = true;
        }
    }

    /// Writes `{`, after a separator if needed.
    pub fn begin_object(&mut self) {
        self.separator();
        self.buf.push(b'{');
        self.has_items.push(false);
    }

    /// Writes `}`.
    pub fn end_object(&mut self) {
        self.has_items.pop();
        self.buf.push(b'}');
    }

    /// Writes `[`, after a separator if needed.
    pub fn begin_array(&mut self) {
        self.separator();
        self.buf.push(b'[');
        self.has_items.push(false);
    }

    /// Writes `]`.
    pub fn end_array(&mut self) {
        self.has_items.pop();
        self.buf.push(b']');
    }

    /// Writes an object member name followed by `:`.
    pub fn write_name(&mut self, name: &str) -> Result<(), serde_json::Error> {
        self.separator();
        serde_json::to_writer(&mut self.buf, name)?;
        self.buf.push(b':');
        self.after_name = true;
        Ok(())
    }

    /// Writes an escaped string value.
    pub fn write_string(&mut self, value: &str) -> Result<(), serde_json::Error> {
        self.separator();
        serde_json::to_writer(&mut self.buf, value)
    }

    /// Writes `true` or `false`.
    pub fn write_bool(&mut self, value: bool) {
        self.separator();
        self.buf
            .extend_from_slice(if value { b"true" } else { b"false" });
    }

    /// Writes `null`.
    pub fn write_null(&mut self) {
        self.separator();
        self.buf.extend_from_slice(b"null");
    }

    /// Writes an integer value.
    pub fn write_i64(&mut self, value: i64) -> Result<(), serde_json::Error> {
        self.separator();
        serde_json::to_writer(&mut self.buf, &value)
    }

    /// Writes a finite double. Non-finite values are the caller's concern.
    pub fn write_f64(&mut self, value: f64) -> Result<(), serde_json::Error> {
        self.separator();
        serde_json::to_writer(&mut self.buf, &value)
    }

    /// Writes `"name":"value"`.
    pub fn write_string_member(&mut self, name: &str, value: &str) -> Result<(), serde_json::Error> {
        self.write_name(name)?;
        self.write_string(value)
    }
}

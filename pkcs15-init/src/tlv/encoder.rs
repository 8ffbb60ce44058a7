//! Simple-TLV writer

use super::parser::TLVError;

/// Appends objects to a growing buffer
#[derive(Debug, Default)]
pub struct TlvWriter {
    out: Vec<u8>,
}

impl TlvWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `tag`, the length of `value` and `value`
    pub fn put(&mut self, tag: u8, value: &[u8]) -> Result<&mut Self, TLVError> {
        self.out.push(tag);
        match value.len() {
            len @ 0..=0x7F => self.out.push(len as u8),
            len @ 0x80..=0xFF => self.out.extend([0x81, len as u8]),
            len @ 0x100..=0xFFFF => {
                self.out.push(0x82);
                self.out.extend((len as u16).to_be_bytes());
            }
            len => return Err(TLVError::ValueTooLong(len)),
        }
        self.out.extend_from_slice(value);
        Ok(self)
    }

    /// Append a constructed object whose value `fill` writes
    pub fn nest(
        &mut self,
        tag: u8,
        fill: impl FnOnce(&mut TlvWriter) -> Result<(), TLVError>,
    ) -> Result<&mut Self, TLVError> {
        let mut inner = TlvWriter::new();
        fill(&mut inner)?;
        self.put(tag, &inner.out)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.out
    }
}

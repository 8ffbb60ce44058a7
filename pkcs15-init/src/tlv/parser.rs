//! Simple-TLV reader
//!
//! Data object requests only use one-byte tags. Lengths come in the short
//! form or the `81 xx` / `82 xx xx` long forms.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TLVError {
    #[error("Data ends inside the object at offset {0}")]
    Truncated(usize),

    #[error("Multi-byte tag {0:02X} at offset {1}")]
    UnsupportedTag(u8, usize),

    #[error("Unsupported length prefix {0:02X}")]
    UnsupportedLength(u8),

    #[error("Value of {0} bytes does not fit a two-byte length")]
    ValueTooLong(usize),
}

/// One object borrowed from the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tlv<'a> {
    pub tag: u8,
    pub value: &'a [u8],
}

impl<'a> Tlv<'a> {
    /// Objects nested in the value
    pub fn children(&self) -> TlvReader<'a> {
        TlvReader::new(self.value)
    }
}

/// Iterates over consecutive objects, stopping after the first error
pub struct TlvReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> TlvReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn byte(&self, at: usize) -> Result<u8, TLVError> {
        self.data.get(at).copied().ok_or(TLVError::Truncated(self.offset))
    }

    fn next_object(&mut self) -> Result<Tlv<'a>, TLVError> {
        let start = self.offset;
        let tag = self.byte(start)?;
        if tag & 0x1F == 0x1F {
            return Err(TLVError::UnsupportedTag(tag, start));
        }

        let (len, header) = match self.byte(start + 1)? {
            short @ 0x00..=0x7F => (usize::from(short), 2),
            0x81 => (usize::from(self.byte(start + 2)?), 3),
            0x82 => {
                let hi = usize::from(self.byte(start + 2)?);
                let lo = usize::from(self.byte(start + 3)?);
                ((hi << 8) | lo, 4)
            }
            other => return Err(TLVError::UnsupportedLength(other)),
        };

        let value = self
            .data
            .get(start + header..start + header + len)
            .ok_or(TLVError::Truncated(start))?;
        self.offset = start + header + len;
        Ok(Tlv { tag, value })
    }
}

impl<'a> Iterator for TlvReader<'a> {
    type Item = Result<Tlv<'a>, TLVError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.data.len() {
            return None;
        }
        let item = self.next_object();
        if item.is_err() {
            self.offset = self.data.len();
        }
        Some(item)
    }
}

/// Parse every object at the top level of `data`
pub fn read_all(data: &[u8]) -> Result<Vec<Tlv<'_>>, TLVError> {
    TlvReader::new(data).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_objects() {
        let data = hex::decode("620983020102850301FF0AA5023132").unwrap();
        let top = read_all(&data).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[1], Tlv { tag: 0xA5, value: b"12" });

        let fields: Vec<_> = top[0].children().collect::<Result<_, _>>().unwrap();
        assert_eq!(fields[0].tag, 0x83);
        assert_eq!(fields[1].value, &[0x01, 0xFF, 0x0A]);
    }

    #[test]
    fn test_long_lengths() {
        let mut data = vec![0xA5, 0x81, 0x80];
        data.extend([0x31; 128]);
        assert_eq!(read_all(&data).unwrap()[0].value.len(), 128);

        let mut data = vec![0xA5, 0x82, 0x01, 0x00];
        data.extend([0x32; 256]);
        assert_eq!(read_all(&data).unwrap()[0].value.len(), 256);
    }

    #[test]
    fn test_malformed_input() {
        assert_eq!(read_all(&[0x80, 0x02, 0x00]), Err(TLVError::Truncated(0)));
        assert_eq!(read_all(&[0x80, 0x82, 0x01]), Err(TLVError::Truncated(0)));
        assert_eq!(read_all(&[0x80, 0x83, 0, 0, 1]), Err(TLVError::UnsupportedLength(0x83)));
        assert_eq!(read_all(&[0x5F, 0x50, 0x00]), Err(TLVError::UnsupportedTag(0x5F, 0)));
    }

    #[test]
    fn test_reader_stops_after_error() {
        let mut reader = TlvReader::new(&[0x80, 0x05, 0x01]);
        assert!(matches!(reader.next(), Some(Err(_))));
        assert!(reader.next().is_none());
    }
}

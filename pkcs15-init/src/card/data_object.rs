//! Create-data-object request
//!
//! The payload of [`CardCtl::CreateDataObject`](super::CardCtl) is a TLV
//! encoded header followed by the object body:
//!
//! ```text
//! 62 L
//!    80 02 <body length, big-endian>
//!    83 02 <object type> <object id>
//!    85 03 <options> <flags> <retry limit>
//!    86 0F <security attributes>
//! A5 L <body>
//! ```

use zeroize::Zeroizing;

use crate::acl::{SecAttr, SEC_ATTR_SIZE};
use crate::error::{CardError, CardResult};
use crate::tlv::{read_all, tags, Tlv, TlvWriter};

/// Object type of a card holder verification (PIN) object
pub const DO_TYPE_CHV: u8 = 0x01;

/// Identifier of the administrator PIN object
pub const DO_ID_ADMIN: u8 = 0x01;
/// Identifier of the user PIN object
pub const DO_ID_USER: u8 = 0x02;

/// Object grants administrator rights once verified
pub const OPTIONS_ACCESS_ADMIN: u8 = 0x01;
/// Object grants user rights once verified
pub const OPTIONS_ACCESS_USER: u8 = 0x02;

/// Body is stored without padding
pub const FLAGS_COMPACT_DO: u8 = 0x01;

/// A data object creation request
#[derive(Clone, PartialEq, Eq)]
pub struct DataObjectRequest {
    pub object_type: u8,
    pub id: u8,
    pub options: u8,
    pub flags: u8,
    pub retry_limit: u8,
    pub sec_attr: SecAttr,
    pub body: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for DataObjectRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataObjectRequest")
            .field("object_type", &self.object_type)
            .field("id", &self.id)
            .field("options", &self.options)
            .field("flags", &self.flags)
            .field("retry_limit", &self.retry_limit)
            .field("sec_attr", &self.sec_attr)
            .field("body_len", &self.body.len())
            .finish()
    }
}

impl DataObjectRequest {
    /// Serialize the request for `card_ctl`
    pub fn encode(&self) -> CardResult<Zeroizing<Vec<u8>>> {
        let body_len = u16::try_from(self.body.len())
            .map_err(|_| CardError::InvalidArguments("data object body too long".into()))?;

        let mut w = TlvWriter::new();
        w.nest(tags::DO_HEADER, |h| {
            h.put(tags::BODY_LENGTH, &body_len.to_be_bytes())?
                .put(tags::OBJECT_TYPE_ID, &[self.object_type, self.id])?
                .put(tags::OBJECT_PARAMS, &[self.options, self.flags, self.retry_limit])?
                .put(tags::SECURITY_ATTRIBUTES, self.sec_attr.as_bytes())?;
            Ok(())
        })?
        .put(tags::DO_BODY, &self.body)?;
        Ok(Zeroizing::new(w.into_bytes()))
    }

    /// Parse a request produced by [`encode`](Self::encode)
    pub fn decode(data: &[u8]) -> CardResult<Self> {
        let top = read_all(data)?;
        let header = find(&top, tags::DO_HEADER)?;
        let body = find(&top, tags::DO_BODY)?;
        let fields = header.children().collect::<Result<Vec<_>, _>>()?;

        let body_len = fixed::<2>(&fields, tags::BODY_LENGTH)?;
        let [object_type, id] = fixed::<2>(&fields, tags::OBJECT_TYPE_ID)?;
        let [options, flags, retry_limit] = fixed::<3>(&fields, tags::OBJECT_PARAMS)?;
        let sec_attr = fixed::<SEC_ATTR_SIZE>(&fields, tags::SECURITY_ATTRIBUTES)?;

        if usize::from(u16::from_be_bytes(body_len)) != body.value.len() {
            return Err(CardError::InvalidArguments(format!(
                "declared body length {} but got {} bytes",
                u16::from_be_bytes(body_len),
                body.value.len()
            )));
        }

        Ok(Self {
            object_type,
            id,
            options,
            flags,
            retry_limit,
            sec_attr: SecAttr::new(sec_attr),
            body: Zeroizing::new(body.value.to_vec()),
        })
    }
}

fn find<'a>(list: &[Tlv<'a>], tag: u8) -> CardResult<Tlv<'a>> {
    list.iter()
        .find(|t| t.tag == tag)
        .copied()
        .ok_or_else(|| CardError::InvalidArguments(format!("missing tag {:02X}", tag)))
}

fn fixed<const N: usize>(list: &[Tlv<'_>], tag: u8) -> CardResult<[u8; N]> {
    let tlv = find(list, tag)?;
    <[u8; N]>::try_from(tlv.value).map_err(|_| {
        CardError::InvalidArguments(format!("tag {:02X} must hold {} bytes", tag, N))
    })
}

use crate::registry::HostRecord;
use bytes::BytesMut;
use thiserror::Error;
use tokio_util::codec::Decoder;

/// Separates the name and address segments of an advertisement payload.
const DELIMITER: &str = "::";

/// Decoded broadcast payload of the form `<name>::<address>`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Advertisement {
    pub name: String,
    pub address: String,
}

impl From<Advertisement> for HostRecord {
    fn from(advertisement: Advertisement) -> Self {
        Self {
            name: advertisement.name,
            address: advertisement.address,
        }
    }
}

/// Decodes one UDP datagram into an [Advertisement].
///
/// Payloads carry no length prefix or checksum; the datagram boundary is the
/// only framing. Segments past the address are ignored.
#[derive(Debug, Default)]
pub struct AdvertisementDecoder;

impl Decoder for AdvertisementDecoder {
    type Item = Advertisement;
    type Error = DecodeError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let payload = src.split_to(src.len());
        let text = std::str::from_utf8(&payload)?;
        let mut segments = text.splitn(3, DELIMITER);
        match (segments.next(), segments.next()) {
            (Some(name), Some(address)) if !name.is_empty() && !address.is_empty() => {
                Ok(Some(Advertisement {
                    name: name.into(),
                    address: address.into(),
                }))
            }
            _ => Err(DecodeError::Malformed),
        }
    }
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Error from network I/O")]
    Io(#[from] std::io::Error),

    #[error("Payload is not UTF-8 text")]
    NotText(#[from] std::str::Utf8Error),

    #[error("Payload does not contain a name and an address")]
    Malformed,
}

#[cfg(test)]
mod test {
    use super::*;

    fn decode(payload: &[u8]) -> Result<Option<Advertisement>, DecodeError> {
        AdvertisementDecoder.decode(&mut payload.into())
    }

    #[test]
    fn decode_advertisement() {
        let advertisement = decode(b"Server1::10.0.0.5").unwrap();
        assert_eq!(
            advertisement,
            Some(Advertisement {
                name: "Server1".into(),
                address: "10.0.0.5".into(),
            })
        );
    }

    #[test]
    fn trailing_segments_are_ignored() {
        let advertisement = decode(b"Server1::10.0.0.5::v2::extra").unwrap();
        assert_eq!(
            advertisement,
            Some(Advertisement {
                name: "Server1".into(),
                address: "10.0.0.5".into(),
            })
        );
    }

    #[test]
    fn decode_empty_datagram() {
        assert!(decode(b"").unwrap().is_none());
    }

    #[test]
    fn missing_delimiter_is_malformed() {
        assert!(matches!(
            decode(b"Server1 10.0.0.5"),
            Err(DecodeError::Malformed)
        ));
    }

    #[test]
    fn empty_segment_is_malformed() {
        assert!(matches!(decode(b"::10.0.0.5"), Err(DecodeError::Malformed)));
        assert!(matches!(decode(b"Server1::"), Err(DecodeError::Malformed)));
    }

    #[test]
    fn non_text_payload_is_rejected() {
        assert!(matches!(
            decode(&[0xFF, 0xFE, b':', b':', 0xFF]),
            Err(DecodeError::NotText(_))
        ));
    }
}

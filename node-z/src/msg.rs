use std::marker::PhantomData;

use cdr::{CdrLe, Infinite};
use serde::{Deserialize, Serialize};
use zenoh::bytes::ZBytes;

use crate::entity::Gid;

#[derive(Debug)]
pub struct DecodeError(String);

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CDR deserialization error: {}", self.0)
    }
}

impl std::error::Error for DecodeError {}

pub trait Serializer {
    type Input<'a>
    where
        Self: 'a;
    fn serialize(input: Self::Input<'_>) -> Vec<u8>;
}

pub trait Deserializer {
    type Output;
    fn deserialize(input: &[u8]) -> Result<Self::Output, DecodeError>;
}

/// A record that can cross the wire. Blanket-implemented for every
/// serde-compatible type via CDR.
pub trait Message: Send + Sync + Sized + 'static {
    type Serdes: for<'a> Serializer<Input<'a> = &'a Self> + Deserializer<Output = Self>;

    fn to_bytes(&self) -> Vec<u8> {
        Self::Serdes::serialize(self)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        Self::Serdes::deserialize(bytes)
    }
}

impl<T> Message for T
where
    T: Send + Sync + Serialize + for<'a> Deserialize<'a> + 'static,
{
    type Serdes = CdrSerdes<T>;
}

/// A request/response pair served over a queryable.
pub trait Service: Send + Sync + 'static {
    type Request: Message;
    type Response: Message;
}

// CDR

pub struct CdrSerdes<T>(PhantomData<T>);

impl<T> Serializer for CdrSerdes<T>
where
    T: Serialize,
{
    type Input<'a>
        = &'a T
    where
        T: 'a;

    fn serialize(input: &T) -> Vec<u8> {
        cdr::serialize::<_, _, CdrLe>(input, Infinite).unwrap()
    }
}

impl<T> Deserializer for CdrSerdes<T>
where
    for<'a> T: Deserialize<'a>,
{
    type Output = T;

    fn deserialize(input: &[u8]) -> Result<T, DecodeError> {
        cdr::deserialize::<T>(input).map_err(|e| DecodeError(e.to_string()))
    }
}

/// Per-sample metadata attached to publications, requests, and replies:
/// a sequence number plus the source endpoint's GID.
pub struct Attachment {
    pub sequence_number: i64,
    pub source_gid: Gid,
}

impl Attachment {
    pub fn new(sequence_number: i64, source_gid: Gid) -> Self {
        Self {
            sequence_number,
            source_gid,
        }
    }
}

impl TryFrom<&ZBytes> for Attachment {
    type Error = zenoh::Error;
    fn try_from(value: &ZBytes) -> Result<Self, Self::Error> {
        let mut des = zenoh_ext::ZDeserializer::new(value);
        let sequence_number = des.deserialize::<i64>()?;
        let source_gid = des.deserialize::<Gid>()?;
        Ok(Attachment {
            sequence_number,
            source_gid,
        })
    }
}

impl From<Attachment> for ZBytes {
    fn from(value: Attachment) -> Self {
        let mut ser = zenoh_ext::ZSerializer::new();
        ser.serialize(value.sequence_number);
        ser.serialize(&value.source_gid);
        ser.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Probe {
        data: String,
        n: u32,
    }

    #[test]
    fn cdr_round_trip() {
        let probe = Probe {
            data: "hello".to_string(),
            n: 7,
        };
        let bytes = probe.to_bytes();
        assert_eq!(Probe::from_bytes(&bytes).unwrap(), probe);
    }

    #[test]
    fn cdr_rejects_garbage() {
        assert!(Probe::from_bytes(&[0u8; 3]).is_err());
    }

    #[test]
    fn attachment_round_trip() {
        let att = Attachment::new(42, [7u8; 16]);
        let bytes: ZBytes = att.into();
        let back = Attachment::try_from(&bytes).unwrap();
        assert_eq!(back.sequence_number, 42);
        assert_eq!(back.source_gid, [7u8; 16]);
    }
}

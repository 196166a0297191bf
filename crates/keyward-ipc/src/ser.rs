//! Message serialization.

use postcard::ser_flavors::Flavor;
use tracing::error;

use crate::{error::SerializeError, message::Invocation};

/// The buffer size a message needs.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BufferLength {
    /// The exact serialized size of the message.
    pub minimum: usize,
    /// The part of `minimum` that does not depend on the
    /// contents of the message's memory regions.
    ///
    /// Length prefixes are included. A prefix never shrinks as
    /// the region grows, so the overhead measured with a whole
    /// region bounds the overhead of any of its chunks.
    pub fixed_overhead: usize,
}

/// Counts bytes instead of writing them.
#[derive(Default)]
struct Counter(usize);

impl Flavor for Counter {
    type Output = usize;

    #[inline]
    fn try_push(&mut self, _data: u8) -> postcard::Result<()> {
        self.try_extend(&[0])
    }

    #[inline]
    fn try_extend(&mut self, data: &[u8]) -> postcard::Result<()> {
        self.0 = self
            .0
            .checked_add(data.len())
            .ok_or(postcard::Error::SerializeBufferFull)?;
        Ok(())
    }

    fn finalize(self) -> postcard::Result<usize> {
        Ok(self.0)
    }
}

/// Computes the buffer size needed to serialize `msg`.
pub fn serialized_length(msg: &Invocation<'_>) -> Result<BufferLength, SerializeError> {
    let minimum = postcard::serialize_with_flavor(msg, Counter::default())?;
    let fixed_overhead = minimum.saturating_sub(msg.region_bytes());
    Ok(BufferLength {
        minimum,
        fixed_overhead,
    })
}

/// Serializes `msg` into `dst`, returning the written prefix.
///
/// Fails with [`SerializeError::BufferTooSmall`] if `dst`
/// cannot hold the whole message. Nothing useful is left in
/// `dst` in that case.
pub fn serialize_message<'b>(
    msg: &Invocation<'_>,
    dst: &'b mut [u8],
) -> Result<&'b mut [u8], SerializeError> {
    let len = serialized_length(msg)?;
    if len.minimum > dst.len() {
        error!(
            task = %msg.task(),
            required = len.minimum,
            available = dst.len(),
            "send buffer too small"
        );
        return Err(SerializeError::BufferTooSmall {
            required: len.minimum,
            available: dst.len(),
        });
    }
    Ok(postcard::to_slice(msg, dst)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        de::deserialize_message,
        id::ObjectId,
        message::{Slot, SlotRef},
        task::TaskId,
    };

    fn invocation<'a>(data: &'a [u8], name: &'a str) -> Invocation<'a> {
        let mut inv = Invocation::new(TaskId::new(2, 3), ObjectId::new(5, 1));
        inv.push(SlotRef::U32(17));
        inv.push(SlotRef::Bytes(data));
        inv.push(SlotRef::Str(name));
        inv
    }

    #[test]
    fn test_length_matches_encoding() {
        let data = [7u8; 300];
        let inv = invocation(&data, "digest");
        let len = serialized_length(&inv).unwrap();
        let encoded = postcard::to_allocvec(&inv).unwrap();
        assert_eq!(len.minimum, encoded.len());
        assert_eq!(len.fixed_overhead, encoded.len() - data.len());
    }

    #[test]
    fn test_buffer_too_small() {
        let data = [1u8; 64];
        let inv = invocation(&data, "x");
        let len = serialized_length(&inv).unwrap();

        let mut buf = vec![0u8; len.minimum - 1];
        let err = serialize_message(&inv, &mut buf).unwrap_err();
        assert_eq!(
            err,
            SerializeError::BufferTooSmall {
                required: len.minimum,
                available: len.minimum - 1,
            }
        );

        let mut buf = vec![0u8; len.minimum];
        assert_eq!(serialize_message(&inv, &mut buf).unwrap().len(), len.minimum);
    }

    #[test]
    fn test_order_is_significant() {
        let mut a = Invocation::new(TaskId::new(1, 1), ObjectId::PROVIDER);
        a.push(SlotRef::U64(1));
        a.push(SlotRef::U64(2));
        let mut b = Invocation::new(TaskId::new(1, 1), ObjectId::PROVIDER);
        b.push(SlotRef::U64(2));
        b.push(SlotRef::U64(1));

        let mut x = [0u8; 64];
        let mut y = [0u8; 64];
        let x = serialize_message(&a, &mut x).unwrap();
        let y = serialize_message(&b, &mut y).unwrap();
        assert_ne!(x, y);

        let env = deserialize_message(x).unwrap();
        assert_eq!(env.slots, [Slot::U64(1), Slot::U64(2)]);
    }
}

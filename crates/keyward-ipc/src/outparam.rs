//! Copying results back into the caller's variables.
//!
//! Every argument of a remote call is described by an [`Arg`].
//! After the round trip, [`assign_all_out_parameters`] walks
//! the arguments in order and, for each [`Arg::Out`], hands the
//! matching response slot to the argument's [`OutParam`] impl.
//! The impl decides how the value is propagated:
//!
//! | caller's argument        | policy                                   |
//! |--------------------------|------------------------------------------|
//! | [`Region`]               | copy the prefix, fail if the answer grew |
//! | `bool`, integers, owned  | plain assignment                         |
//! | `Option<T>`              | copy if both sides are `Some`, else None |
//! | [`Arg::In`]              | nothing                                  |
//! | [`Arg::Object`]          | nothing, proxy identity never changes    |

use crate::{
    de::{FromSlot, LifetimeManager, Response},
    error::{Error, SlotError},
    id::ObjectId,
    message::{Slot, SlotKind, SlotRef, ToSlot},
    proxy::Proxy,
};

/// An argument of a remote call.
pub enum Arg<'a> {
    /// An argument the call only reads.
    In(SlotRef<'a>),
    /// An argument the call may modify.
    Out(&'a mut dyn OutParam),
    /// A reference to another proxy.
    Object(ObjectId),
}

impl<'a> Arg<'a> {
    /// Passes `v` by value.
    pub fn value<T: ToSlot + ?Sized>(v: &'a T) -> Self {
        Self::In(v.to_slot())
    }

    /// Passes `v` by mutable reference.
    pub fn out(v: &'a mut dyn OutParam) -> Self {
        Self::Out(v)
    }

    /// Passes a reference to `proxy`.
    pub fn object<P: Proxy>(proxy: &P) -> Self {
        Self::Object(proxy.object_id())
    }

    /// Returns the slot the argument is sent as.
    pub fn slot(&self) -> SlotRef<'_> {
        match self {
            Self::In(slot) => slot.clone(),
            Self::Out(v) => v.slot(),
            Self::Object(id) => SlotRef::Proxy(*id),
        }
    }
}

impl core::fmt::Debug for Arg<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::In(slot) => f.debug_tuple("In").field(slot).finish(),
            Self::Out(v) => f.debug_tuple("Out").field(&v.slot().kind()).finish(),
            Self::Object(id) => f.debug_tuple("Object").field(id).finish(),
        }
    }
}

/// A variable the server may update.
pub trait OutParam {
    /// Returns the current value as sent to the server.
    fn slot(&self) -> SlotRef<'_>;

    /// Stores the server's answer.
    fn assign(&mut self, slot: Slot, objects: &mut LifetimeManager) -> Result<(), SlotError>;
}

/// A writable memory region.
///
/// The server's answer is copied into the front of the region.
/// Bytes past the answer are left alone. An answer larger than
/// the region is an error, it is never truncated.
#[derive(Debug)]
pub struct Region<'a> {
    buf: &'a mut [u8],
    written: usize,
}

impl<'a> Region<'a> {
    /// Wraps `buf`.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, written: 0 }
    }

    /// Returns the number of bytes the server wrote.
    pub const fn written(&self) -> usize {
        self.written
    }

    /// Returns the size of the region.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }
}

impl OutParam for Region<'_> {
    fn slot(&self) -> SlotRef<'_> {
        SlotRef::MutBytes(self.buf)
    }

    fn assign(&mut self, slot: Slot, _objects: &mut LifetimeManager) -> Result<(), SlotError> {
        let data = match slot {
            Slot::MutBytes(data) => data,
            slot => {
                return Err(SlotError::Mismatch {
                    expected: SlotKind::MutBytes,
                    found: slot.kind(),
                });
            }
        };
        let capacity = self.buf.len();
        let dst = self
            .buf
            .get_mut(..data.len())
            .ok_or(SlotError::Overflow {
                capacity,
                received: data.len(),
            })?;
        dst.copy_from_slice(&data);
        self.written = data.len();
        Ok(())
    }
}

macro_rules! plain_out_param {
    ($($ty:ty),* $(,)?) => {
        $(
            impl OutParam for $ty {
                fn slot(&self) -> SlotRef<'_> {
                    self.to_slot()
                }

                fn assign(&mut self, slot: Slot, objects: &mut LifetimeManager) -> Result<(), SlotError> {
                    *self = <$ty>::from_slot(slot, objects)?;
                    Ok(())
                }
            }
        )*
    };
}
plain_out_param!(bool, u8, u32, u64, i64, usize, String, Vec<u8>);

impl<T> OutParam for Option<T>
where
    T: ToSlot + FromSlot,
{
    fn slot(&self) -> SlotRef<'_> {
        self.to_slot()
    }

    fn assign(&mut self, slot: Slot, objects: &mut LifetimeManager) -> Result<(), SlotError> {
        let answer = Option::<T>::from_slot(slot, objects)?;
        match answer {
            Some(v) if self.is_some() => *self = Some(v),
            _ => *self = None,
        }
        Ok(())
    }
}

/// Copies the response's slots back into the caller's `args`.
///
/// Argument `i` receives response slot `i + start`. Arguments
/// other than [`Arg::Out`] are left alone.
pub fn assign_all_out_parameters(
    start: usize,
    response: &mut Response,
    args: &mut [Arg<'_>],
) -> Result<(), Error> {
    for (i, arg) in args.iter_mut().enumerate() {
        let Arg::Out(param) = arg else {
            continue;
        };
        let index = i.checked_add(start).ok_or(SlotError::OutOfRange.at(i))?;
        let slot = response.take(index)?;
        param
            .assign(slot, response.objects_mut())
            .map_err(|err| match err {
                SlotError::Overflow { capacity, received } => Error::OutParamOverflow {
                    index: i,
                    capacity,
                    received,
                },
                err => err.at(index).into(),
            })?;
    }
    Ok(())
}

//! The message model.
//!
//! An envelope is a `(task, object, slots)` triple. Each slot
//! is written as a tag (the enum variant index) followed by its
//! payload:
//!
//! - primitives use postcard's encoding,
//! - memory regions are length-prefixed bytes,
//! - proxy references are [`ObjectId`]s,
//! - result-wrapped values are `Ok(payload)` or `Err(code)`.
//!
//! Requests are encoded from borrowed [`SlotRef`]s so that the
//! caller's buffers are never copied before serialization.
//! Responses are decoded into owned [`Slot`]s. The two enums
//! must keep the same variants in the same order.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::{error::ErrorCode, id::ObjectId, task::TaskId};

/// The server's answer to a factory call.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum SerializationTag {
    /// The server created the object.
    SkeletonCreated,
    /// The server did not create the object.
    SkeletonNotCreated,
}

/// A decoded argument or return value.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Slot {
    /// No value.
    Unit,
    /// A boolean.
    Bool(bool),
    /// A byte.
    U8(u8),
    /// A 32-bit unsigned integer.
    U32(u32),
    /// A 64-bit unsigned integer.
    U64(u64),
    /// A 64-bit signed integer.
    I64(i64),
    /// A read-only memory region.
    Bytes(Vec<u8>),
    /// A writable memory region.
    MutBytes(Vec<u8>),
    /// A string.
    Str(String),
    /// A reference to a proxy object.
    Proxy(ObjectId),
    /// A factory call's creation tag.
    Tag(SerializationTag),
    /// A value that may be absent.
    Optional(Option<Box<Slot>>),
    /// A result-wrapped value.
    Fallible(Result<Box<Slot>, ErrorCode>),
    /// A sequence of values.
    List(Vec<Slot>),
}

impl Slot {
    /// Returns the slot's kind.
    pub fn kind(&self) -> SlotKind {
        match self {
            Self::Unit => SlotKind::Unit,
            Self::Bool(_) => SlotKind::Bool,
            Self::U8(_) => SlotKind::U8,
            Self::U32(_) => SlotKind::U32,
            Self::U64(_) => SlotKind::U64,
            Self::I64(_) => SlotKind::I64,
            Self::Bytes(_) => SlotKind::Bytes,
            Self::MutBytes(_) => SlotKind::MutBytes,
            Self::Str(_) => SlotKind::Str,
            Self::Proxy(_) => SlotKind::Proxy,
            Self::Tag(_) => SlotKind::Tag,
            Self::Optional(_) => SlotKind::Optional,
            Self::Fallible(_) => SlotKind::Fallible,
            Self::List(_) => SlotKind::List,
        }
    }

    /// Borrows the slot for encoding.
    pub fn as_ref(&self) -> SlotRef<'_> {
        match self {
            Self::Unit => SlotRef::Unit,
            Self::Bool(v) => SlotRef::Bool(*v),
            Self::U8(v) => SlotRef::U8(*v),
            Self::U32(v) => SlotRef::U32(*v),
            Self::U64(v) => SlotRef::U64(*v),
            Self::I64(v) => SlotRef::I64(*v),
            Self::Bytes(v) => SlotRef::Bytes(v),
            Self::MutBytes(v) => SlotRef::MutBytes(v),
            Self::Str(v) => SlotRef::Str(v),
            Self::Proxy(id) => SlotRef::Proxy(*id),
            Self::Tag(tag) => SlotRef::Tag(*tag),
            Self::Optional(v) => {
                SlotRef::Optional(v.as_deref().map(|v| Box::new(Self::as_ref(v))))
            }
            Self::Fallible(v) => SlotRef::Fallible(match v {
                Ok(v) => Ok(Box::new(Self::as_ref(v))),
                Err(code) => Err(*code),
            }),
            Self::List(v) => SlotRef::List(v.iter().map(Self::as_ref).collect()),
        }
    }
}

/// A borrowed [`Slot`] used when encoding requests.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename = "Slot")]
pub enum SlotRef<'a> {
    /// No value.
    Unit,
    /// A boolean.
    Bool(bool),
    /// A byte.
    U8(u8),
    /// A 32-bit unsigned integer.
    U32(u32),
    /// A 64-bit unsigned integer.
    U64(u64),
    /// A 64-bit signed integer.
    I64(i64),
    /// A read-only memory region.
    Bytes(&'a [u8]),
    /// A writable memory region.
    MutBytes(&'a [u8]),
    /// A string.
    Str(&'a str),
    /// A reference to a proxy object.
    Proxy(ObjectId),
    /// A factory call's creation tag.
    Tag(SerializationTag),
    /// A value that may be absent.
    Optional(Option<Box<SlotRef<'a>>>),
    /// A result-wrapped value.
    Fallible(Result<Box<SlotRef<'a>>, ErrorCode>),
    /// A sequence of values.
    List(Vec<SlotRef<'a>>),
}

impl SlotRef<'_> {
    /// Returns the slot's kind.
    pub fn kind(&self) -> SlotKind {
        match self {
            Self::Unit => SlotKind::Unit,
            Self::Bool(_) => SlotKind::Bool,
            Self::U8(_) => SlotKind::U8,
            Self::U32(_) => SlotKind::U32,
            Self::U64(_) => SlotKind::U64,
            Self::I64(_) => SlotKind::I64,
            Self::Bytes(_) => SlotKind::Bytes,
            Self::MutBytes(_) => SlotKind::MutBytes,
            Self::Str(_) => SlotKind::Str,
            Self::Proxy(_) => SlotKind::Proxy,
            Self::Tag(_) => SlotKind::Tag,
            Self::Optional(_) => SlotKind::Optional,
            Self::Fallible(_) => SlotKind::Fallible,
            Self::List(_) => SlotKind::List,
        }
    }

    /// Returns the number of payload bytes held by a memory
    /// region, or zero.
    pub fn region_len(&self) -> usize {
        match self {
            Self::Bytes(v) | Self::MutBytes(v) => v.len(),
            _ => 0,
        }
    }

    /// Calls `f` with every object id referenced by the slot.
    pub(crate) fn for_each_object(&self, f: &mut impl FnMut(ObjectId)) {
        match self {
            Self::Proxy(id) => f(*id),
            Self::Optional(Some(v)) | Self::Fallible(Ok(v)) => v.for_each_object(f),
            Self::List(v) => v.iter().for_each(|v| v.for_each_object(f)),
            _ => {}
        }
    }
}

/// The runtime kind of a slot.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum SlotKind {
    /// [`Slot::Unit`].
    Unit,
    /// [`Slot::Bool`].
    Bool,
    /// [`Slot::U8`].
    U8,
    /// [`Slot::U32`].
    U32,
    /// [`Slot::U64`].
    U64,
    /// [`Slot::I64`].
    I64,
    /// [`Slot::Bytes`].
    Bytes,
    /// [`Slot::MutBytes`].
    MutBytes,
    /// [`Slot::Str`].
    Str,
    /// [`Slot::Proxy`].
    Proxy,
    /// [`Slot::Tag`].
    Tag,
    /// [`Slot::Optional`].
    Optional,
    /// [`Slot::Fallible`].
    Fallible,
    /// [`Slot::List`].
    List,
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unit => "unit",
            Self::Bool => "bool",
            Self::U8 => "u8",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::I64 => "i64",
            Self::Bytes => "read-only region",
            Self::MutBytes => "writable region",
            Self::Str => "string",
            Self::Proxy => "proxy reference",
            Self::Tag => "serialization tag",
            Self::Optional => "optional value",
            Self::Fallible => "result",
            Self::List => "list",
        };
        f.write_str(name)
    }
}

/// Converts a value into a [`SlotRef`] without copying it.
pub trait ToSlot {
    /// Borrows the value as a slot.
    fn to_slot(&self) -> SlotRef<'_>;
}

macro_rules! to_slot_copy {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl ToSlot for $ty {
                #[inline]
                fn to_slot(&self) -> SlotRef<'_> {
                    SlotRef::$variant(*self)
                }
            }
        )*
    };
}
to_slot_copy! {
    bool => Bool,
    u8 => U8,
    u32 => U32,
    u64 => U64,
    i64 => I64,
    ObjectId => Proxy,
    SerializationTag => Tag,
}

impl ToSlot for usize {
    #[inline]
    fn to_slot(&self) -> SlotRef<'_> {
        SlotRef::U64(*self as u64)
    }
}

impl ToSlot for [u8] {
    #[inline]
    fn to_slot(&self) -> SlotRef<'_> {
        SlotRef::Bytes(self)
    }
}

impl ToSlot for Vec<u8> {
    #[inline]
    fn to_slot(&self) -> SlotRef<'_> {
        SlotRef::Bytes(self)
    }
}

impl ToSlot for str {
    #[inline]
    fn to_slot(&self) -> SlotRef<'_> {
        SlotRef::Str(self)
    }
}

impl ToSlot for String {
    #[inline]
    fn to_slot(&self) -> SlotRef<'_> {
        SlotRef::Str(self)
    }
}

impl<T: ToSlot> ToSlot for Option<T> {
    fn to_slot(&self) -> SlotRef<'_> {
        SlotRef::Optional(self.as_ref().map(|v| Box::new(v.to_slot())))
    }
}

/// A decoded message.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// The operation.
    pub task: TaskId,
    /// The targeted object.
    pub object: ObjectId,
    /// The arguments (and, in a response, the return value).
    pub slots: Vec<Slot>,
}

/// A request that borrows the caller's arguments.
///
/// Encodes exactly like an [`Envelope`] with the same contents.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename = "Envelope")]
pub struct Invocation<'a> {
    task: TaskId,
    object: ObjectId,
    slots: Vec<SlotRef<'a>>,
}

impl<'a> Invocation<'a> {
    /// Creates an invocation without arguments.
    pub const fn new(task: TaskId, object: ObjectId) -> Self {
        Self {
            task,
            object,
            slots: Vec::new(),
        }
    }

    pub(crate) fn with_slots(task: TaskId, object: ObjectId, slots: Vec<SlotRef<'a>>) -> Self {
        Self {
            task,
            object,
            slots,
        }
    }

    /// Returns the task.
    pub const fn task(&self) -> TaskId {
        self.task
    }

    /// Returns the targeted object.
    pub const fn object(&self) -> ObjectId {
        self.object
    }

    /// Returns the slots.
    pub fn slots(&self) -> &[SlotRef<'a>] {
        &self.slots
    }

    /// Appends a slot.
    pub fn push(&mut self, slot: SlotRef<'a>) {
        self.slots.push(slot);
    }

    /// Appends the id of a proxy minted for this call so that
    /// the server can register its counterpart.
    ///
    /// Must happen before serialization.
    pub fn add_new_proxy_id(&mut self, id: ObjectId) {
        self.push(SlotRef::Proxy(id));
    }

    /// Appends the ids of several proxies minted for this call.
    pub fn add_new_proxy_ids(&mut self, ids: &[ObjectId]) {
        self.push(SlotRef::List(ids.iter().copied().map(SlotRef::Proxy).collect()));
    }

    /// Returns the total size of the top-level memory regions.
    pub fn region_bytes(&self) -> usize {
        self.slots
            .iter()
            .fold(0usize, |acc, s| acc.saturating_add(s.region_len()))
    }

    pub(crate) fn for_each_object(&self, mut f: impl FnMut(ObjectId)) {
        for slot in &self.slots {
            slot.for_each_object(&mut f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Envelope {
        Envelope {
            task: TaskId::new(3, 9),
            object: ObjectId::new(4, 2),
            slots: vec![
                Slot::Unit,
                Slot::Bool(true),
                Slot::U8(0xab),
                Slot::U32(7),
                Slot::U64(u64::MAX),
                Slot::I64(-12),
                Slot::Bytes(b"abc".to_vec()),
                Slot::MutBytes(vec![0; 40]),
                Slot::Str("cn=root".into()),
                Slot::Proxy(ObjectId::new(1, 1)),
                Slot::Tag(SerializationTag::SkeletonNotCreated),
                Slot::Optional(Some(Box::new(Slot::U32(1)))),
                Slot::Optional(None),
                Slot::Fallible(Ok(Box::new(Slot::Unit))),
                Slot::Fallible(Err(ErrorCode::UninitializedContext)),
                Slot::List(vec![Slot::Proxy(ObjectId::new(2, 1)), Slot::U64(3)]),
            ],
        }
    }

    /// Requests and responses must share one encoding.
    #[test]
    fn test_borrowed_and_owned_encodings_agree() {
        let env = sample();
        let inv = Invocation::with_slots(env.task, env.object, env.slots.iter().map(Slot::as_ref).collect());
        let a = postcard::to_allocvec(&env).unwrap();
        let b = postcard::to_allocvec(&inv).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_kinds_agree() {
        for slot in sample().slots {
            assert_eq!(slot.kind(), slot.as_ref().kind());
        }
    }

    #[test]
    fn test_region_bytes() {
        let data = [0u8; 10];
        let out = [0u8; 5];
        let mut inv = Invocation::new(TaskId::new(1, 1), ObjectId::PROVIDER);
        inv.push(SlotRef::Bytes(&data));
        inv.push(SlotRef::U64(99));
        inv.push(SlotRef::MutBytes(&out));
        assert_eq!(inv.region_bytes(), 15);
    }

    #[test]
    fn test_object_walk() {
        let mut inv = Invocation::new(TaskId::new(1, 1), ObjectId::PROVIDER);
        inv.push(SlotRef::Proxy(ObjectId::new(1, 1)));
        inv.add_new_proxy_ids(&[ObjectId::new(2, 1), ObjectId::new(3, 1)]);
        inv.push(SlotRef::Optional(Some(Box::new(SlotRef::Proxy(ObjectId::new(4, 1))))));
        let mut seen = Vec::new();
        inv.for_each_object(|id| seen.push(id.index()));
        assert_eq!(seen, [1, 2, 3, 4]);
    }
}

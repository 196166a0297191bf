//! Message deserialization.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    error::{DeserializeError, Error, ErrorCode, SlotError},
    id::ObjectId,
    message::{Envelope, Invocation, SerializationTag, Slot, SlotKind},
    proxy::ProxyBase,
    task::TaskId,
};

/// Parses a single envelope.
///
/// The whole buffer must be consumed.
pub fn deserialize_message(bytes: &[u8]) -> Result<Envelope, DeserializeError> {
    let (env, rest) =
        postcard::take_from_bytes::<Envelope>(bytes).map_err(DeserializeError::Malformed)?;
    if !rest.is_empty() {
        return Err(DeserializeError::TrailingBytes(rest.len()));
    }
    Ok(env)
}

/// Tracks the objects a single response may refer to.
///
/// A manager lives for exactly one call. It knows every object
/// mentioned by the request and holds the proxies that were
/// minted for the call. Each of those proxies is handed out at
/// most once; later references to the same id resolve to an
/// [`ObjectRef`]. Proxies that were never claimed are dropped
/// with the manager, which releases their ids without telling
/// the server.
#[derive(Debug, Default)]
pub struct LifetimeManager {
    known: BTreeSet<ObjectId>,
    pending: BTreeMap<ObjectId, ProxyBase>,
    claimed: BTreeSet<ObjectId>,
}

impl LifetimeManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that the request mentions `id`.
    pub fn know(&mut self, id: ObjectId) {
        self.known.insert(id);
    }

    /// Holds a proxy minted for this call until the response
    /// claims it.
    pub fn expect(&mut self, proxy: ProxyBase) {
        let id = proxy.id();
        self.known.insert(id);
        self.pending.insert(id, proxy);
    }

    /// Reports whether `id` may appear in the response.
    pub fn is_known(&self, id: ObjectId) -> bool {
        self.known.contains(&id)
    }

    /// Resolves a reference to an object.
    pub fn resolve(&self, id: ObjectId) -> Result<ObjectRef, SlotError> {
        if self.is_known(id) {
            Ok(ObjectRef(id))
        } else {
            Err(SlotError::UnknownObject(id))
        }
    }

    /// Takes ownership of the proxy minted as `id`.
    pub fn claim(&mut self, id: ObjectId) -> Result<ProxyBase, SlotError> {
        if let Some(proxy) = self.pending.remove(&id) {
            self.claimed.insert(id);
            Ok(proxy)
        } else if self.claimed.contains(&id) {
            Err(SlotError::DuplicateObject(id))
        } else {
            Err(SlotError::UnknownObject(id))
        }
    }

    /// Returns the number of proxies that are still unclaimed.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

/// A reference to an object that the caller already owns.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ObjectRef(ObjectId);

impl ObjectRef {
    /// Returns the object's id.
    pub const fn id(self) -> ObjectId {
        self.0
    }
}

/// Converts a decoded [`Slot`] into a typed value.
pub trait FromSlot: Sized {
    /// The kind of slot the type is read from.
    const KIND: SlotKind;

    /// Converts `slot`, resolving object references through
    /// `objects`.
    fn from_slot(slot: Slot, objects: &mut LifetimeManager) -> Result<Self, SlotError>;
}

fn mismatch<T: FromSlot>(slot: &Slot) -> SlotError {
    SlotError::Mismatch {
        expected: T::KIND,
        found: slot.kind(),
    }
}

macro_rules! from_slot {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FromSlot for $ty {
                const KIND: SlotKind = SlotKind::$variant;

                fn from_slot(slot: Slot, _objects: &mut LifetimeManager) -> Result<Self, SlotError> {
                    match slot {
                        Slot::$variant(v) => Ok(v),
                        slot => Err(mismatch::<Self>(&slot)),
                    }
                }
            }
        )*
    };
}
from_slot! {
    bool => Bool,
    u8 => U8,
    u32 => U32,
    u64 => U64,
    i64 => I64,
    String => Str,
    SerializationTag => Tag,
}

impl FromSlot for () {
    const KIND: SlotKind = SlotKind::Unit;

    fn from_slot(slot: Slot, _objects: &mut LifetimeManager) -> Result<Self, SlotError> {
        match slot {
            Slot::Unit => Ok(()),
            slot => Err(mismatch::<Self>(&slot)),
        }
    }
}

impl FromSlot for usize {
    const KIND: SlotKind = SlotKind::U64;

    fn from_slot(slot: Slot, objects: &mut LifetimeManager) -> Result<Self, SlotError> {
        let v = u64::from_slot(slot, objects)?;
        usize::try_from(v).map_err(|_| SlotError::OutOfRange)
    }
}

impl FromSlot for Vec<u8> {
    const KIND: SlotKind = SlotKind::Bytes;

    fn from_slot(slot: Slot, _objects: &mut LifetimeManager) -> Result<Self, SlotError> {
        match slot {
            Slot::Bytes(v) | Slot::MutBytes(v) => Ok(v),
            slot => Err(mismatch::<Self>(&slot)),
        }
    }
}

impl FromSlot for ObjectRef {
    const KIND: SlotKind = SlotKind::Proxy;

    fn from_slot(slot: Slot, objects: &mut LifetimeManager) -> Result<Self, SlotError> {
        match slot {
            Slot::Proxy(id) => objects.resolve(id),
            slot => Err(mismatch::<Self>(&slot)),
        }
    }
}

impl FromSlot for ProxyBase {
    const KIND: SlotKind = SlotKind::Proxy;

    fn from_slot(slot: Slot, objects: &mut LifetimeManager) -> Result<Self, SlotError> {
        match slot {
            Slot::Proxy(id) => objects.claim(id),
            slot => Err(mismatch::<Self>(&slot)),
        }
    }
}

impl<T: FromSlot> FromSlot for Option<T> {
    const KIND: SlotKind = SlotKind::Optional;

    fn from_slot(slot: Slot, objects: &mut LifetimeManager) -> Result<Self, SlotError> {
        match slot {
            Slot::Optional(None) => Ok(None),
            Slot::Optional(Some(v)) => T::from_slot(*v, objects).map(Some),
            slot => Err(mismatch::<Self>(&slot)),
        }
    }
}

fn check_objects(slot: &Slot, objects: &LifetimeManager) -> Result<(), SlotError> {
    match slot {
        Slot::Proxy(id) => objects.resolve(*id).map(|_| ()),
        Slot::Optional(Some(v)) | Slot::Fallible(Ok(v)) => check_objects(v, objects),
        Slot::List(v) => v.iter().try_for_each(|v| check_objects(v, objects)),
        _ => Ok(()),
    }
}

/// A response that was checked against its request.
///
/// Slot `i` of the request corresponds to slot `i + start` of
/// the response, where `start` is one if the operation returns
/// a value in slot zero.
#[derive(Debug)]
pub struct Response {
    task: TaskId,
    object: ObjectId,
    slots: Vec<Option<Slot>>,
    objects: LifetimeManager,
}

impl Response {
    /// Checks `env` against `request`.
    ///
    /// The response must answer the same task on the same
    /// object and carry one slot per request slot (plus the
    /// return slot), each of the same kind as the request's.
    /// Every object it mentions must be known to `objects`.
    pub fn new(
        env: Envelope,
        request: &Invocation<'_>,
        start: usize,
        mut objects: LifetimeManager,
    ) -> Result<Self, DeserializeError> {
        if env.task != request.task() {
            return Err(DeserializeError::TaskMismatch {
                expected: request.task(),
                found: env.task,
            });
        }
        if env.object != request.object() {
            return Err(DeserializeError::ObjectMismatch {
                expected: request.object(),
                found: env.object,
            });
        }
        let expected = request.slots().len().saturating_add(start);
        if env.slots.len() != expected {
            return Err(DeserializeError::SlotCount {
                expected,
                found: env.slots.len(),
            });
        }

        objects.know(request.object());
        request.for_each_object(|id| objects.know(id));

        for (i, (req, resp)) in request
            .slots()
            .iter()
            .zip(env.slots.iter().skip(start))
            .enumerate()
        {
            if req.kind() != resp.kind() {
                let err = SlotError::Mismatch {
                    expected: req.kind(),
                    found: resp.kind(),
                };
                return Err(err.at(i.saturating_add(start)));
            }
        }
        for (i, slot) in env.slots.iter().enumerate() {
            check_objects(slot, &objects).map_err(|err| err.at(i))?;
        }

        Ok(Self {
            task: env.task,
            object: env.object,
            slots: env.slots.into_iter().map(Some).collect(),
            objects,
        })
    }

    /// Returns the task.
    pub const fn task(&self) -> TaskId {
        self.task
    }

    /// Returns the object.
    pub const fn object(&self) -> ObjectId {
        self.object
    }

    /// Returns the number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Reports whether the response has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Takes slot `index`.
    pub fn take(&mut self, index: usize) -> Result<Slot, DeserializeError> {
        self.slots
            .get_mut(index)
            .ok_or(SlotError::Missing.at(index))?
            .take()
            .ok_or(SlotError::Consumed.at(index))
    }

    /// Takes slot `index` as a `T`.
    pub fn take_as<T: FromSlot>(&mut self, index: usize) -> Result<T, DeserializeError> {
        let slot = self.take(index)?;
        T::from_slot(slot, &mut self.objects).map_err(|err| err.at(index))
    }

    /// Unwraps the result-wrapped value in slot zero.
    ///
    /// A server error becomes [`Error::Remote`] with the code
    /// unchanged.
    pub fn raise(&mut self) -> Result<Slot, Error> {
        match self.take(0)? {
            Slot::Fallible(Ok(v)) => Ok(*v),
            Slot::Fallible(Err(code)) => Err(Error::Remote(code)),
            slot => Err(SlotError::Mismatch {
                expected: SlotKind::Fallible,
                found: slot.kind(),
            }
            .at(0)
            .into()),
        }
    }

    /// Returns the server's error code, if slot zero carries
    /// one.
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self.slots.first() {
            Some(Some(Slot::Fallible(Err(code)))) => Some(*code),
            _ => None,
        }
    }

    /// Takes ownership of the proxy minted as `id`.
    pub fn claim(&mut self, id: ObjectId) -> Result<ProxyBase, SlotError> {
        self.objects.claim(id)
    }

    /// Returns the response's object manager.
    pub fn objects_mut(&mut self) -> &mut LifetimeManager {
        &mut self.objects
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::{
        message::SlotRef,
        ser::serialize_message,
        session::{Config, Session},
        testing::{Loopback, echo},
    };

    fn any_slot() -> impl Strategy<Value = Slot> {
        let leaf = prop_oneof![
            Just(Slot::Unit),
            any::<bool>().prop_map(Slot::Bool),
            any::<u8>().prop_map(Slot::U8),
            any::<u32>().prop_map(Slot::U32),
            any::<u64>().prop_map(Slot::U64),
            any::<i64>().prop_map(Slot::I64),
            proptest::collection::vec(any::<u8>(), 0..64).prop_map(Slot::Bytes),
            proptest::collection::vec(any::<u8>(), 0..64).prop_map(Slot::MutBytes),
            ".{0,16}".prop_map(Slot::Str),
            (any::<u32>(), 1..u32::MAX).prop_map(|(i, g)| Slot::Proxy(ObjectId::new(i, g))),
        ];
        leaf.prop_recursive(3, 16, 4, |inner| {
            prop_oneof![
                proptest::option::of(inner.clone().prop_map(Box::new)).prop_map(Slot::Optional),
                inner.clone().prop_map(|v| Slot::Fallible(Ok(Box::new(v)))),
                Just(Slot::Fallible(Err(ErrorCode::IncompatibleObject))),
                proptest::collection::vec(inner, 0..4).prop_map(Slot::List),
            ]
        })
    }

    proptest! {
        #[test]
        fn test_round_trip_identity(
            slots in proptest::collection::vec(any_slot(), 0..6),
            interface in any::<u16>(),
            op in any::<u16>(),
        ) {
            let task = TaskId::new(interface, op);
            let object = ObjectId::new(3, 7);
            let mut inv = Invocation::new(task, object);
            for slot in &slots {
                inv.push(slot.as_ref());
            }
            let mut buf = vec![0u8; 1 << 16];
            let bytes = serialize_message(&inv, &mut buf).unwrap();
            let env = deserialize_message(bytes).unwrap();
            prop_assert_eq!(env, Envelope { task, object, slots });
        }
    }

    #[test]
    fn test_trailing_bytes() {
        let inv = Invocation::new(TaskId::new(1, 1), ObjectId::PROVIDER);
        let mut bytes = postcard::to_allocvec(&inv).unwrap();
        bytes.push(0);
        assert_eq!(
            deserialize_message(&bytes).unwrap_err(),
            DeserializeError::TrailingBytes(1)
        );
    }

    #[test]
    fn test_truncated() {
        let data = [9u8; 32];
        let mut inv = Invocation::new(TaskId::new(1, 1), ObjectId::PROVIDER);
        inv.push(SlotRef::Bytes(&data));
        let bytes = postcard::to_allocvec(&inv).unwrap();
        let err = deserialize_message(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, DeserializeError::Malformed(_)), "{err:?}");
    }

    #[test]
    fn test_shape_checks() {
        let task = TaskId::new(4, 2);
        let object = ObjectId::new(1, 1);
        let mut inv = Invocation::new(task, object);
        inv.push(SlotRef::U32(1));

        let env = |task, object, slots| Envelope {
            task,
            object,
            slots,
        };

        let err = Response::new(
            env(TaskId::new(4, 3), object, vec![Slot::Unit, Slot::U32(1)]),
            &inv,
            1,
            LifetimeManager::new(),
        )
        .unwrap_err();
        assert!(matches!(err, DeserializeError::TaskMismatch { .. }));

        let err = Response::new(
            env(task, ObjectId::new(1, 2), vec![Slot::Unit, Slot::U32(1)]),
            &inv,
            1,
            LifetimeManager::new(),
        )
        .unwrap_err();
        assert!(matches!(err, DeserializeError::ObjectMismatch { .. }));

        let err = Response::new(env(task, object, vec![Slot::U32(1)]), &inv, 1, LifetimeManager::new())
            .unwrap_err();
        assert_eq!(
            err,
            DeserializeError::SlotCount {
                expected: 2,
                found: 1,
            }
        );

        let err = Response::new(
            env(task, object, vec![Slot::Unit, Slot::U64(1)]),
            &inv,
            1,
            LifetimeManager::new(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            SlotError::Mismatch {
                expected: SlotKind::U32,
                found: SlotKind::U64,
            }
            .at(1)
        );

        let stranger = ObjectId::new(9, 9);
        let err = Response::new(
            env(task, object, vec![Slot::Proxy(stranger), Slot::U32(1)]),
            &inv,
            1,
            LifetimeManager::new(),
        )
        .unwrap_err();
        assert_eq!(err, SlotError::UnknownObject(stranger).at(0));
    }

    #[test]
    fn test_take_and_raise() {
        let task = TaskId::new(4, 2);
        let mut inv = Invocation::new(task, ObjectId::PROVIDER);
        inv.push(SlotRef::U32(1));
        let env = Envelope {
            task,
            object: ObjectId::PROVIDER,
            slots: vec![Slot::Fallible(Err(ErrorCode::UninitializedContext)), Slot::U32(5)],
        };
        let mut resp = Response::new(env, &inv, 1, LifetimeManager::new()).unwrap();
        assert_eq!(resp.error_code(), Some(ErrorCode::UninitializedContext));
        assert_eq!(resp.take_as::<u32>(1).unwrap(), 5);
        assert_eq!(resp.take(1).unwrap_err(), SlotError::Consumed.at(1));
        assert_eq!(resp.take(2).unwrap_err(), SlotError::Missing.at(2));
        assert!(matches!(
            resp.raise(),
            Err(Error::Remote(ErrorCode::UninitializedContext))
        ));
    }

    #[test]
    fn test_claim_once() {
        let session = Session::new(Loopback::new(|req| echo(req, None)), Config::default());
        let base = ProxyBase::unregistered(&session).unwrap();
        let id = base.id();

        let mut objects = LifetimeManager::new();
        objects.expect(base);
        assert!(objects.is_known(id));
        assert_eq!(objects.resolve(id).unwrap().id(), id);

        let claimed = objects.claim(id).unwrap();
        assert_eq!(claimed.id(), id);
        assert_eq!(objects.claim(id).unwrap_err(), SlotError::DuplicateObject(id));
        // Still resolvable by reference.
        assert_eq!(objects.resolve(id).unwrap().id(), id);

        let other = ObjectId::new(77, 1);
        assert_eq!(objects.claim(other).unwrap_err(), SlotError::UnknownObject(other));
    }

    #[test]
    fn test_unclaimed_proxies_are_released() {
        let session = Session::new(Loopback::new(|req| echo(req, None)), Config::default());
        let before = session.live_objects();
        let mut objects = LifetimeManager::new();
        objects.expect(ProxyBase::unregistered(&session).unwrap());
        objects.expect(ProxyBase::unregistered(&session).unwrap());
        assert_eq!(session.live_objects(), before + 2);
        assert_eq!(objects.pending(), 2);
        drop(objects);
        assert_eq!(session.live_objects(), before);
    }
}

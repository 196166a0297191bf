//! Turning call arguments into requests.

use crate::{id::ObjectId, message::Invocation, outparam::Arg, task::TaskId};

/// Builds the request for calling `task` on `object` with
/// `args`.
///
/// The invocation's slots borrow from `args` in order. Nothing
/// is copied until the invocation is serialized.
pub fn build_invocation<'a>(task: TaskId, object: ObjectId, args: &'a [Arg<'_>]) -> Invocation<'a> {
    Invocation::with_slots(task, object, args.iter().map(Arg::slot).collect())
}

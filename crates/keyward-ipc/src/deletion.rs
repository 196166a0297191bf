//! Destroy notifications for dropped proxies.

use core::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::{id::ObjectId, session::Session};

/// Sends the destroy notification for a proxy.
///
/// The handler starts disarmed. It is armed once the server
/// confirms that it created the proxy's counterpart and is
/// disarmed again if ownership of the counterpart moves
/// elsewhere. At most one notification is ever sent.
#[derive(Debug, Default)]
pub struct DeletionHandler {
    armed: AtomicBool,
}

impl DeletionHandler {
    /// Creates a disarmed handler.
    pub const fn new() -> Self {
        Self {
            armed: AtomicBool::new(false),
        }
    }

    /// Sets whether a notification is sent on drop.
    pub fn set_armed(&self, armed: bool) {
        self.armed.store(armed, Ordering::Release);
    }

    /// Reports whether a notification will be sent on drop.
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// Notifies the server that `id` is gone, if armed.
    ///
    /// Failures are logged. A destructor has no one to report
    /// them to.
    pub fn on_drop(&self, session: &Session, id: ObjectId) {
        if !self.armed.swap(false, Ordering::AcqRel) {
            return;
        }
        debug!(%id, "destroying remote object");
        if let Err(err) = session.notify_destroyed(id) {
            warn!(%id, cause = %err, "unable to send destroy notification");
        }
    }
}

//! Task identifiers.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Selects the server-side operation an envelope invokes.
///
/// Task ids are scoped per interface. Both ends must agree on
/// them bit for bit.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct TaskId {
    interface: u16,
    operation: u16,
}

impl TaskId {
    /// The interface reserved for object lifecycle tasks.
    pub const LIFECYCLE: u16 = 0;

    /// Tells the server that a proxy was destroyed.
    pub const DESTROY: Self = Self::new(Self::LIFECYCLE, 1);

    /// Creates a task id.
    #[inline]
    pub const fn new(interface: u16, operation: u16) -> Self {
        Self {
            interface,
            operation,
        }
    }

    /// Returns the interface.
    #[inline]
    pub const fn interface(self) -> u16 {
        self.interface
    }

    /// Returns the operation within the interface.
    #[inline]
    pub const fn operation(self) -> u16 {
        self.operation
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}:{}", self.interface, self.operation)
    }
}

/// Declares the tasks served by one interface.
///
/// # Example
///
/// ```
/// keyward_ipc::tasks! {
///     /// Tasks served by a counter.
///     pub enum CounterTask: 0x0042 {
///         Increment = 1,
///         Get = 2,
///     }
/// }
///
/// let task = keyward_ipc::TaskId::from(CounterTask::Get);
/// assert_eq!(task.interface(), 0x0042);
/// assert_eq!(task.operation(), 2);
/// ```
#[macro_export]
macro_rules! tasks {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $interface:literal {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $value:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        #[repr(u16)]
        $vis enum $name {
            $(
                $(#[$vmeta])*
                $variant = $value,
            )*
        }

        impl $name {
            /// The interface these tasks belong to.
            pub const INTERFACE: u16 = $interface;

            /// Returns the task's id.
            #[inline]
            pub const fn id(self) -> $crate::TaskId {
                $crate::TaskId::new(Self::INTERFACE, self as u16)
            }
        }

        impl ::core::convert::From<$name> for $crate::TaskId {
            #[inline]
            fn from(task: $name) -> Self {
                task.id()
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::tasks! {
        enum Sample: 0x0101 {
            First = 1,
            Second = 7,
        }
    }

    #[test]
    fn test_tasks_macro() {
        assert_eq!(TaskId::from(Sample::First), TaskId::new(0x0101, 1));
        assert_eq!(TaskId::from(Sample::Second), TaskId::new(0x0101, 7));
        assert_ne!(TaskId::from(Sample::First), TaskId::DESTROY);
        const SECOND: TaskId = Sample::Second.id();
        assert_eq!(SECOND.operation(), 7);
    }

    #[test]
    fn test_display() {
        assert_eq!(TaskId::new(0x0101, 7).to_string(), "0x0101:7");
    }
}

use std::fmt;

/// Position of a system in the manager's registration order.
///
/// Handles are stable for the manager's lifetime; update order follows them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemHandle(u32);

impl SystemHandle {
    pub(crate) fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SystemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

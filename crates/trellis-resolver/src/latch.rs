/// A flag that can be set but never cleared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Latch(bool);

impl Latch {
    pub const fn new() -> Self {
        Self(false)
    }

    pub fn is_set(self) -> bool {
        self.0
    }

    /// Set the latch. Returns `true` only for the call that flipped it.
    pub fn set(&mut self) -> bool {
        !std::mem::replace(&mut self.0, true)
    }

    /// Set the latch when `condition` holds. Returns `true` if this call flipped it.
    pub fn set_if(&mut self, condition: bool) -> bool {
        condition && self.set()
    }
}

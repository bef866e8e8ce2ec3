/// Page index of the most recently displayed result.
///
/// Shared by every connection of a session. The backend owns clamping, so
/// the cursor only proposes the next index and adopts whatever comes back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageCursor {
    index: i64,
}

impl PageCursor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn current(&self) -> i64 {
        self.index
    }

    pub fn reset(&mut self) {
        self.index = 0;
    }

    #[must_use]
    pub fn requested(&self, delta: i64) -> i64 {
        self.index.saturating_add(delta)
    }

    pub fn accept(&mut self, index: i64) {
        self.index = index;
    }
}

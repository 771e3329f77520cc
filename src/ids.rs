use std::fmt::{Display, Formatter};

/// Strongly typed per-dispatch correlation identifier backed by ULID.
///
/// Every `fetch` call mints one and carries it on the dispatch tracing span
/// and the [`Context`](crate::Context), so log lines from one chain execution
/// can be stitched together.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct DispatchId(pub ulid::Ulid);

impl DispatchId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }
}

impl Default for DispatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for DispatchId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

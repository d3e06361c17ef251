//! Per-position null tracking for blocks.

/// Per-position validity of a [`Block`](crate::block::Block).
///
/// Three storage modes are used:
/// - `Trivial`: every position holds at least one value.
/// - `Nulls`: every position is null; no per-position storage is needed.
/// - `Bytes`: mixed, one byte per position (`1` - present, `0` - null).
#[derive(Debug, Clone)]
pub enum Presence {
    /// All positions are present.
    Trivial(usize),

    /// All positions are null.
    Nulls(usize),

    /// Presence encoded as a byte array, where a byte at position `i` indicates
    /// whether position `i` is present (`1`) or null (`0`).
    Bytes(Vec<u8>),
}

impl Presence {
    /// Returns the number of positions tracked by this presence.
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Self::Trivial(len) => *len,
            Self::Nulls(len) => *len,
            Self::Bytes(presence) => presence.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of null positions.
    pub fn count_nulls(&self) -> usize {
        match self {
            Self::Trivial(_) => 0,
            Self::Nulls(len) => *len,
            Self::Bytes(presence) => presence.iter().filter(|&&b| b == 0).count(),
        }
    }

    /// Returns `true` if all positions are present.
    #[inline]
    pub fn is_trivial_non_null(&self) -> bool {
        matches!(self, Self::Trivial(_))
    }

    /// Returns `true` if all positions are null.
    #[inline]
    pub fn is_trivial_all_null(&self) -> bool {
        matches!(self, Self::Nulls(_))
    }

    /// Returns `true` if the position at `index` is null.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[inline]
    pub fn is_null(&self, index: usize) -> bool {
        assert!(index < self.len(), "position {index} out of bounds");
        match self {
            Self::Trivial(_) => false,
            Self::Nulls(_) => true,
            Self::Bytes(presence) => presence[index] == 0,
        }
    }

    /// Pushes a null position.
    pub fn push_null(&mut self) {
        match self {
            Presence::Trivial(len) => {
                if *len > 0 {
                    let mut presence = Vec::with_capacity(*len + 1);
                    presence.resize(*len, 1u8);
                    presence.push(0);
                    *self = Presence::Bytes(presence);
                } else {
                    *self = Presence::Nulls(1);
                }
            }
            Presence::Nulls(len) => *len += 1,
            Presence::Bytes(presence) => presence.push(0),
        }
    }

    /// Pushes a present position.
    pub fn push_non_null(&mut self) {
        match self {
            Presence::Trivial(len) => *len += 1,
            Presence::Nulls(len) => {
                let mut presence = Vec::with_capacity(*len + 1);
                presence.resize(*len, 0u8);
                presence.push(1);
                *self = Presence::Bytes(presence);
            }
            Presence::Bytes(presence) => presence.push(1),
        }
    }

    /// Extends this presence with `count` null positions.
    pub fn extend_with_nulls(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        if self.is_empty() {
            *self = Self::Nulls(count);
            return;
        }
        match self {
            Self::Trivial(len) => {
                let mut presence = Vec::with_capacity(*len + count);
                presence.resize(*len, 1u8);
                presence.resize(*len + count, 0u8);
                *self = Self::Bytes(presence);
            }
            Self::Nulls(len) => *len += count,
            Self::Bytes(presence) => presence.resize(presence.len() + count, 0),
        }
    }

    /// Builds the presence of the selected positions, in selection order.
    ///
    /// # Panics
    ///
    /// Panics if any position is out of bounds.
    pub fn select(&self, positions: &[usize]) -> Presence {
        match self {
            Self::Trivial(len) => {
                assert!(positions.iter().all(|&p| p < *len));
                Self::Trivial(positions.len())
            }
            Self::Nulls(len) => {
                assert!(positions.iter().all(|&p| p < *len));
                Self::Nulls(positions.len())
            }
            Self::Bytes(presence) => {
                let mut res = Presence::default();
                for &p in positions {
                    if presence[p] == 0 {
                        res.push_null();
                    } else {
                        res.push_non_null();
                    }
                }
                res
            }
        }
    }
}

impl PartialEq for Presence {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && (0..self.len()).all(|i| self.is_null(i) == other.is_null(i))
    }
}

impl Default for Presence {
    fn default() -> Self {
        Presence::Trivial(0)
    }
}

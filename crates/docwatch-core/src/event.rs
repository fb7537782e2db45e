//! Filesystem change notifications as seen by the registry.
//!
//! A notification names one path and a set of [`Op`] flags. Raw
//! notifications carry a single flag; coalesced notifications carry the
//! union of every flag observed for the path during its debounce window.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::path::PathBuf;

/// Bitset of filesystem operations.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Op(u8);

impl Op {
    pub const CREATE: Op = Op(1);
    pub const WRITE: Op = Op(1 << 1);
    pub const RENAME: Op = Op(1 << 2);
    pub const REMOVE: Op = Op(1 << 3);

    pub const fn empty() -> Self {
        Op(0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when every flag in `other` is set in `self`.
    pub const fn has(self, other: Op) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    /// True when any flag in `other` is set in `self`.
    pub const fn intersects(self, other: Op) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for Op {
    type Output = Op;

    fn bitor(self, rhs: Op) -> Op {
        Op(self.0 | rhs.0)
    }
}

impl BitOrAssign for Op {
    fn bitor_assign(&mut self, rhs: Op) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Op({})", self)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(Op, &str); 4] = [
            (Op::CREATE, "CREATE"),
            (Op::WRITE, "WRITE"),
            (Op::RENAME, "RENAME"),
            (Op::REMOVE, "REMOVE"),
        ];
        let mut first = true;
        for (op, name) in NAMES {
            if self.has(op) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        if first {
            f.write_str("NONE")?;
        }
        Ok(())
    }
}

/// One filesystem notification: an absolute path and its operation flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    pub path: PathBuf,
    pub op: Op,
}

impl FsEvent {
    pub fn new(path: impl Into<PathBuf>, op: Op) -> Self {
        Self {
            path: path.into(),
            op,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_keeps_both_flags() {
        let mut op = Op::CREATE;
        op |= Op::WRITE;
        assert!(op.has(Op::CREATE));
        assert!(op.has(Op::WRITE));
        assert!(!op.has(Op::REMOVE));
        assert!(op.has(Op::CREATE | Op::WRITE));
        assert!(op.intersects(Op::WRITE | Op::REMOVE));
    }

    #[test]
    fn test_empty() {
        assert!(Op::empty().is_empty());
        assert!(!Op::empty().has(Op::empty()));
        assert!(!(Op::RENAME).is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!((Op::WRITE | Op::CREATE).to_string(), "CREATE|WRITE");
        assert_eq!(Op::empty().to_string(), "NONE");
    }
}

use core::fmt;

/// The number of distinct input symbols.
///
/// The engine matches over a 7-bit alphabet. Bytes at or above this limit
/// never belong to any character class and never have a transition in a
/// compiled automaton, so they can only ever terminate a match.
pub const ALPHABET_LEN: usize = 128;

/// The one byte that `.` refuses to match.
pub const DOT_EXCLUDED: u8 = b'\n';

/// A set of bytes drawn from the engine's alphabet.
///
/// This is a fixed-width bitset, cheap to copy and allocation free. Bytes
/// outside the alphabet are silently ignored by `add` and friends and are
/// never reported as members.
#[derive(Clone, Copy, Default, Eq, PartialEq)]
pub struct ByteSet {
    bits: u128,
}

impl ByteSet {
    /// Create an empty set of bytes.
    pub fn empty() -> ByteSet {
        ByteSet { bits: 0 }
    }

    /// Create a set containing every byte in the alphabet.
    pub fn full() -> ByteSet {
        ByteSet { bits: !0 }
    }

    /// Create a set containing only the given byte.
    pub fn singleton(byte: u8) -> ByteSet {
        let mut set = ByteSet::empty();
        set.add(byte);
        set
    }

    /// Add a byte to this set.
    ///
    /// Adding a byte outside the alphabet is a no-op.
    pub fn add(&mut self, byte: u8) {
        if (byte as usize) < ALPHABET_LEN {
            self.bits |= 1 << byte;
        }
    }

    /// Add an inclusive range of bytes.
    pub fn add_all(&mut self, start: u8, end: u8) {
        for b in start..=end {
            self.add(b);
        }
    }

    /// Remove a byte from this set.
    pub fn remove(&mut self, byte: u8) {
        if (byte as usize) < ALPHABET_LEN {
            self.bits &= !(1 << byte);
        }
    }

    /// Return true if and only if the given byte is in this set.
    pub fn contains(&self, byte: u8) -> bool {
        (byte as usize) < ALPHABET_LEN && self.bits & (1 << byte) != 0
    }

    /// Flip membership of every byte in the alphabet.
    pub fn negate(&mut self) {
        self.bits = !self.bits;
    }

    /// Fold the bytes of `other` into this set.
    pub fn union(&mut self, other: ByteSet) {
        self.bits |= other.bits;
    }

    /// Return the number of bytes in this set.
    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Return true if and only if this set is empty.
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }
}

impl fmt::Debug for ByteSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut fmtd = f.debug_set();
        for b in 0..ALPHABET_LEN as u8 {
            if self.contains(b) {
                fmtd.entry(&b);
            }
        }
        fmtd.finish()
    }
}

/// The class matched by `.`: every alphabet byte except `DOT_EXCLUDED`.
pub fn dot() -> ByteSet {
    let mut set = ByteSet::full();
    set.remove(DOT_EXCLUDED);
    set
}

/// Resolve a predefined class escape (the letter following a backslash).
///
/// Lower case letters name a class, the corresponding upper case letters its
/// complement. Returns `None` when the letter names no class, in which case
/// the caller treats the escaped byte as a literal.
pub fn escape_class(letter: u8) -> Option<ByteSet> {
    let set = match letter.to_ascii_lowercase() {
        b's' => spaces(),
        b'd' => digits(),
        b'l' => lowers(),
        b'u' => uppers(),
        b'w' => words(),
        _ => return None,
    };
    if letter.is_ascii_uppercase() {
        let mut set = set;
        set.negate();
        Some(set)
    } else {
        Some(set)
    }
}

fn spaces() -> ByteSet {
    let mut set = ByteSet::empty();
    for &b in b" \t\n\x0B\x0C\r" {
        set.add(b);
    }
    set
}

fn digits() -> ByteSet {
    let mut set = ByteSet::empty();
    set.add_all(b'0', b'9');
    set
}

fn lowers() -> ByteSet {
    let mut set = ByteSet::empty();
    set.add_all(b'a', b'z');
    set
}

fn uppers() -> ByteSet {
    let mut set = ByteSet::empty();
    set.add_all(b'A', b'Z');
    set
}

fn words() -> ByteSet {
    let mut set = lowers();
    set.union(uppers());
    set.union(digits());
    set.add(b'_');
    set
}

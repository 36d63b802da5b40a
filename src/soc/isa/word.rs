//! Fixed-width unsigned integer arithmetic for 8-bit and 16-bit machine words.
//!
//! Each width is exposed as a module of free functions (`w8`, `w16`) rather than a wrapper
//! type: values stay plain `u8`/`u16`, so the "input must be in range" contract is carried by
//! the type itself. Wide intermediate values enter through [`w16::cast`] / [`w16::wrap`].

/// Outcome flag reported alongside a wrapped arithmetic result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithFlag {
    Ok,
    Overflow,
}

impl ArithFlag {
    pub fn is_overflow(self) -> bool {
        matches!(self, ArithFlag::Overflow)
    }
}

/// Value truncated into a fixed width plus whether the truncation changed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Wrapped<W> {
    pub value: W,
    pub flag: ArithFlag,
}

impl<W> Wrapped<W> {
    pub fn new(value: W, flag: ArithFlag) -> Self {
        Self { value, flag }
    }
}

// Group-swap stages for `bitrev`: shift distance and the mask of the lower group.
const SWAP_STAGES: [(u32, u64); 6] = [
    (1, 0x5555_5555_5555_5555),
    (2, 0x3333_3333_3333_3333),
    (4, 0x0F0F_0F0F_0F0F_0F0F),
    (8, 0x00FF_00FF_00FF_00FF),
    (16, 0x0000_FFFF_0000_FFFF),
    (32, 0x0000_0000_FFFF_FFFF),
];

macro_rules! fixed_width {
    ($module:ident, $word:ty, $bits:expr, $doc:literal) => {
        #[doc = $doc]
        pub mod $module {
            use super::{ArithFlag, SWAP_STAGES, Wrapped};

            pub type Word = $word;

            pub const BITS: u32 = $bits;
            pub const MIN: $word = <$word>::MIN;
            pub const MAX: $word = <$word>::MAX;

            /// Returns true when `n` lies within `[MIN, MAX]`.
            pub fn is_valid(n: i64) -> bool {
                (MIN as i64..=MAX as i64).contains(&n)
            }

            /// Truncates `n` into the word, matching two's-complement wraparound for negatives.
            pub fn cast(n: i64) -> $word {
                n as $word
            }

            pub fn wrap(n: i64) -> Wrapped<$word> {
                let flag = if is_valid(n) {
                    ArithFlag::Ok
                } else {
                    ArithFlag::Overflow
                };
                Wrapped::new(cast(n), flag)
            }

            pub fn add(a: $word, b: $word) -> Wrapped<$word> {
                wrap(a as i64 + b as i64)
            }

            pub fn sub(a: $word, b: $word) -> Wrapped<$word> {
                wrap(a as i64 - b as i64)
            }

            /// Index of the lowest set bit. Undefined for zero, where it returns 0 exactly as if
            /// bit 0 were set; callers depend on that value.
            pub fn bitscanf(a: $word) -> u32 {
                if a == 0 { 0 } else { a.trailing_zeros() }
            }

            /// Index of the highest set bit. Undefined for zero, where it returns 0.
            pub fn bitscanr(a: $word) -> u32 {
                if a == 0 {
                    0
                } else {
                    BITS - 1 - a.leading_zeros()
                }
            }

            /// Shifts left, discarding bits pushed past the top of the word.
            pub fn bitshiftl(a: $word, n: u32) -> $word {
                a.checked_shl(n).unwrap_or(0)
            }

            /// Shifts right, discarding bits pushed past bit 0.
            pub fn bitshiftr(a: $word, n: u32) -> $word {
                a.checked_shr(n).unwrap_or(0)
            }

            /// Rotates left within the word.
            pub fn bitshiftlw(a: $word, n: u32) -> $word {
                a.rotate_left(n % BITS)
            }

            /// Rotates right within the word.
            pub fn bitshiftrw(a: $word, n: u32) -> $word {
                a.rotate_right(n % BITS)
            }

            /// Reverses the bit order by swapping progressively larger bit groups.
            pub fn bitrev(a: $word) -> $word {
                let mut v = a;
                for &(shift, mask) in SWAP_STAGES.iter().take_while(|(shift, _)| *shift < BITS) {
                    let mask = mask as $word;
                    v = ((v >> shift) & mask) | ((v & mask) << shift);
                }
                v
            }
        }
    };
}

fixed_width!(w8, u8, 8, "Arithmetic over 8-bit words.");
fixed_width!(w16, u16, 16, "Arithmetic over 16-bit instruction words.");

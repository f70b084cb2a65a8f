//! Numeric behaviour required from transaction amounts.

use serde::Serialize;
use std::cmp::Ordering;
use std::fmt::Debug;

/// A summable transaction amount.
///
/// Addition is checked: `None` means the sum left the representable range
/// and the aggregation must fail instead of wrapping or saturating.
pub trait Amount: Copy + PartialEq + Debug + Serialize + Send + Sync + 'static {
    /// Name used in error messages and schema output.
    const TYPE_NAME: &'static str;

    fn checked_sum(self, rhs: Self) -> Option<Self>;

    /// Check a value that opens a new total. `None` rejects it like an
    /// overflowing sum.
    fn checked_start(self) -> Option<Self>;

    /// Total order used to find the per-user maximum.
    fn total_order(&self, other: &Self) -> Ordering;

    /// Text shown in tabular output.
    fn render(&self) -> String;
}

macro_rules! integer_amount {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl Amount for $ty {
                const TYPE_NAME: &'static str = $name;

                fn checked_sum(self, rhs: Self) -> Option<Self> {
                    self.checked_add(rhs)
                }

                fn checked_start(self) -> Option<Self> {
                    Some(self)
                }

                fn total_order(&self, other: &Self) -> Ordering {
                    self.cmp(other)
                }

                fn render(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

integer_amount!(i64 => "integer", i128 => "i128", u64 => "u64");

impl Amount for f64 {
    const TYPE_NAME: &'static str = "double";

    // With checked_start, every stored total is finite.
    fn checked_sum(self, rhs: Self) -> Option<Self> {
        let sum = self + rhs;
        sum.is_finite().then_some(sum)
    }

    fn checked_start(self) -> Option<Self> {
        self.is_finite().then_some(self)
    }

    fn total_order(&self, other: &Self) -> Ordering {
        self.total_cmp(other)
    }

    fn render(&self) -> String {
        if self.fract() == 0.0 && self.abs() < 1e16 {
            format!("{self:.1}")
        } else {
            self.to_string()
        }
    }
}

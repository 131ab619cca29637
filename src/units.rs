use std::cmp::Ordering;

use crate::PKT_SIZE;

macro_rules! unit {
    ($name: ident) => {
        #[derive(
            Debug,
            Default,
            Copy,
            Clone,
            PartialOrd,
            PartialEq,
            derive_more::Add,
            derive_more::Sub,
            derive_more::AddAssign,
            derive_more::SubAssign,
            derive_more::Display,
            serde::Serialize,
            serde::Deserialize,
        )]
        pub struct $name(f64);

        impl $name {
            pub const ZERO: $name = Self::new(0.0);
            pub const ONE: $name = Self::new(1.0);

            pub const fn new(value: f64) -> Self {
                Self(value)
            }

            pub const fn into_f64(self) -> f64 {
                self.0
            }

            pub fn scale_by(self, val: f64) -> Self {
                Self(self.0 * val)
            }

            pub fn max(self, other: Self) -> Self {
                Self(self.0.max(other.0))
            }

            pub fn min(self, other: Self) -> Self {
                Self(self.0.min(other.0))
            }

            /// The ratio `self / whole`, or zero if `whole` is zero.
            pub fn frac(self, whole: Self) -> f64 {
                if whole.0 == 0.0 {
                    0.0
                } else {
                    self.0 / whole.0
                }
            }

            pub fn total_cmp(&self, other: &Self) -> Ordering {
                self.0.total_cmp(&other.0)
            }
        }
    };
}

unit!(Millisecs);
unit!(Bytes);
unit!(BytesPerMs);

impl Millisecs {
    pub fn into_secs(self) -> f64 {
        self.0 / 1_000.0
    }
}

impl Bytes {
    /// The number of bytes in `count` full-sized packets.
    pub fn packets(count: u64) -> Self {
        PKT_SIZE.scale_by(count as f64)
    }
}

impl BytesPerMs {
    /// Bytes moved at this rate over `delta`.
    pub fn width(&self, delta: Millisecs) -> Bytes {
        Bytes::new(self.0 * delta.0)
    }
}

#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    PartialOrd,
    Ord,
    PartialEq,
    Eq,
    Hash,
    derive_more::Display,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct Gbps(u64);

impl Gbps {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn into_bytes_per_ms(self) -> BytesPerMs {
        BytesPerMs::new(self.0 as f64 * 1e9 / 8.0 / 1_000.0)
    }
}

impl From<Gbps> for BytesPerMs {
    fn from(val: Gbps) -> Self {
        val.into_bytes_per_ms()
    }
}

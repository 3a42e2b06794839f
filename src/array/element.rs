//! Element and mask value traits with numpy-style precision promotion.

use rustfft::num_complex::Complex;

/// Broad category of an element type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DtypeKind {
    Bool,
    Unsigned,
    Signed,
    Float,
    Complex,
}

/// Floating-point precision used for a computation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precision {
    /// 32-bit floats.
    Single,
    /// 64-bit floats.
    Double,
}

impl Precision {
    /// Precision needed to hold `T` without narrowing below single precision.
    ///
    /// Follows `numpy.result_type(T, float32)`: booleans, integers up to 16
    /// bits and `f32` stay single; wider integers and `f64` need double.
    pub fn of<T: Element>() -> Self {
        match T::KIND {
            DtypeKind::Bool => Precision::Single,
            DtypeKind::Unsigned | DtypeKind::Signed if T::BITS <= 16 => Precision::Single,
            DtypeKind::Unsigned | DtypeKind::Signed => Precision::Double,
            DtypeKind::Float | DtypeKind::Complex if T::BITS <= 32 => Precision::Single,
            DtypeKind::Float | DtypeKind::Complex => Precision::Double,
        }
    }

    /// Returns the wider of the two precisions.
    pub fn promote(self, other: Precision) -> Self {
        self.max(other)
    }

    /// Machine epsilon at this precision.
    pub fn epsilon(self) -> f64 {
        match self {
            Precision::Single => f64::from(f32::EPSILON),
            Precision::Double => f64::EPSILON,
        }
    }
}

/// Array element accepted by the feature and correlation pipelines.
pub trait Element: Copy + Send + Sync + 'static {
    /// Element category.
    const KIND: DtypeKind;
    /// Bit width of one (real) component.
    const BITS: u32;

    /// Numeric value as `f64`; complex values yield their real part.
    fn to_f64(self) -> f64;

    /// Canonical float32 representation (`img_as_float32` semantics).
    ///
    /// Floats are cast, unsigned integers are scaled to `[0, 1]`, signed
    /// integers are mapped to `[-1, 1]`, booleans become 0 or 1.
    fn to_unit_f32(self) -> f32;
}

impl Element for bool {
    const KIND: DtypeKind = DtypeKind::Bool;
    const BITS: u32 = 8;

    #[inline]
    fn to_f64(self) -> f64 {
        if self {
            1.0
        } else {
            0.0
        }
    }

    #[inline]
    fn to_unit_f32(self) -> f32 {
        if self {
            1.0
        } else {
            0.0
        }
    }
}

macro_rules! impl_unsigned {
    ($($ty:ty),*) => {$(
        impl Element for $ty {
            const KIND: DtypeKind = DtypeKind::Unsigned;
            const BITS: u32 = <$ty>::BITS;

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn to_unit_f32(self) -> f32 {
                (self as f64 / <$ty>::MAX as f64) as f32
            }
        }
    )*};
}

macro_rules! impl_signed {
    ($($ty:ty),*) => {$(
        impl Element for $ty {
            const KIND: DtypeKind = DtypeKind::Signed;
            const BITS: u32 = <$ty>::BITS;

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn to_unit_f32(self) -> f32 {
                let range = <$ty>::MAX as f64 - <$ty>::MIN as f64;
                ((self as f64 + 0.5) * 2.0 / range) as f32
            }
        }
    )*};
}

impl_unsigned!(u8, u16, u32, u64);
impl_signed!(i8, i16, i32, i64);

impl Element for f32 {
    const KIND: DtypeKind = DtypeKind::Float;
    const BITS: u32 = 32;

    #[inline]
    fn to_f64(self) -> f64 {
        f64::from(self)
    }

    #[inline]
    fn to_unit_f32(self) -> f32 {
        self
    }
}

impl Element for f64 {
    const KIND: DtypeKind = DtypeKind::Float;
    const BITS: u32 = 64;

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn to_unit_f32(self) -> f32 {
        self as f32
    }
}

impl Element for Complex<f32> {
    const KIND: DtypeKind = DtypeKind::Complex;
    const BITS: u32 = 32;

    #[inline]
    fn to_f64(self) -> f64 {
        f64::from(self.re)
    }

    #[inline]
    fn to_unit_f32(self) -> f32 {
        self.re
    }
}

impl Element for Complex<f64> {
    const KIND: DtypeKind = DtypeKind::Complex;
    const BITS: u32 = 64;

    #[inline]
    fn to_f64(self) -> f64 {
        self.re
    }

    #[inline]
    fn to_unit_f32(self) -> f32 {
        self.re as f32
    }
}

/// Mask value; any non-zero value marks a valid pixel.
pub trait MaskValue: Copy + Send + Sync + 'static {
    /// Returns `true` when the pixel is valid.
    fn is_valid(self) -> bool;
}

impl MaskValue for bool {
    #[inline]
    fn is_valid(self) -> bool {
        self
    }
}

macro_rules! impl_mask_int {
    ($($ty:ty),*) => {$(
        impl MaskValue for $ty {
            #[inline]
            fn is_valid(self) -> bool {
                self != 0
            }
        }
    )*};
}

impl_mask_int!(u8, u16, u32, u64, i8, i16, i32, i64);

impl MaskValue for f32 {
    #[inline]
    fn is_valid(self) -> bool {
        self != 0.0
    }
}

impl MaskValue for f64 {
    #[inline]
    fn is_valid(self) -> bool {
        self != 0.0
    }
}

//! Fixed-point math utilities for deterministic simulation.
//!
//! All game simulation uses fixed-point arithmetic so that a given seed and
//! command stream always produces the same match. Floating-point literals never
//! appear in simulation code; fractional constants are built with [`ratio`].

use fixed::traits::ToFixed;
use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// π in fixed-point.
pub const PI: Fixed = Fixed::from_bits(13_493_037_705);

/// π/2 in fixed-point.
pub const FRAC_PI_2: Fixed = Fixed::from_bits(6_746_518_852);

/// 2π in fixed-point.
pub const TAU: Fixed = Fixed::from_bits(26_986_075_409);

/// Build the fixed-point value `num / den`.
///
/// # Panics
///
/// Panics if `den` is zero.
#[must_use]
pub fn ratio(num: i32, den: i32) -> Fixed {
    Fixed::from_num(num) / Fixed::from_num(den)
}

/// Fixed-point 2D vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Serde support for human-edited fixed-point values.
///
/// Values are written as decimal strings (`"1.25"`) and parsed back with the
/// fixed-point parser, so no floating-point conversion is involved.
pub mod fixed_decimal {
    use super::Fixed;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize a fixed-point number as a decimal string.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    /// Deserialize a fixed-point number from a decimal string.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.trim().parse::<Fixed>().map_err(D::Error::custom)
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from any numeric type convertible to fixed-point.
    #[must_use]
    pub fn from_num<T: ToFixed>(x: T, y: T) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Calculate squared distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Euclidean distance between two points.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        sqrt(self.distance_squared(other))
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x * other.x + self.y * other.y
    }

    /// Vector length.
    #[must_use]
    pub fn length(self) -> Fixed {
        sqrt(self.dot(self))
    }

    /// Whether both components are exactly zero.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.x == Fixed::ZERO && self.y == Fixed::ZERO
    }

    /// Linearly interpolate between two vectors.
    #[must_use]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// Multiply both components by a scalar.
    #[must_use]
    pub fn scale(self, factor: Fixed) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Normalize vector using fixed-point math.
    ///
    /// Returns [`Vec2Fixed::ZERO`] for the zero vector.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len == Fixed::ZERO {
            return Self::ZERO;
        }

        Self::new(self.x / len, self.y / len)
    }

    /// The vector rotated a quarter turn counter-clockwise.
    #[must_use]
    pub fn perpendicular(self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// Rotate by the angle whose cosine and sine are given.
    #[must_use]
    pub fn rotate(self, cos: Fixed, sin: Fixed) -> Self {
        Self::new(
            self.x * cos - self.y * sin,
            self.x * sin + self.y * cos,
        )
    }

    /// Shrink the vector so its length does not exceed `max`.
    #[must_use]
    pub fn clamp_length(self, max: Fixed) -> Self {
        let len = self.length();
        if len > max && len > Fixed::ZERO {
            self.scale(max / len)
        } else {
            self
        }
    }

    /// Heading angle of the vector in radians.
    #[must_use]
    pub fn angle(self) -> Fixed {
        atan2(self.y, self.x)
    }

    /// Unit vector pointing along `angle`.
    #[must_use]
    pub fn from_angle(angle: Fixed) -> Self {
        let (sin, cos) = sin_cos(angle);
        Self::new(cos, sin)
    }
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::AddAssign for Vec2Fixed {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl std::ops::SubAssign for Vec2Fixed {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl std::ops::Neg for Vec2Fixed {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y)
    }
}

/// Square root of a fixed-point number.
///
/// Computed exactly (rounded down) on the raw bit representation, so the
/// result is identical on every platform. Negative inputs return zero.
#[must_use]
pub fn sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    // sqrt(bits / 2^32) * 2^32 == isqrt(bits * 2^32)
    let widened = (value.to_bits() as u128) << 32;
    Fixed::from_bits(isqrt(widened) as i64)
}

fn isqrt(n: u128) -> u128 {
    if n < 2 {
        return n;
    }

    let bits = 128 - n.leading_zeros();
    let mut x = 1u128 << ((bits + 1) / 2);
    loop {
        let next = (x + n / x) / 2;
        if next >= x {
            return x;
        }
        x = next;
    }
}

/// Four-quadrant arctangent in radians, range `(-π, π]`.
///
/// Polynomial approximation with an absolute error below 1e-5 rad.
#[must_use]
pub fn atan2(y: Fixed, x: Fixed) -> Fixed {
    if x == Fixed::ZERO && y == Fixed::ZERO {
        return Fixed::ZERO;
    }

    let ax = x.abs();
    let ay = y.abs();
    let a = if ax >= ay { ay / ax } else { ax / ay };
    let s = a * a;

    let c3 = Fixed::from_bits(-199_700_839);
    let c2 = Fixed::from_bits(684_249_365);
    let c1 = Fixed::from_bits(-1_407_129_057);
    let mut r = ((c3 * s + c2) * s + c1) * s * a + a;

    if ay > ax {
        r = FRAC_PI_2 - r;
    }
    if x < Fixed::ZERO {
        r = PI - r;
    }
    if y < Fixed::ZERO {
        r = -r;
    }
    r
}

/// Wrap an angle into `[-π, π)`.
#[must_use]
pub fn wrap_angle(angle: Fixed) -> Fixed {
    let mut a = angle % TAU;
    if a >= PI {
        a -= TAU;
    } else if a < -PI {
        a += TAU;
    }
    a
}

/// Sine and cosine of an angle in radians, returned as `(sin, cos)`.
#[must_use]
pub fn sin_cos(angle: Fixed) -> (Fixed, Fixed) {
    (sin(angle), sin(angle + FRAC_PI_2))
}

fn sin(angle: Fixed) -> Fixed {
    let mut a = wrap_angle(angle);
    if a > FRAC_PI_2 {
        a = PI - a;
    } else if a < -FRAC_PI_2 {
        a = -PI - a;
    }

    // Taylor series to x^9, accurate to ~4e-6 on [-π/2, π/2]
    let a2 = a * a;
    let inv_6 = Fixed::from_bits(715_827_883);
    let inv_120 = Fixed::from_bits(35_791_394);
    let inv_5040 = Fixed::from_bits(852_176);
    let inv_362880 = Fixed::from_bits(11_836);
    a * (Fixed::ONE - a2 * (inv_6 - a2 * (inv_120 - a2 * (inv_5040 - a2 * inv_362880))))
}

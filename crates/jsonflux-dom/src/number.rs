use std::{
    cmp::Ordering,
    fmt,
    ops::{BitOr, BitOrAssign},
    sync::{Arc, OnceLock},
};

use num_cmp::NumCmp;

use crate::error::ValueError;

/// Largest integer magnitude an `f64` represents exactly.
const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Outcome flags of a numeric conversion.
///
/// Conversions never fail outright; they return the closest representable
/// value together with a set of flags describing what was lost on the way.
/// [`Conversion::OK`] is the empty set.
#[derive(Copy, Clone, Default, PartialEq, Eq)]
pub struct Conversion(u8);

impl Conversion {
    /// Lossless conversion.
    pub const OK: Conversion = Conversion(0);
    /// The value exceeds the upper bound of the target type.
    pub const POSITIVE_OVERFLOW: Conversion = Conversion(1);
    /// The value exceeds the lower bound of the target type.
    pub const NEGATIVE_OVERFLOW: Conversion = Conversion(1 << 1);
    /// The target type cannot hold every significant digit.
    pub const PRECISION_LOSS: Conversion = Conversion(1 << 2);
    /// An integer was requested from a value with a fractional part.
    pub const NOT_AN_INTEGER: Conversion = Conversion(1 << 3);
    /// The lexeme does not denote a number at all.
    pub const NOT_A_NUMBER: Conversion = Conversion(1 << 4);

    #[inline]
    pub fn is_ok(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn contains(self, flags: Conversion) -> bool {
        self.0 & flags.0 == flags.0
    }

    #[inline]
    pub fn intersects(self, flags: Conversion) -> bool {
        self.0 & flags.0 != 0
    }

    /// True when either overflow flag is set.
    #[inline]
    pub fn overflowed(self) -> bool {
        self.intersects(Self::POSITIVE_OVERFLOW | Self::NEGATIVE_OVERFLOW)
    }
}

impl BitOr for Conversion {
    type Output = Conversion;

    fn bitor(self, rhs: Conversion) -> Conversion {
        Conversion(self.0 | rhs.0)
    }
}

impl BitOrAssign for Conversion {
    fn bitor_assign(&mut self, rhs: Conversion) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return f.write_str("OK");
        }
        let mut first = true;
        let mut emit = |flag: Conversion, name: &str, f: &mut fmt::Formatter<'_>| {
            if self.contains(flag) {
                if !first {
                    f.write_str("|")?;
                }
                first = false;
                f.write_str(name)?;
            }
            Ok(())
        };
        emit(Self::POSITIVE_OVERFLOW, "POSITIVE_OVERFLOW", f)?;
        emit(Self::NEGATIVE_OVERFLOW, "NEGATIVE_OVERFLOW", f)?;
        emit(Self::PRECISION_LOSS, "PRECISION_LOSS", f)?;
        emit(Self::NOT_AN_INTEGER, "NOT_AN_INTEGER", f)?;
        emit(Self::NOT_A_NUMBER, "NOT_A_NUMBER", f)
    }
}

/// A JSON number.
///
/// Three representations share one type: a 64-bit signed integer, an IEEE-754
/// double, and a *raw* number that keeps the source lexeme verbatim. Raw
/// numbers convert on first access and cache the result, so `as_i64` and
/// friends are O(1) after the initial parse. Equality and ordering are
/// numeric across representations: `1`, `1.0` and a raw `"1"` are all equal.
#[derive(Clone)]
pub struct Number {
    repr: Repr,
}

#[derive(Clone)]
enum Repr {
    Int(i64),
    Float(f64),
    Raw(Arc<RawLexeme>),
}

struct RawLexeme {
    text: Box<str>,
    parsed: OnceLock<Parsed>,
}

/// Both conversions of a raw lexeme, computed once.
#[derive(Copy, Clone)]
struct Parsed {
    int: i64,
    int_flags: Conversion,
    float: f64,
    float_flags: Conversion,
}

impl Number {
    pub fn from_i64(value: i64) -> Number {
        Number {
            repr: Repr::Int(value),
        }
    }

    /// Rejects NaN and infinities; they have no JSON serialization.
    pub fn from_f64(value: f64) -> Result<Number, ValueError> {
        if !value.is_finite() {
            return Err(ValueError::NotFinite);
        }
        Ok(Number {
            repr: Repr::Float(value),
        })
    }

    /// Builds a raw number that keeps `lexeme` verbatim.
    ///
    /// The lexeme must follow the JSON number grammar; anything else is
    /// rejected here so that a non-number can never reach the serializer.
    pub fn from_lexeme(lexeme: &str) -> Result<Number, ValueError> {
        if !is_json_number(lexeme) {
            return Err(ValueError::MalformedLexeme {
                lexeme: lexeme.into(),
            });
        }
        Ok(Number {
            repr: Repr::Raw(Arc::new(RawLexeme {
                text: lexeme.into(),
                parsed: OnceLock::new(),
            })),
        })
    }

    pub fn is_raw(&self) -> bool {
        matches!(self.repr, Repr::Raw(_))
    }

    /// The source lexeme, present only for raw numbers.
    pub fn as_raw(&self) -> Option<&str> {
        match &self.repr {
            Repr::Raw(raw) => Some(&raw.text),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> (i64, Conversion) {
        match &self.repr {
            Repr::Int(i) => (*i, Conversion::OK),
            Repr::Float(f) => float_to_i64(*f),
            Repr::Raw(raw) => {
                let parsed = raw.parse();
                (parsed.int, parsed.int_flags)
            }
        }
    }

    pub fn as_i32(&self) -> (i32, Conversion) {
        let (wide, mut flags) = self.as_i64();
        if wide > i64::from(i32::MAX) {
            flags |= Conversion::POSITIVE_OVERFLOW;
            (i32::MAX, flags)
        } else if wide < i64::from(i32::MIN) {
            flags |= Conversion::NEGATIVE_OVERFLOW;
            (i32::MIN, flags)
        } else {
            (wide as i32, flags)
        }
    }

    pub fn as_f64(&self) -> (f64, Conversion) {
        match &self.repr {
            Repr::Int(i) => (*i as f64, int_to_float_flags(*i)),
            Repr::Float(f) => (*f, Conversion::OK),
            Repr::Raw(raw) => {
                let parsed = raw.parse();
                (parsed.float, parsed.float_flags)
            }
        }
    }

    /// True when the number denotes a mathematical integer.
    pub fn is_integer(&self) -> bool {
        let (_, flags) = self.as_i64();
        !flags.intersects(Conversion::NOT_AN_INTEGER | Conversion::NOT_A_NUMBER)
    }

    /// Numeric comparison across representations.
    ///
    /// A raw side is converted transiently, integer first, falling back to
    /// double. Mixed integer/double pairs compare exactly via [`NumCmp`]
    /// rather than by promoting the integer.
    pub fn numeric_cmp(&self, other: &Number) -> Ordering {
        match (self.prim(), other.prim()) {
            (Prim::Int(a), Prim::Int(b)) => a.cmp(&b),
            // NaN is unrepresentable, so a total order exists.
            (Prim::Float(a), Prim::Float(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            (Prim::Int(a), Prim::Float(b)) => NumCmp::num_cmp(a, b).unwrap_or(Ordering::Equal),
            (Prim::Float(a), Prim::Int(b)) => NumCmp::num_cmp(a, b).unwrap_or(Ordering::Equal),
        }
    }

    fn prim(&self) -> Prim {
        match &self.repr {
            Repr::Int(i) => Prim::Int(*i),
            Repr::Float(f) => Prim::Float(*f),
            Repr::Raw(raw) => {
                let parsed = raw.parse();
                if parsed.int_flags.is_ok() {
                    Prim::Int(parsed.int)
                } else {
                    Prim::Float(parsed.float)
                }
            }
        }
    }
}

#[derive(Copy, Clone)]
enum Prim {
    Int(i64),
    Float(f64),
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.numeric_cmp(other) == Ordering::Equal
    }
}

impl Eq for Number {}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.numeric_cmp(other))
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        self.numeric_cmp(other)
    }
}

impl fmt::Debug for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::Int(i) => write!(f, "Number({i})"),
            Repr::Float(v) => write!(f, "Number({v})"),
            Repr::Raw(raw) => write!(f, "Number(raw {:?})", raw.text),
        }
    }
}

impl fmt::Display for Number {
    /// Serialized form: integers exactly, doubles with 14 significant
    /// digits, raw lexemes verbatim.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::Int(i) => write!(f, "{i}"),
            Repr::Float(v) => f.write_str(&format_double(*v)),
            Repr::Raw(raw) => f.write_str(&raw.text),
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Number {
        Number::from_i64(value)
    }
}

impl From<i32> for Number {
    fn from(value: i32) -> Number {
        Number::from_i64(i64::from(value))
    }
}

impl RawLexeme {
    fn parse(&self) -> Parsed {
        *self.parsed.get_or_init(|| parse_lexeme(&self.text))
    }
}

fn int_to_float_flags(value: i64) -> Conversion {
    if value.unsigned_abs() > MAX_SAFE_INTEGER {
        Conversion::PRECISION_LOSS
    } else {
        Conversion::OK
    }
}

fn float_to_i64(value: f64) -> (i64, Conversion) {
    // i64::MAX as f64 rounds up to 2^63, which is already out of range.
    if value >= i64::MAX as f64 {
        (i64::MAX, Conversion::POSITIVE_OVERFLOW)
    } else if value < i64::MIN as f64 {
        (i64::MIN, Conversion::NEGATIVE_OVERFLOW)
    } else if value.fract() != 0.0 {
        (value.trunc() as i64, Conversion::NOT_AN_INTEGER)
    } else {
        (value as i64, Conversion::OK)
    }
}

fn parse_lexeme(text: &str) -> Parsed {
    if let Ok(int) = text.parse::<i64>() {
        return Parsed {
            int,
            int_flags: Conversion::OK,
            float: int as f64,
            float_flags: int_to_float_flags(int),
        };
    }
    let Ok(float) = text.parse::<f64>() else {
        // Construction validates the grammar, so this only guards against
        // values produced through interop shortcuts.
        return Parsed {
            int: 0,
            int_flags: Conversion::NOT_A_NUMBER,
            float: 0.0,
            float_flags: Conversion::NOT_A_NUMBER,
        };
    };
    let negative = text.starts_with('-');
    if float.is_infinite() {
        // The lexeme is syntactically a number but beyond f64 range.
        return if negative {
            Parsed {
                int: i64::MIN,
                int_flags: Conversion::NEGATIVE_OVERFLOW,
                float: f64::MIN,
                float_flags: Conversion::NEGATIVE_OVERFLOW,
            }
        } else {
            Parsed {
                int: i64::MAX,
                int_flags: Conversion::POSITIVE_OVERFLOW,
                float: f64::MAX,
                float_flags: Conversion::POSITIVE_OVERFLOW,
            }
        };
    }
    if !text.contains(['.', 'e', 'E']) {
        // An integer lexeme that failed the i64 parse: out of i64 range,
        // hence necessarily beyond the exact f64 integer window too.
        let (int, int_flags) = if negative {
            (i64::MIN, Conversion::NEGATIVE_OVERFLOW)
        } else {
            (i64::MAX, Conversion::POSITIVE_OVERFLOW)
        };
        return Parsed {
            int,
            int_flags,
            float,
            float_flags: Conversion::PRECISION_LOSS,
        };
    }
    let (int, int_flags) = float_to_i64(float);
    Parsed {
        int,
        int_flags,
        float,
        float_flags: Conversion::OK,
    }
}

/// Checks the RFC 8259 number grammar: `-?(0|[1-9]\d*)(\.\d+)?([eE][+-]?\d+)?`.
fn is_json_number(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut i = 0;
    if bytes.first() == Some(&b'-') {
        i += 1;
    }
    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let int_len = i - int_start;
    if int_len == 0 || (int_len > 1 && bytes[int_start] == b'0') {
        return false;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == frac_start {
            return false;
        }
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        i += 1;
        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }
    i == bytes.len()
}

/// `%.14g`-style formatting: 14 significant digits, scientific notation
/// outside the `[1e-4, 1e14)` window, trailing zeros trimmed.
pub(crate) fn format_double(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    let sci = format!("{value:.13e}");
    let (mantissa, exponent) = sci
        .split_once('e')
        .expect("`{:e}` always contains an exponent");
    let exp: i32 = exponent.parse().expect("exponent is an integer");
    if exp < -4 || exp >= 14 {
        let mantissa = mantissa.trim_end_matches('0').trim_end_matches('.');
        if exp < 0 {
            format!("{mantissa}e-{:02}", -exp)
        } else {
            format!("{mantissa}e+{exp:02}")
        }
    } else {
        let precision = (13 - exp).max(0) as usize;
        let fixed = format!("{value:.precision$}");
        if fixed.contains('.') {
            fixed
                .trim_end_matches('0')
                .trim_end_matches('.')
                .to_string()
        } else {
            fixed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn int_conversions_are_exact() {
        let n = Number::from_i64(42);
        assert_eq!(n.as_i64(), (42, Conversion::OK));
        assert_eq!(n.as_f64(), (42.0, Conversion::OK));
    }

    #[test]
    fn raw_one_past_i64_max() {
        let n = Number::from_lexeme("9223372036854775808").unwrap();
        let (i, flags) = n.as_i64();
        assert_eq!(i, i64::MAX);
        assert!(flags.contains(Conversion::POSITIVE_OVERFLOW));
        let (_, flags) = n.as_f64();
        assert!(flags.contains(Conversion::PRECISION_LOSS));
    }

    #[test]
    fn raw_conversion_is_cached() {
        let n = Number::from_lexeme("1e2").unwrap();
        assert_eq!(n.as_i64(), (100, Conversion::OK));
        assert_eq!(n.as_i64(), (100, Conversion::OK));
    }

    #[test]
    fn fractional_raw_is_not_an_integer() {
        let n = Number::from_lexeme("0.5").unwrap();
        let (_, flags) = n.as_i64();
        assert!(flags.contains(Conversion::NOT_AN_INTEGER));
        assert!(!n.is_integer());
    }

    #[test]
    fn i32_narrowing_overflow() {
        let n = Number::from_i64(i64::from(i32::MAX) + 1);
        let (v, flags) = n.as_i32();
        assert_eq!(v, i32::MAX);
        assert!(flags.contains(Conversion::POSITIVE_OVERFLOW));
    }

    #[test]
    fn beyond_double_range_overflows() {
        let n = Number::from_lexeme("1e999").unwrap();
        let (v, flags) = n.as_f64();
        assert_eq!(v, f64::MAX);
        assert!(flags.contains(Conversion::POSITIVE_OVERFLOW));
    }

    #[test]
    fn nan_rejected_at_construction() {
        assert_eq!(Number::from_f64(f64::NAN), Err(ValueError::NotFinite));
        assert_eq!(Number::from_f64(f64::INFINITY), Err(ValueError::NotFinite));
        assert!(Number::from_lexeme("NaN").is_err());
    }

    #[test_case("1", "1.0" ; "int vs float")]
    #[test_case("100", "1e2" ; "int vs exponent")]
    #[test_case("0.5", "5e-1" ; "fraction vs exponent")]
    fn cross_representation_equality(a: &str, b: &str) {
        let a = Number::from_lexeme(a).unwrap();
        let b = Number::from_lexeme(b).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.numeric_cmp(&b), Ordering::Equal);
    }

    #[test]
    fn int_float_comparison_is_exact_beyond_2_53() {
        // 2^53 and 2^53 + 1 collapse to the same f64; exact comparison
        // must still tell the integers apart.
        let int = Number::from_i64((1 << 53) + 1);
        let float = Number::from_f64(9007199254740992.0).unwrap();
        assert_eq!(int.numeric_cmp(&float), Ordering::Greater);
    }

    #[test]
    fn raw_overflowing_lexeme_compares_above_i64_max() {
        let big = Number::from_lexeme("9223372036854775808").unwrap();
        let max = Number::from_i64(i64::MAX);
        assert_eq!(big.numeric_cmp(&max), Ordering::Greater);
    }

    #[test_case(3.14, "3.14")]
    #[test_case(0.1, "0.1")]
    #[test_case(100.0, "100")]
    #[test_case(1e100, "1e+100")]
    #[test_case(-2.5e-7, "-2.5e-07")]
    #[test_case(0.0, "0")]
    #[test_case(1.0 / 3.0, "0.33333333333333")]
    fn double_formatting(value: f64, expected: &str) {
        assert_eq!(format_double(value), expected);
    }

    #[test_case("0" ; "zero")]
    #[test_case("-0" ; "negative zero")]
    #[test_case("1.5e+300" ; "full grammar")]
    fn valid_lexemes(lexeme: &str) {
        assert!(Number::from_lexeme(lexeme).is_ok());
    }

    #[test_case("01" ; "leading zero")]
    #[test_case("1." ; "empty fraction")]
    #[test_case(".5" ; "missing integer part")]
    #[test_case("1e" ; "empty exponent")]
    #[test_case("+1" ; "leading plus")]
    #[test_case("" ; "empty")]
    fn malformed_lexemes(lexeme: &str) {
        assert!(Number::from_lexeme(lexeme).is_err());
    }
}

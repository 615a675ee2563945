//! Gap-fillable ordering keys for sibling and z-order placement.
//!
//! An [`OrderKey`] is an opaque string whose lexicographic order is the shape
//! order. A new key can always be generated strictly between two existing keys
//! without renumbering any other shape.
//!
//! # Key format
//!
//! Keys use base-62 digits (`0-9A-Za-z`) and have two parts:
//!
//! ```text
//!   a 3 V
//!   │ │ └── fractional part (never ends with '0')
//!   │ └──── integer digits
//!   └────── head: 'a'..'z' → 1..26 integer digits, 'A'..'Z' → 26..1 (negative range)
//! ```
//!
//! Integer parts are incremented while they still fit; once the largest
//! integer is reached the fractional part grows instead, so there is no upper
//! limit on the number of keys.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const DIGITS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const ZERO_DIGIT: u8 = b'0';
const INTEGER_ZERO: &str = "a0";
const SMALLEST_INTEGER: &str = "A00000000000000000000000000";

/// Errors produced while generating or validating ordering keys.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("invalid order key `{0}`")]
    Invalid(String),

    #[error("order key `{lower}` is not below `{upper}`")]
    OutOfOrder { lower: String, upper: String },

    #[error("order key range exhausted below `{0}`")]
    Exhausted(String),
}

/// A lexicographically ordered key used as a shape's `findex`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderKey(String);

impl OrderKey {
    /// Wraps a key string after validating its format.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::Invalid`] if the string is not a well-formed key.
    pub fn parse(key: &str) -> Result<Self, KeyError> {
        validate_order_key(key)?;
        Ok(Self(key.to_string()))
    }

    /// Returns the key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Default for OrderKey {
    fn default() -> Self {
        Self(INTEGER_ZERO.to_string())
    }
}

/// Generates a key strictly between `lower` and `upper`.
///
/// A missing bound is open-ended; with both bounds missing the result is the
/// zero key `"a0"`.
///
/// # Errors
///
/// Returns [`KeyError::OutOfOrder`] if `lower >= upper`, and
/// [`KeyError::Invalid`] for malformed bounds.
///
/// # Examples
///
/// ```
/// use tangram_core::order_key::{OrderKey, between};
///
/// let first = between(None, None).unwrap();
/// let second = between(Some(&first), None).unwrap();
/// let middle = between(Some(&first), Some(&second)).unwrap();
///
/// assert!(first < middle && middle < second);
/// ```
pub fn between(lower: Option<&OrderKey>, upper: Option<&OrderKey>) -> Result<OrderKey, KeyError> {
    generate_key_between(lower.map(OrderKey::as_str), upper.map(OrderKey::as_str)).map(OrderKey)
}

/// Like [`between`], but tolerates `lower >= upper`.
///
/// When the bounds collide the upper bound is ignored and the result is a key
/// strictly after `lower`. Callers inserting a batch of equal-priority siblings
/// pass each result as the next `lower` to keep the batch strictly ordered.
///
/// # Errors
///
/// Returns [`KeyError::Invalid`] for malformed bounds.
pub fn between_allow_same(
    lower: Option<&OrderKey>,
    upper: Option<&OrderKey>,
) -> Result<OrderKey, KeyError> {
    match (lower, upper) {
        (Some(lower), Some(upper)) if lower >= upper => between(Some(lower), None),
        _ => between(lower, upper),
    }
}

/// Generates `n` strictly increasing keys between `lower` and `upper`.
///
/// Keys are produced by bisection so their length grows logarithmically with
/// `n` when both bounds are present.
///
/// # Errors
///
/// Same conditions as [`between`].
pub fn n_between(
    lower: Option<&OrderKey>,
    upper: Option<&OrderKey>,
    n: usize,
) -> Result<Vec<OrderKey>, KeyError> {
    match n {
        0 => return Ok(Vec::new()),
        1 => return Ok(vec![between(lower, upper)?]),
        _ => {}
    }

    match (lower, upper) {
        (_, None) => {
            let mut keys = Vec::with_capacity(n);
            let mut current = between(lower, None)?;
            for _ in 1..n {
                let next = between(Some(&current), None)?;
                keys.push(current);
                current = next;
            }
            keys.push(current);
            Ok(keys)
        }
        (None, Some(upper)) => {
            let mut keys = Vec::with_capacity(n);
            let mut current = between(None, Some(upper))?;
            for _ in 1..n {
                let next = between(None, Some(&current))?;
                keys.push(current);
                current = next;
            }
            keys.push(current);
            keys.reverse();
            Ok(keys)
        }
        (Some(lower), Some(upper)) => {
            let mid = n / 2;
            let pivot = between(Some(lower), Some(upper))?;
            let mut keys = n_between(Some(lower), Some(&pivot), mid)?;
            let tail = n_between(Some(&pivot), Some(upper), n - mid - 1)?;
            keys.push(pivot);
            keys.extend(tail);
            Ok(keys)
        }
    }
}

fn digit_value(digit: u8) -> Result<usize, KeyError> {
    DIGITS
        .iter()
        .position(|&d| d == digit)
        .ok_or_else(|| KeyError::Invalid(char::from(digit).to_string()))
}

fn integer_length(head: u8) -> Result<usize, KeyError> {
    match head {
        b'a'..=b'z' => Ok(usize::from(head - b'a') + 2),
        b'A'..=b'Z' => Ok(usize::from(b'Z' - head) + 2),
        _ => Err(KeyError::Invalid(char::from(head).to_string())),
    }
}

fn integer_part(key: &str) -> Result<&str, KeyError> {
    let head = *key
        .as_bytes()
        .first()
        .ok_or_else(|| KeyError::Invalid(key.to_string()))?;
    let length = integer_length(head)?;
    key.get(..length)
        .ok_or_else(|| KeyError::Invalid(key.to_string()))
}

fn validate_integer(integer: &str) -> Result<(), KeyError> {
    let head = *integer
        .as_bytes()
        .first()
        .ok_or_else(|| KeyError::Invalid(integer.to_string()))?;
    if integer_length(head)? != integer.len() {
        return Err(KeyError::Invalid(integer.to_string()));
    }
    Ok(())
}

fn validate_order_key(key: &str) -> Result<(), KeyError> {
    if key == SMALLEST_INTEGER {
        return Err(KeyError::Invalid(key.to_string()));
    }
    let integer = integer_part(key)?;
    let fraction = &key[integer.len()..];
    if fraction.as_bytes().last() == Some(&ZERO_DIGIT) {
        return Err(KeyError::Invalid(key.to_string()));
    }
    key.bytes().skip(1).try_for_each(|d| digit_value(d).map(|_| ()))
}

/// Fractional midpoint of `a` and `b` where both are digit strings read as `0.a` and `0.b`.
///
/// `b == None` stands for `1.0`.
fn midpoint(a: &str, b: Option<&str>) -> Result<String, KeyError> {
    if let Some(b) = b.filter(|b| a >= *b) {
        return Err(KeyError::OutOfOrder {
            lower: a.to_string(),
            upper: b.to_string(),
        });
    }
    if a.as_bytes().last() == Some(&ZERO_DIGIT)
        || b.is_some_and(|b| b.as_bytes().last() == Some(&ZERO_DIGIT))
    {
        return Err(KeyError::Invalid(a.to_string()));
    }

    if let Some(b) = b {
        let a_bytes = a.as_bytes();
        let b_bytes = b.as_bytes();
        let mut n = 0;
        while n < b_bytes.len() && a_bytes.get(n).copied().unwrap_or(ZERO_DIGIT) == b_bytes[n] {
            n += 1;
        }
        if n > 0 {
            let rest_a = a.get(n..).unwrap_or("");
            return Ok(format!("{}{}", &b[..n], midpoint(rest_a, Some(&b[n..]))?));
        }
    }

    let digit_a = match a.as_bytes().first() {
        Some(&d) => digit_value(d)?,
        None => 0,
    };
    let digit_b = match b.and_then(|b| b.as_bytes().first()) {
        Some(&d) => digit_value(d)?,
        None => DIGITS.len(),
    };

    if digit_b - digit_a > 1 {
        let mid_digit = (digit_a + digit_b + 1) / 2;
        Ok(char::from(DIGITS[mid_digit]).to_string())
    } else if let Some(b) = b.filter(|b| b.len() > 1) {
        Ok(b[..1].to_string())
    } else {
        let rest_a = a.get(1..).unwrap_or("");
        Ok(format!(
            "{}{}",
            char::from(DIGITS[digit_a]),
            midpoint(rest_a, None)?
        ))
    }
}

fn increment_integer(integer: &str) -> Result<Option<String>, KeyError> {
    validate_integer(integer)?;
    let bytes = integer.as_bytes();
    let head = bytes[0];
    let mut digits = bytes[1..].to_vec();

    let mut carry = true;
    for digit in digits.iter_mut().rev() {
        let value = digit_value(*digit)? + 1;
        if value == DIGITS.len() {
            *digit = ZERO_DIGIT;
        } else {
            *digit = DIGITS[value];
            carry = false;
            break;
        }
    }

    if carry {
        if head == b'Z' {
            return Ok(Some(format!("a{}", char::from(ZERO_DIGIT))));
        }
        if head == b'z' {
            return Ok(None);
        }
        let next_head = head + 1;
        if next_head > b'a' {
            digits.push(ZERO_DIGIT);
        } else {
            digits.pop();
        }
        digits.insert(0, next_head);
    } else {
        digits.insert(0, head);
    }
    Ok(Some(String::from_utf8_lossy(&digits).into_owned()))
}

fn decrement_integer(integer: &str) -> Result<Option<String>, KeyError> {
    validate_integer(integer)?;
    let bytes = integer.as_bytes();
    let head = bytes[0];
    let mut digits = bytes[1..].to_vec();
    let max_digit = DIGITS[DIGITS.len() - 1];

    let mut borrow = true;
    for digit in digits.iter_mut().rev() {
        let value = digit_value(*digit)?;
        if value == 0 {
            *digit = max_digit;
        } else {
            *digit = DIGITS[value - 1];
            borrow = false;
            break;
        }
    }

    if borrow {
        if head == b'a' {
            return Ok(Some(format!("Z{}", char::from(max_digit))));
        }
        if head == b'A' {
            return Ok(None);
        }
        let next_head = head - 1;
        if next_head < b'Z' {
            digits.push(max_digit);
        } else {
            digits.pop();
        }
        digits.insert(0, next_head);
    } else {
        digits.insert(0, head);
    }
    Ok(Some(String::from_utf8_lossy(&digits).into_owned()))
}

fn generate_key_between(a: Option<&str>, b: Option<&str>) -> Result<String, KeyError> {
    if let Some(a) = a {
        validate_order_key(a)?;
    }
    if let Some(b) = b {
        validate_order_key(b)?;
    }

    match (a, b) {
        (None, None) => Ok(INTEGER_ZERO.to_string()),
        (Some(a), Some(b)) if a >= b => Err(KeyError::OutOfOrder {
            lower: a.to_string(),
            upper: b.to_string(),
        }),
        (None, Some(b)) => {
            let int_b = integer_part(b)?;
            let frac_b = &b[int_b.len()..];
            if int_b == SMALLEST_INTEGER {
                return Ok(format!("{int_b}{}", midpoint("", Some(frac_b))?));
            }
            if int_b < b {
                return Ok(int_b.to_string());
            }
            decrement_integer(int_b)?.ok_or_else(|| KeyError::Exhausted(b.to_string()))
        }
        (Some(a), None) => {
            let int_a = integer_part(a)?;
            let frac_a = &a[int_a.len()..];
            match increment_integer(int_a)? {
                Some(next) => Ok(next),
                None => Ok(format!("{int_a}{}", midpoint(frac_a, None)?)),
            }
        }
        (Some(a), Some(b)) => {
            let int_a = integer_part(a)?;
            let frac_a = &a[int_a.len()..];
            let int_b = integer_part(b)?;
            let frac_b = &b[int_b.len()..];
            if int_a == int_b {
                return Ok(format!("{int_a}{}", midpoint(frac_a, Some(frac_b))?));
            }
            match increment_integer(int_a)? {
                Some(next) if next.as_str() < b => Ok(next),
                _ => Ok(format!("{int_a}{}", midpoint(frac_a, None)?)),
            }
        }
    }
}

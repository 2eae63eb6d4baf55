//! Configuration options for the codec and the form engine.

use std::collections::BTreeMap;

/// Limits applied while decoding untrusted buffers.
///
/// # Example
///
/// ```
/// use knot_core::options::DecodeOptions;
///
/// let options = DecodeOptions {
///     max_depth: 64,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Maximum value nesting depth.
    ///
    /// Default: 512
    pub max_depth: usize,

    /// Maximum element count accepted for a single vector.
    ///
    /// Default: 1 << 24
    pub max_vec_len: usize,

    /// Maximum number of vector elements, summed over the whole message,
    /// whose type is encoded with no bytes (`null`, records of `null`).
    /// Other elements are bounded by the size of the buffer.
    ///
    /// Default: 1 << 16
    pub max_zero_sized: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_depth: 512,
            max_vec_len: 1 << 24,
            max_zero_sized: 1 << 16,
        }
    }
}

/// Options for interactive forms.
///
/// # Example
///
/// ```
/// use knot_core::options::FormOptions;
///
/// let mut options = FormOptions { max_vec_len: 10, ..Default::default() };
/// options.labels.insert("short_name".into(), "Short name".into());
/// assert_eq!(options.lucky.depth_budget, 6);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormOptions {
    /// Largest length a vector length field accepts. Longer values are clamped.
    ///
    /// Default: 100
    pub max_vec_len: usize,

    /// Generation options used when a form fills empty leaves randomly.
    pub lucky: LuckyOptions,

    /// Display labels of record fields, by field name. Fields without an
    /// entry are labelled with their name.
    ///
    /// Default: empty
    pub labels: BTreeMap<String, String>,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            max_vec_len: 100,
            lucky: LuckyOptions::default(),
            labels: BTreeMap::new(),
        }
    }
}

/// Options for random value generation.
///
/// # Example
///
/// ```
/// use knot_core::options::LuckyOptions;
///
/// let options = LuckyOptions {
///     depth_budget: 3,
///     max_vec_len: 2,
///     text_len: 4,
/// };
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LuckyOptions {
    /// Nesting levels generated freely before only the shortest
    /// terminating branches are taken.
    ///
    /// Default: 6
    pub depth_budget: usize,

    /// Largest generated vector.
    ///
    /// Default: 3
    pub max_vec_len: usize,

    /// Longest generated text.
    ///
    /// Default: 8
    pub text_len: usize,
}

impl Default for LuckyOptions {
    fn default() -> Self {
        Self {
            depth_budget: 6,
            max_vec_len: 3,
            text_len: 8,
        }
    }
}

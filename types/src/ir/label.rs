//! Field label hashing.
//!
//! Record and variant fields travel on the wire as 32-bit ids derived from
//! their names, and both the type table and value encodings order fields by
//! that id.

/// Hash a field name into its wire id.
///
/// `h = h * 223 + byte (mod 2^32)` over the UTF-8 bytes of `name`.
pub fn label_hash(name: &str) -> u32 {
    name.bytes()
        .fold(0u32, |h, b| h.wrapping_mul(223).wrapping_add(b as u32))
}

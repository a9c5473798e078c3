/// [MurmurHash3][murmur] 64-bit finalizer.
///
/// Spreads all input bits over the whole word, so that consecutive keys
/// (entry ids, quantized reals) land in unrelated buckets.
///
/// [murmur]: https://github.com/aappleby/smhasher/wiki/MurmurHash3
pub const fn murmur64(mut k: u64) -> u64 {
    k ^= k >> 33;
    k = k.wrapping_mul(0xff51_afd7_ed55_8ccd);
    k ^= k >> 33;
    k = k.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    k ^= k >> 33;
    k
}

/// Combines two hash values (boost `hash_combine` with the 64-bit golden ratio).
pub const fn combine_hash(lhs: u64, rhs: u64) -> u64 {
    lhs ^ rhs
        .wrapping_add(0x9e37_79b9_7f4a_7c15)
        .wrapping_add(lhs << 6)
        .wrapping_add(lhs >> 2)
}

/// Combines three hash values.
pub const fn combine_hash3(a: u64, b: u64, c: u64) -> u64 {
    combine_hash(a, combine_hash(b, c))
}

pub trait MyHash {
    /// Hash value used for bucket selection.
    fn hash(&self) -> u64;
}

impl MyHash for i64 {
    fn hash(&self) -> u64 {
        murmur64(*self as u64)
    }
}

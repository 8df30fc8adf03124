//! The two node hashes. Both are part of the storage contract: they pick the
//! bucket an entry lands in, so changing either reshuffles the table layout
//! that a GPU-side lookup would have to reproduce.

/// 32-bit hash of a packed 64-bit leaf: three xor-multiply finalizer rounds,
/// truncated.
pub fn hash_leaf(leaf: u64) -> u32 {
    let mut h = leaf;
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
    h ^= h >> 33;
    h = h.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    h ^= h >> 33;
    h as u32
}

/// 32-bit hash of an internal node's word sequence: Murmur3 scramble per
/// word, length mixed in, Murmur3 finalizer, seed 0.
pub fn hash_node(words: &[u32]) -> u32 {
    let mut h: u32 = 0;
    for &word in words {
        let mut k = word.wrapping_mul(0xcc9e_2d51);
        k = k.rotate_left(15);
        k = k.wrapping_mul(0x1b87_3593);
        h ^= k;
        h = h.rotate_left(13);
        h = h.wrapping_mul(5).wrapping_add(0xe654_6b64);
    }
    h ^= words.len() as u32;
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

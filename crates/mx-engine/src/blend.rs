//! Blend rule for merging two wide sample streams.
//!
//! A zero sample counts as "nothing written yet": blending with zero
//! yields the other operand unchanged. Two non-zero samples are averaged
//! with 64-bit intermediates, truncating toward zero.

/// Blend two wide samples.
#[inline]
pub fn blend(a: i32, b: i32) -> i32 {
    if a == 0 {
        b
    } else if b == 0 {
        a
    } else {
        ((a as i64 + b as i64) / 2) as i32
    }
}

/// Blend `src` into `dst` in place.
#[inline]
pub fn blend_into(dst: &mut i32, src: i32) {
    if src != 0 {
        *dst = if *dst == 0 {
            src
        } else {
            ((*dst as i64 + src as i64) / 2) as i32
        };
    }
}

/// Blend interleaved `src` into `dst`, sample by sample, over the shorter of the two.
pub fn blend_buffer(dst: &mut [i32], src: &[i32]) {
    for (d, &s) in dst.iter_mut().zip(src) {
        blend_into(d, s);
    }
}

//! Per-channel volume applied to committed wide samples.

use mx_pcm::{Volume, MAX_CHANNELS};

/// Fixed-point shift of the internal gain.
pub const VOLUME_SHIFT: u32 = 30;

/// Unity gain (0 dB).
pub const VOLUME_0DB: u32 = 1 << VOLUME_SHIFT;

/// 8-bit level to exponential multiplier. 0 is -96 dB, 255 is 0 dB,
/// roughly 0.375 dB per step so the value doubles every 16 steps.
const VOLUME_CONV: [u32; 256] = [
    1, 1, 1, 1, 1, 1, 1, 1, //   7
    1, 2, 2, 2, 2, 2, 2, 2, //  15
    2, 2, 2, 2, 2, 3, 3, 3, //  23
    3, 3, 3, 3, 4, 4, 4, 4, //  31
    4, 4, 5, 5, 5, 5, 5, 6, //  39
    6, 6, 6, 7, 7, 7, 8, 8, //  47
    8, 9, 9, 10, 10, 10, 11, 11, //  55
    12, 12, 13, 13, 14, 15, 15, 16, //  63
    17, 17, 18, 19, 20, 21, 22, 23, //  71
    24, 25, 26, 27, 28, 29, 31, 32, //  79
    33, 35, 36, 38, 40, 41, 43, 45, //  87
    47, 49, 52, 54, 56, 59, 61, 64, //  95
    67, 70, 73, 76, 79, 83, 87, 91, // 103
    95, 99, 103, 108, 112, 117, 123, 128, // 111
    134, 140, 146, 152, 159, 166, 173, 181, // 119
    189, 197, 206, 215, 225, 235, 245, 256, // 127
    267, 279, 292, 304, 318, 332, 347, 362, // 135
    378, 395, 412, 431, 450, 470, 490, 512, // 143
    535, 558, 583, 609, 636, 664, 693, 724, // 151
    756, 790, 825, 861, 899, 939, 981, 1024, // 159
    1069, 1117, 1166, 1218, 1272, 1328, 1387, 1448, // 167
    1512, 1579, 1649, 1722, 1798, 1878, 1961, 2048, // 175
    2139, 2233, 2332, 2435, 2543, 2656, 2774, 2896, // 183
    3025, 3158, 3298, 3444, 3597, 3756, 3922, 4096, // 191
    4277, 4467, 4664, 4871, 5087, 5312, 5547, 5793, // 199
    6049, 6317, 6597, 6889, 7194, 7512, 7845, 8192, // 207
    8555, 8933, 9329, 9742, 10173, 10624, 11094, 11585, // 215
    12098, 12634, 13193, 13777, 14387, 15024, 15689, 16384, // 223
    17109, 17867, 18658, 19484, 20347, 21247, 22188, 23170, // 231
    24196, 25268, 26386, 27554, 28774, 30048, 31379, 32768, // 239
    34219, 35734, 37316, 38968, 40693, 42495, 44376, 46341, // 247
    48393, 50535, 52773, 55109, 57549, 60097, 62757, 65536, // 255
];

/// Internal gain for an 8-bit level.
pub fn level_to_gain(level: u8) -> u32 {
    VOLUME_CONV[level as usize] * (VOLUME_0DB >> 16)
}

/// Volume as the mixing buffer applies it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MixVolume {
    muted: bool,
    /// Every active channel is at unity gain.
    all_max: bool,
    gains: [u32; MAX_CHANNELS],
}

impl MixVolume {
    /// Unity gain on every channel.
    pub fn new() -> Self {
        MixVolume {
            muted: false,
            all_max: true,
            gains: [VOLUME_0DB; MAX_CHANNELS],
        }
    }

    /// Convert a caller volume for a buffer of `channels` channels.
    pub fn set(&mut self, vol: &Volume, channels: usize) {
        let channels = channels.min(MAX_CHANNELS);
        if vol.muted {
            self.muted = true;
            self.all_max = false;
            self.gains = [0; MAX_CHANNELS];
            return;
        }

        self.muted = false;
        for (gain, &level) in self.gains[..channels].iter_mut().zip(&vol.levels) {
            *gain = level_to_gain(level);
        }
        self.all_max = self.gains[..channels].iter().all(|&g| g == VOLUME_0DB);
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_all_max(&self) -> bool {
        self.all_max
    }

    pub fn gains(&self) -> &[u32] {
        &self.gains
    }

    /// Apply to a contiguous run of interleaved frames.
    pub(crate) fn apply(&self, samples: &mut [i32], channels: usize) {
        if self.muted {
            samples.fill(0);
        } else if !self.all_max {
            for frame in samples.chunks_exact_mut(channels) {
                for (s, &gain) in frame.iter_mut().zip(&self.gains) {
                    *s = ((*s as i64 * gain as i64) >> VOLUME_SHIFT) as i32;
                }
            }
        }
    }
}

impl Default for MixVolume {
    fn default() -> Self {
        Self::new()
    }
}

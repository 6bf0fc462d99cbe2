// SPDX-License-Identifier: GPL-3.0-or-later

//! The SID's 2-pole programmable IIR filter and its per-voice gain
//! stage, both recalculated only when the relevant registers change.

/// Filter routing mode selected by the low 3 bits of `$d417`/`$d418`-style
/// mode/volume registers (high-pass, band-pass, low-pass bits) as
/// combined into one of seven useful filter types, plus the pass-through
/// "no filtering at all" case used when a tune writes an empty combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    LowPass,
    HighPass,
    BandPass,
    LowBandPass,
    HighBandPass,
    Notch,
    AllPass,
    None,
}

impl FilterMode {
    pub fn from_bits(low_pass: bool, band_pass: bool, high_pass: bool) -> Self {
        match (low_pass, band_pass, high_pass) {
            (true, false, false) => Self::LowPass,
            (false, false, true) => Self::HighPass,
            (false, true, false) => Self::BandPass,
            (true, true, false) => Self::LowBandPass,
            (false, true, true) => Self::HighBandPass,
            (true, false, true) => Self::Notch,
            (true, true, true) => Self::AllPass,
            (false, false, false) => Self::None,
        }
    }
}

/// Resonance curve coefficient for the "frequency past cutoff" part of
/// the low-pass branch of the cutoff->frequency conversion table.
fn calc_resonance_lp(f: f64) -> f64 {
    227.755 - 1.7635 * f - 0.0176385 * f * f + 0.00333484 * f * f * f
}

fn calc_resonance_hp(f: f64) -> f64 {
    366.374 - 14.0052 * f + 0.603212 * f * f - 0.000880196 * f * f * f
}

/// Stereo 2-pole IIR filter state, shared by a SID's three filtered
/// voices (each mixed in, or routed around it, individually).
#[derive(Debug, Clone)]
pub struct Filter {
    pub mode: FilterMode,
    f_freq: u16,
    f_res: u8,

    d1: f64,
    d2: f64,
    g1: f64,
    g2: f64,
    f_ampl: f64,

    xn1_left: f64,
    xn2_left: f64,
    yn1_left: f64,
    yn2_left: f64,
    xn1_right: f64,
    xn2_right: f64,
    yn1_right: f64,
    yn2_right: f64,

    ffreq_lp: [f64; 256],
    ffreq_hp: [f64; 256],
}

impl Filter {
    pub fn new(sample_rate: u32) -> Self {
        let mut ffreq_lp = [0.0f64; 256];
        let mut ffreq_hp = [0.0f64; 256];
        for (i, slot) in ffreq_lp.iter_mut().enumerate() {
            *slot = calc_resonance_lp(i as f64).max(0.0);
        }
        for (i, slot) in ffreq_hp.iter_mut().enumerate() {
            *slot = calc_resonance_hp(i as f64).max(0.0);
        }
        let _ = sample_rate;
        let mut filter = Self {
            mode: FilterMode::None,
            f_freq: 0,
            f_res: 0,
            d1: 0.0,
            d2: 0.0,
            g1: 0.0,
            g2: 0.0,
            f_ampl: 0.0,
            xn1_left: 0.0,
            xn2_left: 0.0,
            yn1_left: 0.0,
            yn2_left: 0.0,
            xn1_right: 0.0,
            xn2_right: 0.0,
            yn1_right: 0.0,
            yn2_right: 0.0,
            ffreq_lp,
            ffreq_hp,
        };
        filter.recalculate(0);
        filter
    }

    pub fn set_cutoff(&mut self, f_freq: u16, obtained_freq: u32) {
        self.f_freq = f_freq;
        self.recalculate(obtained_freq);
    }

    pub fn set_resonance(&mut self, f_res: u8, obtained_freq: u32) {
        self.f_res = f_res;
        self.recalculate(obtained_freq);
    }

    pub fn set_mode(&mut self, mode: FilterMode, obtained_freq: u32) {
        self.mode = mode;
        self.xn1_left = 0.0;
        self.xn2_left = 0.0;
        self.yn1_left = 0.0;
        self.yn2_left = 0.0;
        self.xn1_right = 0.0;
        self.xn2_right = 0.0;
        self.yn1_right = 0.0;
        self.yn2_right = 0.0;
        self.recalculate(obtained_freq);
    }

    /// Rebuilds `d1`/`d2`/`g1`/`g2`/`f_ampl` from the current cutoff,
    /// resonance and mode. A mode of `None` zeroes every coefficient so
    /// `apply()` degenerates to an identity pass.
    fn recalculate(&mut self, obtained_freq: u32) {
        if self.mode == FilterMode::None || obtained_freq == 0 {
            self.d1 = 0.0;
            self.d2 = 0.0;
            self.g1 = 0.0;
            self.g2 = 0.0;
            self.f_ampl = 0.0;
            return;
        }

        let table = match self.mode {
            FilterMode::LowPass | FilterMode::LowBandPass => &self.ffreq_lp,
            _ => &self.ffreq_hp,
        };
        let fr = table[usize::from(self.f_freq)];
        let nyquist = f64::from(obtained_freq) / 2.0;
        let arg = (fr / nyquist).clamp(0.01, 0.99);

        let mut g2 = 0.55 + 1.2 * arg * arg - 1.2 * arg + f64::from(self.f_res) * 0.0133333333;
        let mut g1 = -2.0 * g2.sqrt() * (std::f64::consts::PI * arg).cos();

        if matches!(self.mode, FilterMode::LowBandPass | FilterMode::HighBandPass) {
            g2 += 0.1;
        }

        if g1.abs() >= g2 + 1.0 {
            g1 = if g1 > 0.0 { g2 + 0.99 } else { -(g2 + 0.99) };
        }

        let (d1, d2, f_ampl) = match self.mode {
            FilterMode::LowPass | FilterMode::LowBandPass => (2.0, 1.0, 0.25 * (1.0 + g1 + g2)),
            FilterMode::HighPass | FilterMode::HighBandPass => (-2.0, 1.0, 0.25 * (1.0 - g1 + g2)),
            FilterMode::BandPass => {
                let c = (g2 * g2 + 2.0 * g2 - g1 * g1 + 1.0).sqrt();
                let ampl = 0.25
                    * (-2.0 * g2 * g2 - (4.0 + 2.0 * c) * g2 - 2.0 * c + (c + 2.0) * g1 * g1 - 2.0)
                    / (-g2 * g2 - (c + 2.0) * g2 - c + g1 * g1 - 1.0);
                (0.0, -1.0, ampl)
            }
            FilterMode::Notch => {
                let cos_pi_arg = (std::f64::consts::PI * arg).cos();
                let d1 = -2.0 * cos_pi_arg;
                let ampl = if arg >= 0.5 {
                    0.5 * (1.0 + g1 + g2) / (1.0 - cos_pi_arg)
                } else {
                    0.5 * (1.0 - g1 + g2) / (1.0 + cos_pi_arg)
                };
                (d1, 1.0, ampl)
            }
            FilterMode::AllPass => {
                let cos_pi_arg = (std::f64::consts::PI * arg).cos();
                let d1 = -4.0 * cos_pi_arg;
                let ampl = if arg >= 0.5 {
                    (1.0 - g1 + g2) / (5.0 + 4.0 * cos_pi_arg)
                } else {
                    (1.0 + g1 + g2) / (5.0 - 4.0 * cos_pi_arg)
                };
                (d1, 4.0, ampl)
            }
            FilterMode::None => (0.0, 0.0, 0.0),
        };

        self.d1 = d1;
        self.d2 = d2;
        self.g1 = g1;
        self.g2 = g2;
        self.f_ampl = f_ampl;
    }

    /// Runs the filtered-bucket sum for one sample through the IIR,
    /// left and right independently.
    pub fn apply(&mut self, sum_left: i32, sum_right: i32) -> (i32, i32) {
        if self.mode == FilterMode::None {
            return (sum_left, sum_right);
        }

        let xn = f64::from(sum_left) * self.f_ampl;
        let yn = xn + self.d1 * self.xn1_left + self.d2 * self.xn2_left - self.g1 * self.yn1_left
            - self.g2 * self.yn2_left;
        self.xn2_left = self.xn1_left;
        self.xn1_left = xn;
        self.yn2_left = self.yn1_left;
        self.yn1_left = yn;

        let xn_r = f64::from(sum_right) * self.f_ampl;
        let yn_r = xn_r + self.d1 * self.xn1_right + self.d2 * self.xn2_right
            - self.g1 * self.yn1_right
            - self.g2 * self.yn2_right;
        self.xn2_right = self.xn1_right;
        self.xn1_right = xn_r;
        self.yn2_right = self.yn1_right;
        self.yn1_right = yn_r;

        (yn as i32, yn_r as i32)
    }
}

/// Per-voice stereo gain from volume (0..15 internal units), panning
/// (`-0x100`..`0x100`) and the chip-wide master volume.
pub fn calc_gain_voice(volume: u32, panning: i32, master_volume: u32) -> (i32, i32) {
    let panning = panning.clamp(-0x100, 0x100);
    let left = ((volume as i64 * i64::from(-panning + 0x100) * i64::from(master_volume)) >> 20)
        .clamp(0, 0x200) as i32;
    let right = ((volume as i64 * i64::from(panning + 0x100) * i64::from(master_volume)) >> 20)
        .clamp(0, 0x200) as i32;
    (left, right)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_filter_is_identity() {
        let mut f = Filter::new(44100);
        f.mode = FilterMode::None;
        assert_eq!(f.apply(1234, -5678), (1234, -5678));
    }

    #[test]
    fn low_pass_recalculate_produces_finite_coefficients() {
        let mut f = Filter::new(44100);
        f.set_mode(FilterMode::LowPass, 44100);
        f.set_cutoff(0x400, 44100);
        f.set_resonance(8, 44100);
        assert!(f.g1.is_finite());
        assert!(f.g2.is_finite());
        assert!(f.f_ampl.is_finite());
    }

    #[test]
    fn centered_pan_splits_gain_evenly() {
        let (l, r) = calc_gain_voice(0xf, 0, 0x100000);
        assert_eq!(l, r);
    }

    #[test]
    fn hard_left_pan_zeros_right_gain() {
        let (_l, r) = calc_gain_voice(0xf, -0x100, 0x100000);
        assert_eq!(r, 0);
    }
}

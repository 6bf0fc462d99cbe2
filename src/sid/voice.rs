// SPDX-License-Identifier: GPL-3.0-or-later

//! Per-voice oscillator, envelope generator and register state for one
//! of a SID chip's three synthesizer voices.

use super::tables;

/// Envelope generator state machine. `Idle` is entered once a release
/// reaches zero and stays there until the next gate-on edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EgState {
    Attack,
    Decay,
    Release,
    Idle,
}

/// One SID voice: oscillator (24-bit phase accumulator), waveform
/// selection, and its own ADSR envelope generator.
#[derive(Debug, Clone)]
pub struct Voice {
    pub freq: u16,
    pub pw: u16,
    pub wave: u8,
    pub test: bool,
    pub ring: bool,
    pub sync: bool,
    pub gate: bool,
    pub filter: bool,
    pub mute: bool,

    pub count: u32,
    pub add: u32,
    pub noise_output: u16,

    pub eg_state: EgState,
    pub eg_level: u32,
    a_add: u32,
    d_sub: u32,
    s_level: u32,
    r_sub: u32,
}

impl Default for Voice {
    fn default() -> Self {
        Self {
            freq: 0,
            pw: 0,
            wave: 0,
            test: false,
            ring: false,
            sync: false,
            gate: false,
            filter: false,
            mute: false,
            count: 0,
            add: 0,
            noise_output: 0,
            eg_state: EgState::Idle,
            eg_level: 0,
            a_add: 0,
            d_sub: 0,
            s_level: 0,
            r_sub: 0,
        }
    }
}

impl Voice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_freq_lo(&mut self, byte: u8, sid_cycles: u32) {
        self.freq = (self.freq & 0xff00) | u16::from(byte);
        self.recompute_add(sid_cycles);
    }

    pub fn set_freq_hi(&mut self, byte: u8, sid_cycles: u32) {
        self.freq = (self.freq & 0x00ff) | (u16::from(byte) << 8);
        self.recompute_add(sid_cycles);
    }

    /// `add = freq * sid_cycles`, where `sid_cycles` is the number of
    /// SID clock cycles represented by one audio sample
    /// (`chip_clock_hz / sample_rate`). Matches hardware exactly when
    /// that division is exact; the integer truncation otherwise is the
    /// same approximation the original player made.
    fn recompute_add(&mut self, sid_cycles: u32) {
        self.add = u32::from(self.freq).wrapping_mul(sid_cycles);
    }

    pub fn set_pw_lo(&mut self, byte: u8) {
        self.pw = (self.pw & 0x0f00) | u16::from(byte);
    }

    pub fn set_pw_hi(&mut self, byte: u8) {
        self.pw = (self.pw & 0x00ff) | (u16::from(byte & 0x0f) << 8);
    }

    /// Applies a control register ($04/$0b/$12) write. The SYNC bit
    /// (bit 1) does not belong to this voice's own state: on real
    /// hardware it enables synchronization of *this* voice by the
    /// previous one in the cyclic voice chain, which this engine
    /// models by storing the resulting flag on that other voice's
    /// `sync` field. Returns the raw SYNC bit so the caller (which
    /// owns the cyclic voice linkage) can do that.
    pub fn set_control(&mut self, byte: u8) -> bool {
        self.wave = (byte >> 4) & 0x0f;
        self.ring = byte & 0x04 != 0;
        self.test = byte & 0x08 != 0;
        if self.test {
            self.count = 0;
        }

        let gate = byte & 0x01 != 0;
        if gate != self.gate {
            if gate {
                self.eg_state = EgState::Attack;
            } else if self.eg_state != EgState::Idle {
                self.eg_state = EgState::Release;
            }
        }
        self.gate = gate;

        byte & 0x02 != 0
    }

    pub fn set_attack_decay(&mut self, byte: u8, eg_table: &[u32; 16]) {
        self.a_add = eg_table[usize::from(byte >> 4)];
        self.d_sub = eg_table[usize::from(byte & 0x0f)];
    }

    pub fn set_sustain_release(&mut self, byte: u8, eg_table: &[u32; 16]) {
        self.s_level = u32::from(byte >> 4) * 0x0011_1111;
        self.r_sub = eg_table[usize::from(byte & 0x0f)];
    }

    /// Advances the envelope generator by one sample, returning the
    /// updated 24-bit envelope level (`eg_level`).
    pub fn tick_envelope(&mut self) -> u32 {
        match self.eg_state {
            EgState::Attack => {
                self.eg_level = (self.eg_level + self.a_add).min(0x00ff_ffff);
                if self.eg_level >= 0x00ff_ffff {
                    self.eg_level = 0x00ff_ffff;
                    self.eg_state = EgState::Decay;
                }
            }
            EgState::Decay => {
                if self.eg_level > self.s_level {
                    let shift = tables::EG_DR_SHIFT[usize::from((self.eg_level >> 16) as u8)];
                    let step = self.d_sub >> shift;
                    self.eg_level = self.eg_level.saturating_sub(step).max(self.s_level);
                }
            }
            EgState::Release => {
                if self.eg_level > 0 {
                    let shift = tables::EG_DR_SHIFT[usize::from((self.eg_level >> 16) as u8)];
                    let step = self.r_sub >> shift;
                    if step >= self.eg_level {
                        self.eg_level = 0;
                        self.eg_state = EgState::Idle;
                    } else {
                        self.eg_level -= step;
                    }
                } else {
                    self.eg_state = EgState::Idle;
                }
            }
            EgState::Idle => self.eg_level = 0,
        }
        self.eg_level
    }

    /// Advances the 24-bit oscillator phase by one sample. `test`
    /// freezes the counter at zero. Returns the pre-mask count so the
    /// caller can evaluate the sync condition against the *unmasked*
    /// value (`>= 0x1000000`), matching the original's one-sample sync
    /// latency.
    pub fn advance_phase(&mut self) -> u32 {
        if !self.test {
            self.count = self.count.wrapping_add(self.add);
        }
        let unmasked = self.count;
        self.count &= 0x00ff_ffff;
        unmasked
    }
}

/// A simple linear congruential generator standing in for the 6581's
/// analog noise LFSR (see the Open Question decisions in DESIGN.md).
/// One instance is shared by every voice using the noise waveform on a
/// chip, the same way a single seed served the whole original program.
#[derive(Debug, Clone)]
pub struct NoiseGenerator {
    seed: u32,
}

impl Default for NoiseGenerator {
    fn default() -> Self {
        Self { seed: 1 }
    }
}

impl NoiseGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self) -> u16 {
        self.seed = self.seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        (self.seed >> 16) as u16
    }
}

/// Waveform generator output for one voice at its current phase.
/// `mod_by_count` is the ring-modulation partner's (cyclically: voice
/// N-1) phase counter, used only by the triangle waveform. `noise` is
/// the chip-wide noise generator; the noise waveform only samples it
/// once every `0x100000` phase units, caching the result the rest of
/// the time, and additionally narrows its own phase accumulator to 20
/// bits while doing so (matching the original's extra `& 0xfffff`).
/// `tri_table` is the shared symmetric triangle table
/// (`tables::build_tri_table`); it folds the sign-bit negation in
/// automatically via its symmetry.
pub fn waveform_output(
    voice: &mut Voice,
    mod_by_count: u32,
    noise: &mut NoiseGenerator,
    chip_8580: bool,
    tri_table: &[u16; 0x2000],
) -> u16 {
    let count = voice.count;
    let pw_gate = u32::from(voice.pw) << 12;
    let gate_on = count > pw_gate;

    let tri = |c: u32, ring_with: u32| -> u16 {
        let top = if voice.ring { c ^ (ring_with & 0x0080_0000) } else { c };
        tri_table[((top >> 11) & 0x1fff) as usize]
    };

    macro_rules! combined {
        ($table_6581:ident, $table_8580:ident) => {{
            let index = (count >> 16) as usize & 0xff;
            if chip_8580 {
                tables::$table_8580[index]
            } else {
                tables::$table_6581[index]
            }
        }};
    }

    match voice.wave {
        0x1 => tri(count, mod_by_count),
        0x2 => (count >> 8) as u16,
        0x3 => combined!(TRI_SAW_6581, TRI_SAW_8580),
        0x4 => {
            if gate_on {
                0xffff
            } else {
                0x0000
            }
        }
        0x5 => {
            if gate_on {
                combined!(TRI_RECT_6581, TRI_RECT_8580)
            } else {
                0x0000
            }
        }
        0x6 => {
            if gate_on {
                combined!(SAW_RECT_6581, SAW_RECT_8580)
            } else {
                0x0000
            }
        }
        0x7 => {
            if gate_on {
                combined!(TRI_SAW_RECT_6581, TRI_SAW_RECT_8580)
            } else {
                0x0000
            }
        }
        0x8 => {
            if count >= 0x0010_0000 {
                let sample = noise.next() << 8;
                voice.noise_output = sample;
                voice.count &= 0x000f_ffff;
                sample
            } else {
                voice.noise_output
            }
        }
        _ => 0x8000,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attack_ramps_to_full_then_decays() {
        let mut v = Voice::new();
        v.set_attack_decay(0x11, &tables::build_eg_table(1_000_000));
        v.set_sustain_release(0xf0, &tables::build_eg_table(1_000_000));
        v.set_control(0x01);
        assert_eq!(v.eg_state, EgState::Attack);
        for _ in 0..1_000_000 {
            v.tick_envelope();
            if v.eg_state != EgState::Attack {
                break;
            }
        }
        assert_eq!(v.eg_state, EgState::Decay);
    }

    #[test]
    fn gate_off_enters_release() {
        let mut v = Voice::new();
        v.eg_level = 0x00ff_ffff;
        v.set_control(0x01);
        v.set_control(0x00);
        assert_eq!(v.eg_state, EgState::Release);
    }

    #[test]
    fn release_reaches_idle_at_zero() {
        let mut v = Voice::new();
        v.eg_level = 10;
        v.eg_state = EgState::Release;
        v.r_sub = 0xffff_ffff;
        v.tick_envelope();
        assert_eq!(v.eg_level, 0);
        assert_eq!(v.eg_state, EgState::Idle);
    }

    #[test]
    fn pulse_waveform_is_full_scale_square() {
        let tri_table = tables::build_tri_table();
        let mut noise = NoiseGenerator::new();
        let mut v = Voice::new();
        v.wave = 0x4;
        v.pw = 0x800;
        v.count = 0;
        assert_eq!(waveform_output(&mut v, 0, &mut noise, false, &tri_table), 0x0000);
        v.count = 0x00ff_ffff;
        assert_eq!(waveform_output(&mut v, 0, &mut noise, false, &tri_table), 0xffff);
    }

    #[test]
    fn sawtooth_is_top_byte_of_phase() {
        let tri_table = tables::build_tri_table();
        let mut noise = NoiseGenerator::new();
        let mut v = Voice::new();
        v.wave = 0x2;
        v.count = 0x00ab_cdef;
        assert_eq!(waveform_output(&mut v, 0, &mut noise, false, &tri_table), 0xabcd);
    }

    #[test]
    fn triangle_waveform_is_symmetric_around_phase_midpoint() {
        let tri_table = tables::build_tri_table();
        let mut noise = NoiseGenerator::new();
        let mut v = Voice::new();
        v.wave = 0x1;
        v.count = 0x10_0000;
        let rising = waveform_output(&mut v, 0, &mut noise, false, &tri_table);
        v.count = 0x00ff_ffff - 0x10_0000;
        let falling = waveform_output(&mut v, 0, &mut noise, false, &tri_table);
        assert_eq!(rising, falling);
    }

    #[test]
    fn pure_trisaw_is_not_pulse_width_gated() {
        let tri_table = tables::build_tri_table();
        let mut noise = NoiseGenerator::new();
        let mut v = Voice::new();
        v.wave = 0x3;
        v.pw = 0xfff;
        v.count = 0x10_0000;
        let output = waveform_output(&mut v, 0, &mut noise, false, &tri_table);
        assert_eq!(output, tables::TRI_SAW_6581[(v.count >> 16) as usize & 0xff]);
    }

    #[test]
    fn noise_waveform_refreshes_only_past_threshold() {
        let tri_table = tables::build_tri_table();
        let mut noise = NoiseGenerator::new();
        let mut v = Voice::new();
        v.wave = 0x8;
        v.count = 0x000f_ffff;
        let cached = waveform_output(&mut v, 0, &mut noise, false, &tri_table);
        assert_eq!(cached, 0);
        v.count = 0x0010_0000;
        let fresh = waveform_output(&mut v, 0, &mut noise, false, &tri_table);
        assert_ne!(fresh, 0);
        assert_eq!(v.count, 0);
    }
}

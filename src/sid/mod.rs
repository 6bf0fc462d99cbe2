// SPDX-License-Identifier: GPL-3.0-or-later

//! Cycle-accurate MOS 6581/8580 SID emulation: one or two chip
//! instances, each with three oscillator/envelope voices plus the
//! register-$1D Galway-noise/sample-replay extension, mixed through a
//! shared 2-pole filter and optional reverb/spatial post-effect.

pub mod filter;
pub mod tables;
pub mod voice;
pub mod voice4;

use filter::{Filter, FilterMode};
use voice::{NoiseGenerator, Voice};
use voice4::Voice4;

/// How the final stereo mix is shaped after both chips are summed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEffect {
    None,
    Reverb,
    Spatial,
}

/// Per-voice stereo mix settings (not to be confused with a chip's own
/// 4-bit volume *register*, which scales the envelope, not the mix).
#[derive(Debug, Clone, Copy)]
pub struct VoiceMix {
    pub pan: i32,
    pub volume: i32,
}

impl Default for VoiceMix {
    fn default() -> Self {
        Self { pan: 0, volume: 0x100 }
    }
}

/// One emulated SID chip: three voices, voice 4, and the shared filter.
pub struct SidChip {
    pub voices: [Voice; 3],
    pub voice4: Voice4,
    pub filter: Filter,
    regs: [u8; 0x80],
    last_written_byte: u8,
    sid_volume: u8,
    f_freq: u8,
    f_res: u8,
    chip_8580: bool,
    filters_enabled: bool,
    noise: NoiseGenerator,
    tri_table: Box<[u16; 0x2000]>,
    galway_tab: Box<[i16; 16 * 64]>,
    eg_table: [u32; 16],
    sid_cycles: u32,
    sample_rate: u32,

    voice_gain: [(i32, i32); 3],
    voice4_gain: (i32, i32),
}

/// Cyclic voice linkage used by ring modulation and oscillator sync:
/// voice `i`'s ring-mod/sync partner is voice `(i + 2) % 3`, and the
/// voice it can reset via sync is `(i + 1) % 3`.
fn mod_by(i: usize) -> usize {
    (i + 2) % 3
}

fn mod_to(i: usize) -> usize {
    (i + 1) % 3
}

impl SidChip {
    pub fn new(chip_8580: bool, sample_rate: u32, clock_hz: u32) -> Self {
        let sid_cycles = clock_hz / sample_rate.max(1);
        let mut chip = Self {
            voices: [Voice::new(), Voice::new(), Voice::new()],
            voice4: Voice4::new(),
            filter: Filter::new(sample_rate),
            regs: [0u8; 0x80],
            last_written_byte: 0,
            sid_volume: 0,
            f_freq: 0,
            f_res: 0,
            chip_8580,
            filters_enabled: true,
            noise: NoiseGenerator::new(),
            tri_table: tables::build_tri_table(),
            galway_tab: tables::build_galway_table(),
            eg_table: tables::build_eg_table(sid_cycles),
            sid_cycles,
            sample_rate,
            voice_gain: [(0, 0); 3],
            voice4_gain: (0, 0),
        };
        chip.set_mixer([VoiceMix::default(); 3], VoiceMix::default(), 0x100, 0, false);
        chip
    }

    pub fn is_8580(&self) -> bool {
        self.chip_8580
    }

    pub fn set_chip_model(&mut self, chip_8580: bool) {
        self.chip_8580 = chip_8580;
    }

    /// Enables or disables the shared IIR filter entirely (the
    /// `filters` preference key); voices routed through it are mixed
    /// in unfiltered instead.
    pub fn set_filters_enabled(&mut self, enabled: bool) {
        self.filters_enabled = enabled;
    }

    /// Called whenever the replay/sample rate changes: recomputes the
    /// envelope rate table and every voice's oscillator increment.
    pub fn set_sample_rate(&mut self, sample_rate: u32, clock_hz: u32) {
        self.sid_cycles = clock_hz / sample_rate.max(1);
        self.sample_rate = sample_rate;
        self.eg_table = tables::build_eg_table(self.sid_cycles);
        for v in 0..3 {
            let freq = self.voices[v].freq;
            self.voices[v].set_freq_lo((freq & 0xff) as u8, self.sid_cycles);
            self.voices[v].set_freq_hi((freq >> 8) as u8, self.sid_cycles);
        }
    }

    /// Recomputes every voice's stereo gain from mixer settings. Called
    /// at startup and whenever the user changes volume/pan preferences.
    /// `is_left_sid`/`is_right_sid` select the dual-SID stereo-separation
    /// offset (see §4.D); both false for a single-SID setup.
    pub fn set_mixer(
        &mut self,
        voices: [VoiceMix; 3],
        voice4: VoiceMix,
        master_volume: i32,
        dual_sep: i32,
        is_left_sid: bool,
    ) {
        let pan_offset = if is_left_sid {
            -dual_sep
        } else if dual_sep != 0 {
            dual_sep
        } else {
            0
        };
        for i in 0..3 {
            self.voice_gain[i] =
                filter::calc_gain_voice(voices[i].volume as u32, voices[i].pan + pan_offset, master_volume as u32);
        }
        self.voice4_gain =
            filter::calc_gain_voice(voice4.volume as u32, voice4.pan + pan_offset, master_volume as u32);
    }

    /// Reads a SID register ($00..$1f). The A/D converter registers and
    /// the voice-3 oscillator/envelope readback pull from the noise
    /// generator (there is no ADC or real voice-3 readback to sample
    /// here); every other address returns (and clears) the last byte
    /// written anywhere in the register file, the open-bus behavior
    /// real SIDs show for write-only registers.
    pub fn read(&mut self, adr: u8) -> u8 {
        let adr = adr & 0x1f;
        let value = match adr {
            0x19 | 0x1a => 0xff,
            0x1b | 0x1c => (self.noise.next() & 0xff) as u8,
            _ => self.last_written_byte,
        };
        self.last_written_byte = 0;
        value
    }

    /// Writes a SID register, including the register-$1D voice-4
    /// extension. `ram` is C64 memory, needed by voice 4's Galway-noise
    /// tone list and sample-replay data.
    pub fn write(&mut self, adr: u8, byte: u8, ram: &[u8]) {
        let adr = if (adr & 0x1f) < 0x1d { adr & 0x1f } else { adr } as usize;
        let adr = adr.min(0x7f);
        self.regs[adr] = byte;
        self.last_written_byte = byte;
        let v = adr / 7;

        match adr {
            0 | 7 | 14 => self.voices[v].set_freq_lo(byte, self.sid_cycles),
            1 | 8 | 15 => self.voices[v].set_freq_hi(byte, self.sid_cycles),
            2 | 9 | 16 => self.voices[v].set_pw_lo(byte),
            3 | 10 | 17 => self.voices[v].set_pw_hi(byte),
            4 | 11 | 18 => {
                let sync = self.voices[v].set_control(byte);
                self.voices[mod_by(v)].sync = sync;
            }
            5 | 12 | 19 => self.voices[v].set_attack_decay(byte, &self.eg_table),
            6 | 13 | 20 => self.voices[v].set_sustain_release(byte, &self.eg_table),
            22 => {
                if byte != self.f_freq {
                    self.f_freq = byte;
                    self.filter.set_cutoff(u16::from(byte), self.sample_rate);
                }
            }
            23 => {
                self.voices[0].filter = byte & 1 != 0;
                self.voices[1].filter = byte & 2 != 0;
                self.voices[2].filter = byte & 4 != 0;
                if (byte >> 4) != self.f_res {
                    self.f_res = byte >> 4;
                    self.filter.set_resonance(self.f_res, self.sample_rate);
                }
            }
            24 => {
                self.sid_volume = byte & 0x0f;
                self.voices[2].mute = byte & 0x80 != 0;
                let f_type = (byte >> 4) & 7;
                let mode = filter_mode_from_type(f_type);
                if mode != self.filter.mode {
                    self.filter.set_mode(mode, self.sample_rate);
                }
            }
            29 => self.voice4.write_1d(byte, &self.regs, ram, self.sid_cycles),
            _ => {}
        }
    }

    /// Advances every voice, voice 4, and the filter by one sample and
    /// returns the unclipped `(left, right)` mix for this chip. `ram` is
    /// C64 memory, needed by voice 4's sample-replay/Galway-noise data.
    pub fn tick(&mut self, ram: &[u8]) -> (i32, i32) {
        let mut sum_left = 0i32;
        let mut sum_right = 0i32;
        let mut filt_left = 0i32;
        let mut filt_right = 0i32;

        // Voices are ticked in order 0, 1, 2, each one's ring-modulation
        // partner (`mod_by`) read right when its waveform is computed —
        // not from a pre-sample snapshot. That makes voice 1's partner
        // (voice 0) see this sample's already-advanced count while voice
        // 0's partner (voice 2) still sees last sample's, exactly as the
        // original's single sequential pass over the voice array behaves.
        for i in 0..3 {
            let eg_level = self.voices[i].tick_envelope();
            let envelope = (eg_level * u32::from(self.sid_volume)) >> 20;

            let unmasked = self.voices[i].advance_phase();
            if self.voices[i].sync && unmasked >= 0x0100_0000 {
                self.voices[mod_to(i)].count = 0;
            }

            let mod_count = self.voices[mod_by(i)].count;
            let output = voice::waveform_output(
                &mut self.voices[i],
                mod_count,
                &mut self.noise,
                self.chip_8580,
                &self.tri_table,
            );
            let x = i32::from((output ^ 0x8000) as i16) * envelope as i32;
            let (lg, rg) = self.voice_gain[i];
            if self.voices[i].filter && self.filters_enabled {
                filt_left += (x * lg) >> 4;
                filt_right += (x * rg) >> 4;
            } else if !self.voices[i].mute {
                sum_left += (x * lg) >> 4;
                sum_right += (x * rg) >> 4;
            }
        }

        let v4_output = self.voice4.tick(ram, &self.galway_tab);
        sum_left += (v4_output * self.voice4_gain.0) >> 4;
        sum_right += (v4_output * self.voice4_gain.1) >> 4;

        let (fl, fr) = if self.filters_enabled {
            self.filter.apply(filt_left, filt_right)
        } else {
            (0, 0)
        };
        (sum_left + fl, sum_right + fr)
    }
}

fn filter_mode_from_type(f_type: u8) -> FilterMode {
    FilterMode::from_bits(f_type & 1 != 0, f_type & 2 != 0, f_type & 4 != 0)
}

/// Power-of-two ring buffer backing the reverb/spatial post-effects,
/// matching the original's fixed-size `work_buffer`.
const WORK_BUFFER_SIZE: usize = 0x10000;

/// Drives one or two [`SidChip`]s through the post-mix reverb/spatial
/// effect and final clipping. The CPU-interleaving "when to call play"
/// logic lives in `crate::player`; this only owns the per-sample audio
/// math.
pub struct SidEngine {
    pub chips: Vec<SidChip>,
    pub audio_effect: AudioEffect,
    pub reverb_feedback: i32,
    work_buffer: Box<[i32; WORK_BUFFER_SIZE]>,
    read_offset: usize,
    write_offset: usize,
}

impl SidEngine {
    pub fn new(chips: Vec<SidChip>) -> Self {
        Self {
            chips,
            audio_effect: AudioEffect::None,
            reverb_feedback: 0,
            work_buffer: vec![0i32; WORK_BUFFER_SIZE].into_boxed_slice().try_into().unwrap(),
            read_offset: 0,
            write_offset: 0,
        }
    }

    pub fn set_reverb_delay_samples(&mut self, delay: usize) {
        let delay = delay.max(2) & !1;
        self.read_offset = (self.write_offset + WORK_BUFFER_SIZE - delay) & (WORK_BUFFER_SIZE - 1);
    }

    /// Mixes all chips for one sample and returns the clipped,
    /// post-effect `(left, right)` pair ready for 16-bit output. `ram`
    /// is shared C64 memory (both chips' voice 4 extensions read the
    /// same address space the play routine laid tone lists/samples in).
    pub fn tick(&mut self, ram: &[u8]) -> (i16, i16) {
        let mut left = 0i32;
        let mut right = 0i32;
        for chip in &mut self.chips {
            let (l, r) = chip.tick(ram);
            left += l;
            right += r;
        }

        let (mut left, mut right) = match self.audio_effect {
            AudioEffect::None => (left >> 10, right >> 10),
            AudioEffect::Reverb => {
                let mut left = left >> 11;
                let mut right = right >> 11;
                left += (self.reverb_feedback * self.work_buffer[self.read_offset]) >> 8;
                self.work_buffer[self.write_offset] = left;
                right += (self.reverb_feedback * self.work_buffer[self.read_offset]) >> 8;
                self.advance_ring();
                (left, right)
            }
            AudioEffect::Spatial => {
                let mut left = left >> 11;
                let mut right = right >> 11;
                left += (self.reverb_feedback * self.work_buffer[self.read_offset]) >> 8;
                self.work_buffer[self.write_offset] = left;
                right -= (self.reverb_feedback * self.work_buffer[self.read_offset]) >> 8;
                self.advance_ring();
                (left, right)
            }
        };

        left = left.clamp(i32::from(i16::MIN), i32::from(i16::MAX));
        right = right.clamp(i32::from(i16::MIN), i32::from(i16::MAX));
        (left as i16, right as i16)
    }

    fn advance_ring(&mut self) {
        self.read_offset = (self.read_offset + 1) & (WORK_BUFFER_SIZE - 1);
        self.write_offset = (self.write_offset + 1) & (WORK_BUFFER_SIZE - 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_write_is_readable_until_overwritten_or_read() {
        let mut chip = SidChip::new(false, 44100, 985_248);
        let ram = [0u8; 0x10000];
        chip.write(0x00, 0x42, &ram);
        assert_eq!(chip.read(0x1e), 0x42);
        assert_eq!(chip.read(0x1e), 0);
    }

    #[test]
    fn freq_registers_combine_to_16_bits() {
        let mut chip = SidChip::new(false, 44100, 985_248);
        let ram = [0u8; 0x10000];
        chip.write(0, 0x34, &ram);
        chip.write(1, 0x12, &ram);
        assert_eq!(chip.voices[0].freq, 0x1234);
    }

    #[test]
    fn gate_on_then_silence_produces_no_nan_or_panic() {
        let mut chip = SidChip::new(false, 44100, 985_248);
        let ram = [0u8; 0x10000];
        chip.write(5, 0x11, &ram);
        chip.write(6, 0xf0, &ram);
        chip.write(24, 0x0f, &ram); // full chip volume
        chip.write(4, 0x11, &ram); // gate on, triangle
        for _ in 0..100 {
            let _ = chip.tick(&ram);
        }
        chip.write(4, 0x10, &ram); // gate off
        let mut saw_nonzero = false;
        for _ in 0..1000 {
            let (l, r) = chip.tick(&ram);
            if l != 0 || r != 0 {
                saw_nonzero = true;
            }
        }
        assert!(saw_nonzero);
    }

    #[test]
    fn sync_flag_is_stored_on_the_modulating_partner() {
        let mut chip = SidChip::new(false, 44100, 985_248);
        let ram = [0u8; 0x10000];
        // Voice 1's sync bit (bit 1) lands on voice1's mod_by = voice 0.
        chip.write(11, 0x02, &ram);
        assert!(chip.voices[mod_by(1)].sync);
    }

    #[test]
    fn engine_mixes_silence_to_zero() {
        let chip = SidChip::new(false, 44100, 985_248);
        let mut engine = SidEngine::new(vec![chip]);
        let ram = [0u8; 0x10000];
        let (l, r) = engine.tick(&ram);
        assert_eq!((l, r), (0, 0));
    }
}

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Mikael Lund

//! SIDPlayer - a Commodore 64 PSID music player in pure Rust.

#![deny(missing_docs)]

mod config;
mod cpu;
mod error;
mod hvsc;
mod memory;
mod player;
mod playlist;
mod psid;
mod sid;
mod tui;

use clap::Parser;
use config::{PrefValue, Prefs};
use player::create_shared_player;
use playlist::Playlist;
use psid::PsidFile;
use std::path::PathBuf;
use tinyaudio::prelude::*;

const SAMPLE_RATE: u32 = 44100;
const BUFFER_SIZE: usize = 1024;

/// Every `--<key> <value>` preference flag from the external interface,
/// applied in one pass after the player is created. Values are kept as
/// strings here and parsed against each key's real type so unknown or
/// malformed ones can be warned about and skipped, per the "continue on
/// bad preference" recovery policy.
#[derive(Parser)]
#[command(name = "sidplayer", version, about = "C64 SID music player in pure Rust")]
struct Args {
    /// SID file(s) to play or add to playlist
    #[arg(name = "FILE")]
    files: Vec<PathBuf>,

    /// Path to .m3u playlist file
    #[arg(short = 'l', long)]
    playlist: Option<PathBuf>,

    /// Song number to play (default: start song from file)
    #[arg(short, long)]
    song: Option<u16>,

    /// SID chip model: 6581 or 8580 (default: from file)
    #[arg(short, long)]
    chip: Option<u16>,

    /// Disable TUI and use simple text output
    #[arg(long)]
    no_tui: bool,

    /// HVSC mirror base URL
    #[arg(long, default_value = hvsc::DEFAULT_HVSC_URL)]
    hvsc_url: String,

    /// phi-2 clock: 6569 (PAL), 6567R5 (NTSC drive), or anything else (NTSC)
    #[arg(long)]
    victype: Option<String>,
    /// SID chip revision: 6581 or 8580
    #[arg(long)]
    sidtype: Option<String>,
    /// host output sample rate
    #[arg(long)]
    samplerate: Option<i32>,
    /// true for 16-bit output, false for 8-bit
    #[arg(long)]
    audio16bit: Option<String>,
    /// true for stereo output, false for mono
    #[arg(long)]
    stereo: Option<String>,
    /// true to enable the SID IIR filter
    #[arg(long)]
    filters: Option<String>,
    /// true to force a second SID chip
    #[arg(long)]
    dualsid: Option<String>,
    /// post-mix effect: 0 none, 1 reverb, 2 spatial
    #[arg(long)]
    audioeffect: Option<i32>,
    /// reverb delay in milliseconds
    #[arg(long)]
    revdelay: Option<i32>,
    /// reverb feedback scalar, 0..0x100
    #[arg(long)]
    revfeedback: Option<i32>,
    /// master volume
    #[arg(long)]
    volume: Option<i32>,
    /// voice 1 volume
    #[arg(long)]
    v1volume: Option<i32>,
    /// voice 2 volume
    #[arg(long)]
    v2volume: Option<i32>,
    /// voice 3 volume
    #[arg(long)]
    v3volume: Option<i32>,
    /// voice 4 (sample-replay extension) volume
    #[arg(long)]
    v4volume: Option<i32>,
    /// voice 1 stereo pan, -0x40..0x40
    #[arg(long)]
    v1pan: Option<i32>,
    /// voice 2 stereo pan, -0x40..0x40
    #[arg(long)]
    v2pan: Option<i32>,
    /// voice 3 stereo pan, -0x40..0x40
    #[arg(long)]
    v3pan: Option<i32>,
    /// voice 4 stereo pan, -0x40..0x40
    #[arg(long)]
    v4pan: Option<i32>,
    /// dual-SID pan offset
    #[arg(long)]
    dualsep: Option<i32>,
    /// replay speed, percent of normal
    #[arg(long)]
    speed: Option<i32>,
}

fn default_playlist_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sidplayer")
        .join("playlist.m3u")
}

/// Folds every `--<key>` CLI flag onto `prefs`, warning and skipping
/// any value that fails to parse against its documented type rather
/// than aborting the whole run.
fn apply_cli_prefs(args: &Args, prefs: &mut Prefs) {
    if let Some(v) = &args.victype {
        prefs.replace("victype", PrefValue::Str(v.clone()));
    }
    if let Some(v) = &args.sidtype {
        prefs.replace("sidtype", PrefValue::Str(v.clone()));
    }
    if let Some(v) = args.samplerate {
        prefs.replace("samplerate", PrefValue::Int(v));
    }
    for (name, value) in [
        ("audio16bit", &args.audio16bit),
        ("stereo", &args.stereo),
        ("filters", &args.filters),
        ("dualsid", &args.dualsid),
    ] {
        let Some(text) = value else { continue };
        match Prefs::parse_bool(text) {
            Some(b) => prefs.replace(name, PrefValue::Bool(b)),
            None => log::warn!("--{name}: {text:?} is not a valid boolean, ignoring"),
        }
    }
    for (name, value) in [
        ("audioeffect", args.audioeffect),
        ("revdelay", args.revdelay),
        ("revfeedback", args.revfeedback),
        ("volume", args.volume),
        ("v1volume", args.v1volume),
        ("v2volume", args.v2volume),
        ("v3volume", args.v3volume),
        ("v4volume", args.v4volume),
        ("v1pan", args.v1pan),
        ("v2pan", args.v2pan),
        ("v3pan", args.v3pan),
        ("v4pan", args.v4pan),
        ("dualsep", args.dualsep),
        ("speed", args.speed),
    ] {
        if let Some(v) = value {
            prefs.replace(name, PrefValue::Int(v));
        }
    }
}

/// Translates the `victype` preference string into a phi-2 clock rate.
fn clock_hz_for_victype(victype: &str) -> u32 {
    match victype {
        "6569" => 985_248,
        "6567R5" => 1_000_000,
        _ => 1_022_727,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut prefs = Prefs::load();
    config::register_defaults(&mut prefs);
    apply_cli_prefs(&args, &mut prefs);

    // Load existing playlist or create new one, then append CLI files as absolute paths
    let playlist_path = args.playlist.clone().unwrap_or_else(default_playlist_path);
    let mut playlist = Playlist::load_or_create(&playlist_path)?;
    let mut playlist_modified = false;
    for file in &args.files {
        let absolute = file.canonicalize().unwrap_or_else(|_| file.clone());
        playlist_modified |= playlist.add(&absolute.to_string_lossy(), None);
    }

    // Determine initial SID file to play
    let (sid_file, initial_song) = if !args.files.is_empty() {
        // Play first file from CLI
        let sid = PsidFile::load(&args.files[0])?;
        let song = args.song.unwrap_or(sid.start_song);
        (sid, song)
    } else if !playlist.is_empty() {
        // Play first from playlist
        let entry = &playlist.entries[0];
        let sid = entry.load()?;
        let song = args.song.or(entry.subsong).unwrap_or(sid.start_song);
        (sid, song)
    } else {
        // Empty playlist, no files - need a dummy SID for player init
        // TUI will start with HVSC browser focused
        let dummy = create_silent_sid();
        (dummy, 1)
    };

    if sid_file.requires_full_emulation() {
        return Err("Unsupported RSID-like format (requires CIA/interrupt emulation)".into());
    }

    let sample_rate = prefs.find_int("samplerate").filter(|&v| v > 0).map_or(SAMPLE_RATE, |v| v as u32);

    let player = create_shared_player(&sid_file, initial_song, sample_rate, args.chip)?;
    {
        let mut p = player.lock().map_err(|_| "player lock poisoned during setup")?;
        if let Some(victype) = prefs.find_str("victype") {
            p.set_clock_hz(clock_hz_for_victype(victype));
        }
        if let Some(percent) = prefs.find_int("speed") {
            p.set_speed_adjust(percent.max(1) as u32);
        }
        p.apply_mixer_prefs(&prefs);
        p.apply_effect_prefs(&prefs);
    }

    let params = OutputDeviceParameters {
        channels_count: 1,
        sample_rate: sample_rate as usize,
        channel_sample_count: BUFFER_SIZE,
    };

    // Audio callback runs in separate thread
    let _device = run_output_device(params, {
        let player = player.clone();
        move |data| {
            if let Ok(mut p) = player.lock()
                && let Err(e) = p.fill_buffer(data)
            {
                log::error!("playback error: {e}");
            }
        }
    })?;

    if args.no_tui {
        run_simple(&sid_file, initial_song)?;
        prefs.save();
    } else {
        let focus_hvsc = args.files.is_empty() && playlist.is_empty();
        let color_scheme = prefs.find_int("colorscheme").unwrap_or(config::DEFAULT_COLOR_SCHEME) as usize;
        let final_prefs = tui::run_tui(tui::TuiConfig {
            player,
            sid_file: &sid_file,
            song: initial_song,
            playlist,
            playlist_path,
            focus_hvsc,
            playlist_modified,
            hvsc_url: &args.hvsc_url,
            playtime_secs: 180,
            color_scheme,
            prefs,
        })?;
        final_prefs.save();
    }

    Ok(())
}

/// Creates a minimal silent SID for when no file is loaded.
fn create_silent_sid() -> PsidFile {
    PsidFile {
        magic: "PSID".to_string(),
        version: 2,
        data_offset: 0x7c,
        load_address: 0x1000,
        init_address: 0x1000,
        play_address: 0x1003,
        songs: 1,
        start_song: 1,
        speed: 0,
        name: String::new(),
        author: String::new(),
        released: String::new(),
        flags: 0,
        data: vec![0x60, 0x60, 0x60], // RTS instructions
        md5: String::new(),
        second_sid_address: None,
        third_sid_address: None,
    }
}

fn run_simple(sid_file: &PsidFile, song: u16) -> Result<(), Box<dyn std::error::Error>> {
    println!("Title:    {}", sid_file.name);
    println!("Author:   {}", sid_file.author);
    println!("Released: {}", sid_file.released);
    println!("Songs:    {}", sid_file.songs);
    println!("Playing song {} of {}", song, sid_file.songs);
    println!("Press Ctrl+C to stop");

    loop {
        std::thread::sleep(std::time::Duration::from_secs(1));
    }
}

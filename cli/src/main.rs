/// cli/src/main.rs
///
/// Headless frontend: loads a ROM, runs the machine for a number of
/// frames, and optionally writes the final framebuffer as a PNG. Useful
/// for smoke-testing ROMs and for capturing screenshots in CI.
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;

use anyhow::{Context, Result};
use clap::Parser;
use core_lib::ppu::{SCREEN_HEIGHT, SCREEN_WIDTH};
use core_lib::sink::{AudioChannel, FrameChannel};
use core_lib::GameBoy;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dmgboy", about = "Headless Game Boy emulator runner")]
struct Args {
    /// ROM image to load.
    rom: PathBuf,

    /// Number of frames to emulate.
    #[arg(long, default_value_t = 600)]
    frames: u32,

    /// Write the final framebuffer to this PNG file.
    #[arg(long)]
    screenshot: Option<PathBuf>,

    /// Host audio sample rate.
    #[arg(long, default_value_t = 44_100)]
    sample_rate: u32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let rom = fs::read(&args.rom)
        .with_context(|| format!("reading ROM {}", args.rom.display()))?;

    let mut system = GameBoy::with_sample_rate(args.sample_rate);
    system
        .load_rom(&rom)
        .context("loading ROM into the emulator")?;
    info!(
        title = system.mmu().cartridge().title(),
        kind = ?system.mmu().cartridge().kind(),
        battery = system.mmu().cartridge().has_battery(),
        "cartridge"
    );

    // Keep only the most recent frame; audio is drained and counted.
    let (frame_sink, frame_rx) = FrameChannel::pair(1);
    let (audio_sink, audio_rx) = AudioChannel::pair(8192);
    system.set_frame_sink(Box::new(frame_sink));
    system.set_audio_sink(Box::new(audio_sink));

    let mut last_frame = None;
    let mut samples: u64 = 0;
    for _ in 0..args.frames {
        system.step_frame();
        if let Some(frame) = frame_rx.try_iter().last() {
            last_frame = Some(frame);
        }
        samples += drain(&audio_rx);
    }
    info!(frames = args.frames, samples, "emulation finished");

    if let Some(path) = args.screenshot {
        let frame = last_frame.context("no frame was produced; is the LCD enabled?")?;
        write_png(&path, &frame)?;
        info!(path = %path.display(), "screenshot written");
    }
    Ok(())
}

fn drain(audio: &Receiver<(f32, f32)>) -> u64 {
    audio.try_iter().count() as u64
}

/// Converts the BGRA framebuffer to RGBA and saves it.
fn write_png(path: &Path, frame: &[u8]) -> Result<()> {
    let mut rgba = Vec::with_capacity(frame.len());
    for px in frame.chunks_exact(4) {
        rgba.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
    }
    let image = image::RgbaImage::from_raw(SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32, rgba)
        .context("framebuffer size mismatch")?;
    image.save(path).context("writing PNG")?;
    Ok(())
}

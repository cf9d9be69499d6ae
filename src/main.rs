use std::{env, error::Error, fs, path::PathBuf, time::Instant};

use atari800::atari::{Atari, MachineConfig};
use atari800::host::{DISPLAY_HEIGHT, DISPLAY_WIDTH, NullSink};
use atari800::palette::VideoSystem;

fn main() -> Result<(), Box<dyn Error>> {
    let mut args = env::args().skip(1);
    let mut os_path: Option<PathBuf> = None;
    let mut basic_path: Option<PathBuf> = None;
    let mut xex_path: Option<PathBuf> = None;
    let mut dump_path: Option<PathBuf> = None;
    let mut frame_limit: usize = 300;
    let mut video = VideoSystem::Pal;
    let mut pace = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--os" => {
                os_path = args.next().map(PathBuf::from);
                if os_path.is_none() {
                    eprintln!("--os requires a ROM path");
                    return Ok(());
                }
            }
            "--basic" => {
                basic_path = args.next().map(PathBuf::from);
                if basic_path.is_none() {
                    eprintln!("--basic requires a ROM path");
                    return Ok(());
                }
            }
            "--xex" => {
                xex_path = args.next().map(PathBuf::from);
                if xex_path.is_none() {
                    eprintln!("--xex requires a file path");
                    return Ok(());
                }
            }
            "--dump-frame" => {
                dump_path = args.next().map(PathBuf::from);
                if dump_path.is_none() {
                    eprintln!("--dump-frame requires an output path");
                    return Ok(());
                }
            }
            "--frames" => {
                let value = args.next().unwrap_or_default();
                match value.parse::<usize>() {
                    Ok(limit) => frame_limit = limit,
                    Err(_) => {
                        eprintln!("invalid --frames value: {value}");
                        return Ok(());
                    }
                }
            }
            "--ntsc" => video = VideoSystem::Ntsc,
            "--pace" => pace = true,
            other => {
                eprintln!("unknown argument: {other}");
                eprintln!(
                    "usage: atari800 --os <rom> [--basic <rom>] [--xex <file>] \
                     [--frames N] [--dump-frame out.ppm] [--ntsc] [--pace]"
                );
                return Ok(());
            }
        }
    }

    let Some(os_path) = os_path else {
        eprintln!("an OS ROM is required (--os <rom>)");
        return Ok(());
    };

    let os_rom = fs::read(&os_path)?;
    let basic_rom = match &basic_path {
        Some(path) => fs::read(path)?,
        // Without a BASIC image, an 8 KiB open-bus stand-in keeps the slot
        // populated; the OS can still be banked in and out.
        None => vec![0xFF; 8 * 1024],
    };

    let mut machine = Atari::new(MachineConfig {
        os_rom,
        basic_rom,
        video,
    })?;

    if let Some(path) = &xex_path {
        let image = fs::read(path)?;
        machine.load_xex(&image)?;
        println!("loaded {} (PC=${:04X})", path.display(), machine.cpu.pc);
    }

    let mut display = NullSink;
    let mut audio = NullSink;
    let frame_duration = video.frame_duration();
    let started = Instant::now();
    let mut next_deadline = started + frame_duration;

    for _ in 0..frame_limit {
        machine.run_frame()?;
        machine.present(&mut display, &mut audio);
        if pace {
            let now = Instant::now();
            if next_deadline > now {
                std::thread::sleep(next_deadline - now);
            }
            next_deadline += frame_duration;
        }
    }

    let elapsed = started.elapsed();
    let frames = machine.frame_count();
    println!(
        "{frames} frames in {:.2}s ({:.1} fps, {} CPU cycles)",
        elapsed.as_secs_f64(),
        frames as f64 / elapsed.as_secs_f64().max(f64::EPSILON),
        machine.cycles()
    );

    if let Some(path) = dump_path {
        write_ppm(&machine, &path)?;
        println!("frame written to {}", path.display());
    }

    Ok(())
}

/// Dump the last frame as a binary PPM through the machine palette.
fn write_ppm(machine: &Atari, path: &PathBuf) -> Result<(), Box<dyn Error>> {
    let palette = machine.palette();
    let mut out = format!("P6\n{DISPLAY_WIDTH} {DISPLAY_HEIGHT}\n255\n").into_bytes();
    for &index in machine.framebuffer() {
        let rgb565 = palette.rgb565(index);
        let r = ((rgb565 >> 11) & 0x1F) as u8;
        let g = ((rgb565 >> 5) & 0x3F) as u8;
        let b = (rgb565 & 0x1F) as u8;
        out.push((r << 3) | (r >> 2));
        out.push((g << 2) | (g >> 4));
        out.push((b << 3) | (b >> 2));
    }
    fs::write(path, out)?;
    Ok(())
}

//! mixbuf CLI: convert, resample, remix and mix WAV files.
//!
//! Usage:
//!   mixbuf-cli input.wav
//!   mixbuf-cli input.wav --out output.wav [--rate 48000] [--channels 2] [--bits 16]
//!   mixbuf-cli input.wav --mix other.wav --volume 200 --out output.wav

use mx_master::{clip_to_wav, read_wav, Mixdown, PcmClip};
use mx_pcm::{PcmProps, Volume};
use std::{env, fs};
use tracing::info;

const USAGE: &str = "Usage: mixbuf-cli <input.wav> [--out output.wav] [--rate HZ] [--channels N] \
[--bits 8|16|32] [--volume 0-255] [--mute] [--mix other.wav]... [--buffer-ms MS]";

struct Options {
    input: String,
    out: Option<String>,
    rate: Option<u32>,
    channels: Option<usize>,
    bits: Option<u8>,
    volume: Volume,
    mix: Vec<String>,
    buffer_ms: u32,
}

fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let opts = parse_args(&args).unwrap_or_else(|e| {
        eprintln!("{e}");
        eprintln!("{USAGE}");
        std::process::exit(1);
    });

    let input = load(&opts.input);
    println!("Input:    {} ({} frames, {} ms)", input.props, input.frames(), input.duration_ms());

    let Some(out_path) = opts.out.as_deref() else {
        return;
    };

    let out_props = output_props(&input.props, &opts).unwrap_or_else(|e| {
        eprintln!("Invalid output format: {e}");
        std::process::exit(1);
    });
    println!("Output:   {out_props}");

    let clip = render(input, &out_props, &opts).unwrap_or_else(|e| {
        eprintln!("Mixdown failed: {e}");
        std::process::exit(1);
    });

    let wav = clip_to_wav(&clip).unwrap_or_else(|e| {
        eprintln!("Failed to encode {out_path}: {e}");
        std::process::exit(1);
    });
    fs::write(out_path, &wav).unwrap_or_else(|e| {
        eprintln!("Failed to write {out_path}: {e}");
        std::process::exit(1);
    });
    info!(path = out_path, bytes = wav.len(), "wrote output");
    println!("Wrote {} frames to {}", clip.frames(), out_path);
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut opts = Options {
        input: String::new(),
        out: None,
        rate: None,
        channels: None,
        bits: None,
        volume: Volume::MAX,
        mix: Vec::new(),
        buffer_ms: mx_master::DEFAULT_BUFFER_MS,
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value = |name: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{name} needs a value"))
        };
        match arg.as_str() {
            "--out" => opts.out = Some(value("--out")?),
            "--rate" => opts.rate = Some(parse_num(&value("--rate")?)?),
            "--channels" => opts.channels = Some(parse_num(&value("--channels")?)?),
            "--bits" => opts.bits = Some(parse_num(&value("--bits")?)?),
            "--volume" => {
                let muted = opts.volume.muted;
                opts.volume = Volume::uniform(parse_num(&value("--volume")?)?);
                opts.volume.muted = muted;
            }
            "--mute" => opts.volume.muted = true,
            "--mix" => opts.mix.push(value("--mix")?),
            "--buffer-ms" => opts.buffer_ms = parse_num(&value("--buffer-ms")?)?,
            flag if flag.starts_with("--") => return Err(format!("unknown option {flag}")),
            path if opts.input.is_empty() => opts.input = path.to_string(),
            extra => return Err(format!("unexpected argument {extra}")),
        }
    }

    if opts.input.is_empty() {
        return Err("no input file given".to_string());
    }
    Ok(opts)
}

fn parse_num<T: std::str::FromStr>(s: &str) -> Result<T, String> {
    s.parse().map_err(|_| format!("invalid number: {s}"))
}

/// Output format: the input's unless overridden. WAV stores 8-bit unsigned.
fn output_props(input: &PcmProps, opts: &Options) -> Result<PcmProps, mx_pcm::PcmError> {
    let bytes = opts.bits.map_or(input.sample_bytes() as u8, |b| b / 8);
    let channels = opts.channels.unwrap_or(input.channels());
    let rate = opts.rate.unwrap_or(input.rate());
    let props = PcmProps::new(bytes, bytes != 1, channels, rate)?;
    if channels == input.channels() {
        props.with_channel_ids(input.channel_ids())
    } else {
        Ok(props)
    }
}

fn render(input: PcmClip, out: &PcmProps, opts: &Options) -> Result<PcmClip, mx_master::MasterError> {
    let mut mixdown = Mixdown::new(out, opts.buffer_ms)?;
    mixdown.add_source(input, &Volume::MAX)?;
    for path in &opts.mix {
        let clip = load(path);
        println!("Mixing:   {} ({})", path, clip.props);
        mixdown.add_source(clip, &Volume::MAX)?;
    }
    mixdown.set_volume(&opts.volume);
    mixdown.render()
}

fn load(path: &str) -> PcmClip {
    let data = fs::read(path).unwrap_or_else(|e| {
        eprintln!("Failed to read {path}: {e}");
        std::process::exit(1);
    });
    read_wav(&data).unwrap_or_else(|e| {
        eprintln!("Failed to parse {path}: {e}");
        std::process::exit(1);
    })
}

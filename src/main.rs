//! stimuli CLI: list output devices, play or export a stimulus.
//!
//! Usage:
//!   stimuli devices
//!   stimuli tone 1000 --volume 20 --duration 0.5 --when 0.2
//!   stimuli noise pink --channels 2 --save noise.wav --no-play
//!   stimuli file beep.wav --tmin 0.1 --tmax 0.4

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use st_master::{
    AmMethod, AudioHost, BlockSize, CpalHost, NoiseColor, Sound, SoundBuilder, SoundError, Volume,
    Window,
};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stimuli")]
#[command(about = "Precisely timed auditory stimuli")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the audio devices of the default host
    Devices,

    /// Pure tone
    Tone {
        /// Frequency in Hz
        #[arg(default_value_t = st_master::DEFAULT_FREQUENCY)]
        frequency: f64,

        #[command(flatten)]
        signal: SignalArgs,

        #[command(flatten)]
        play: PlayArgs,
    },

    /// Amplitude modulated tone
    Am {
        /// Carrier frequency in Hz
        #[arg(long, default_value_t = st_master::DEFAULT_CARRIER)]
        carrier: f64,

        /// Modulation frequency in Hz
        #[arg(long, default_value_t = st_master::DEFAULT_MODULATION)]
        modulation: f64,

        /// Modulation method (conventional or dsbsc)
        #[arg(long, default_value = "conventional", value_parser = parse_method)]
        method: AmMethod,

        #[command(flatten)]
        signal: SignalArgs,

        #[command(flatten)]
        play: PlayArgs,
    },

    /// Colored noise
    Noise {
        /// Color (white, pink, blue, brown or violet)
        #[arg(default_value = "white", value_parser = parse_color)]
        color: NoiseColor,

        /// Random seed (default: from the system time)
        #[arg(long)]
        seed: Option<u64>,

        #[command(flatten)]
        signal: SignalArgs,

        #[command(flatten)]
        play: PlayArgs,
    },

    /// Sound read from a WAV file
    File {
        /// Input WAV file
        path: PathBuf,

        /// Start of the played interval in seconds
        #[arg(long)]
        tmin: Option<f64>,

        /// End of the played interval in seconds
        #[arg(long)]
        tmax: Option<f64>,

        /// Volume in percent, one value or one per channel (default: from the file)
        #[arg(long, num_args = 1..)]
        volume: Vec<f32>,

        /// Amplitude window (rectangular, hann, tukey:ALPHA or ramp:FRACTION)
        #[arg(long, default_value = "rectangular", value_parser = parse_window)]
        window: Window,

        #[command(flatten)]
        play: PlayArgs,
    },
}

/// Parameters of synthesized stimuli.
#[derive(Args)]
struct SignalArgs {
    /// Volume in percent, one value or one per channel
    #[arg(long, num_args = 1.., default_values_t = [st_master::DEFAULT_VOLUME])]
    volume: Vec<f32>,

    /// Duration in seconds
    #[arg(short, long, default_value_t = st_master::DEFAULT_DURATION)]
    duration: f64,

    /// Number of output channels
    #[arg(short, long, default_value_t = st_master::DEFAULT_CHANNELS)]
    channels: u16,

    /// Sample rate in Hz (default: the device's)
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Amplitude window (rectangular, hann, tukey:ALPHA or ramp:FRACTION)
    #[arg(long, default_value = "rectangular", value_parser = parse_window)]
    window: Window,
}

/// Output and scheduling options.
#[derive(Args)]
struct PlayArgs {
    /// Output device index (default: the host's default output)
    #[arg(long)]
    device: Option<usize>,

    /// Frames per callback, 0 for the host's choice
    #[arg(long, default_value_t = 0)]
    block_size: i64,

    /// Delay before the onset in seconds
    #[arg(long, default_value_t = 0.0)]
    when: f64,

    /// Write the signal to a WAV file
    #[arg(long)]
    save: Option<PathBuf>,

    /// Replace an existing file given to --save
    #[arg(long)]
    overwrite: bool,

    /// Do not play the sound
    #[arg(long)]
    no_play: bool,
}

fn parse_method(s: &str) -> Result<AmMethod, String> {
    s.parse()
        .map_err(|_| format!("unknown modulation method '{}'", s))
}

fn parse_color(s: &str) -> Result<NoiseColor, String> {
    s.parse().map_err(|_| {
        let names: Vec<_> = NoiseColor::ALL.iter().map(|c| c.name()).collect();
        format!("unknown color '{}', expected one of {}", s, names.join(", "))
    })
}

fn parse_window(s: &str) -> Result<Window, String> {
    let (name, arg) = match s.split_once(':') {
        Some((name, arg)) => (name, Some(arg)),
        None => (s, None),
    };
    let value = |default: f64| -> Result<f64, String> {
        arg.map_or(Ok(default), |a| a.parse().map_err(|e| format!("{}", e)))
    };
    match name {
        "rectangular" | "rect" => Ok(Window::Rectangular),
        "hann" => Ok(Window::Hann),
        "tukey" => Ok(Window::Tukey { alpha: value(0.5)? }),
        "ramp" => Ok(Window::LinearRamp { ramp: value(0.05)? }),
        _ => Err(format!("unknown window '{}'", s)),
    }
}

fn volume(values: &[f32]) -> Option<Volume> {
    match values {
        [] => None,
        [v] => Some(Volume::uniform(*v)),
        vs => Some(Volume::per_channel(vs.to_vec())),
    }
}

fn synth(builder: SoundBuilder, signal: SignalArgs) -> SoundBuilder {
    let mut builder = builder
        .duration(signal.duration)
        .channels(signal.channels)
        .window(signal.window);
    if let Some(v) = volume(&signal.volume) {
        builder = builder.volume(v);
    }
    if let Some(rate) = signal.sample_rate {
        builder = builder.sample_rate(rate);
    }
    builder
}

fn output(builder: SoundBuilder, play: &PlayArgs) -> Result<SoundBuilder, SoundError> {
    let builder = builder.block_size(BlockSize::try_from(play.block_size)?);
    Ok(match play.device {
        Some(index) => builder.device(index),
        None => builder,
    })
}

fn run_sound(mut sound: Sound, play: &PlayArgs) -> Result<(), SoundError> {
    log::info!("{}", sound);
    if let Some(path) = &play.save {
        sound.save(path, play.overwrite)?;
        log::info!("saved to {}", path.display());
    }
    if !play.no_play {
        log::info!(
            "playing on device {} in {:.3} s",
            sound.device().index(),
            play.when
        );
        sound.play(Some(play.when), true)?;
        for fault in sound.take_faults() {
            log::warn!("callback fault: {}", fault);
        }
    }
    sound.close();
    Ok(())
}

fn run(command: Commands) -> Result<(), SoundError> {
    match command {
        Commands::Devices => {
            let host = CpalHost::new();
            println!("Host: {}", host.name());
            print!("{}", host.devices()?);
            Ok(())
        }

        Commands::Tone {
            frequency,
            signal,
            play,
        } => {
            let builder = output(synth(SoundBuilder::tone(frequency), signal), &play)?;
            run_sound(builder.build()?, &play)
        }

        Commands::Am {
            carrier,
            modulation,
            method,
            signal,
            play,
        } => {
            let kind = st_master::SoundKind::am(carrier, modulation, method);
            let builder = output(synth(SoundBuilder::new(kind), signal), &play)?;
            run_sound(builder.build()?, &play)
        }

        Commands::Noise {
            color,
            seed,
            signal,
            play,
        } => {
            let mut builder = SoundBuilder::noise(color);
            if let Some(seed) = seed {
                builder = builder.seed(seed);
            }
            let builder = output(synth(builder, signal), &play)?;
            run_sound(builder.build()?, &play)
        }

        Commands::File {
            path,
            tmin,
            tmax,
            volume: values,
            window,
            play,
        } => {
            let mut builder = output(SoundBuilder::load(path).window(window), &play)?;
            if let Some(v) = volume(&values) {
                builder = builder.volume(v);
            }
            let mut sound = builder.build()?;
            if tmin.is_some() || tmax.is_some() {
                sound.crop(tmin, tmax)?;
            }
            run_sound(sound, &play)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

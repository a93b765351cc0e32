use std::ffi::OsString;
use std::path::PathBuf;

use pico_args::Arguments;
use thiserror::Error;

use crate::tracer::Settings;

pub const HELP: &str = "\
beacon: progressive sphere path tracer

USAGE:
  beacon [OPTIONS]

OPTIONS:
  --width <N>        viewport width in pixels [default: 640]
  --height <N>       viewport height in pixels [default: 360]
  --frames <N>       frames to accumulate [default: 16]
  --bounces <N>      bounces per path, 1 to 10 [default: 5]
  --spheres <N>      random spheres in the showcase scene [default: 25]
  --seed <N>         seed for the scene and the samplers [default: 0]
  --no-accumulate    render every frame from scratch
  --slow-random      use the higher quality random generator
  --output <PATH>    PNG file to write [default: render.png]
  -h, --help         print this message
";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Args(#[from] pico_args::Error),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("--bounces must be between {min} and {max}, got {value}")]
    Bounces { value: i64, min: u32, max: u32 },
    #[error("unexpected arguments: {0:?}")]
    Unexpected(Vec<OsString>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub width: u32,
    pub height: u32,
    pub frames: u32,
    pub spheres: usize,
    pub output: PathBuf,
    pub settings: Settings,
    pub help: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            frames: 16,
            spheres: 25,
            output: PathBuf::from("render.png"),
            settings: Settings::default(),
            help: false,
        }
    }
}

impl Options {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::parse(Arguments::from_env())
    }

    pub fn from_vec(args: Vec<OsString>) -> Result<Self, ConfigError> {
        Self::parse(Arguments::from_vec(args))
    }

    fn parse(mut args: Arguments) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        if args.contains(["-h", "--help"]) {
            return Ok(Self {
                help: true,
                ..defaults
            });
        }

        let width = args.opt_value_from_str("--width")?.unwrap_or(defaults.width);
        let height = args.opt_value_from_str("--height")?.unwrap_or(defaults.height);
        let frames = args.opt_value_from_str("--frames")?.unwrap_or(defaults.frames);
        let spheres = args.opt_value_from_str("--spheres")?.unwrap_or(defaults.spheres);
        let bounces: i64 = args
            .opt_value_from_str("--bounces")?
            .unwrap_or(defaults.settings.bounces as i64);
        let seed = args.opt_value_from_str("--seed")?.unwrap_or(defaults.settings.seed);
        let output = args.opt_value_from_str("--output")?.unwrap_or(defaults.output);
        let accumulate = !args.contains("--no-accumulate");
        let slow_random = args.contains("--slow-random");

        let remaining = args.finish();
        if !remaining.is_empty() {
            return Err(ConfigError::Unexpected(remaining));
        }

        for (name, value) in [("--width", width), ("--height", height), ("--frames", frames)] {
            if value == 0 {
                return Err(ConfigError::Zero(name));
            }
        }

        let (min, max) = (Settings::MIN_BOUNCES, Settings::MAX_BOUNCES);
        if bounces < min as i64 || bounces > max as i64 {
            return Err(ConfigError::Bounces {
                value: bounces,
                min,
                max,
            });
        }

        Ok(Self {
            width,
            height,
            frames,
            spheres,
            output,
            settings: Settings {
                accumulate,
                bounces: bounces as u32,
                slow_random,
                seed,
                ..defaults.settings
            },
            help: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Options, ConfigError> {
        Options::from_vec(args.iter().map(OsString::from).collect())
    }

    #[test]
    fn defaults_without_arguments() {
        let options = parse(&[]).expect("defaults parse");
        assert_eq!(options, Options::default());
        assert!(options.settings.accumulate);
        assert!(!options.settings.slow_random);
    }

    #[test]
    fn all_flags() {
        let options = parse(&[
            "--width", "32", "--height", "16", "--frames", "3", "--bounces", "10", "--spheres",
            "4", "--seed", "77", "--no-accumulate", "--slow-random", "--output", "out/frame.png",
        ])
        .expect("valid arguments");

        assert_eq!((options.width, options.height, options.frames), (32, 16, 3));
        assert_eq!(options.spheres, 4);
        assert_eq!(options.output, PathBuf::from("out/frame.png"));
        assert_eq!(options.settings.bounces, 10);
        assert_eq!(options.settings.seed, 77);
        assert!(!options.settings.accumulate);
        assert!(options.settings.slow_random);
    }

    #[test]
    fn help_short_circuits() {
        assert!(parse(&["--help"]).expect("help").help);
        assert!(parse(&["-h", "--width", "nope"]).expect("help").help);
    }

    #[test]
    fn bounces_outside_range_are_rejected() {
        for bad in ["0", "11", "250"] {
            assert!(matches!(
                parse(&["--bounces", bad]),
                Err(ConfigError::Bounces { .. })
            ));
        }
    }

    #[test]
    fn zero_sizes_are_rejected() {
        assert!(matches!(parse(&["--width", "0"]), Err(ConfigError::Zero("--width"))));
        assert!(matches!(parse(&["--frames", "0"]), Err(ConfigError::Zero("--frames"))));
    }

    #[test]
    fn malformed_and_unknown_arguments() {
        assert!(matches!(parse(&["--width", "wide"]), Err(ConfigError::Args(_))));
        assert!(matches!(parse(&["--fast"]), Err(ConfigError::Unexpected(_))));

        let message = parse(&["--bounces", "12"]).map(|_| ()).unwrap_err().to_string();
        assert_eq!(message, "--bounces must be between 1 and 10, got 12");
    }
}

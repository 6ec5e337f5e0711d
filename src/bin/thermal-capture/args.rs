use std::{ffi::OsString, path::PathBuf};

use anyhow::Result;
use clap::value_t;
use thermal_capture::{arg, args_parser, opt};

#[derive(Debug)]
pub struct Args {
    pub rawcam: bool,
    pub device: Option<String>,
    pub offset: Option<f64>,
    pub stabilization: usize,
    pub output_folder: PathBuf,
    pub high_range: bool,
    pub file: Option<PathBuf>,
}

impl Args {
    pub fn from_cmd_line() -> Result<Args> {
        Ok(Args::from_iter(std::env::args_os()).unwrap_or_else(|e| e.exit()))
    }

    pub fn from_iter<I, T>(args: I) -> clap::Result<Args>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = args_parser!("thermal-capture")
            .about("Capture a single calibrated thermal frame.")
            .arg(
                opt!("rawcam")
                    .short("r")
                    .takes_value(false)
                    .help("Camera streams thermal data only (default: visual image stacked over thermal)"),
            )
            .arg(
                opt!("device")
                    .short("d")
                    .help("Video device (default: /dev/video0)"),
            )
            .arg(
                opt!("offset")
                    .short("o")
                    .allow_hyphen_values(true)
                    .help("Fixed temperature offset in celsius added to the calibration"),
            )
            .arg(
                opt!("stabilization")
                    .short("s")
                    .default_value("10")
                    .help("Frames to discard before capturing"),
            )
            .arg(
                opt!("output folder")
                    .short("f")
                    .default_value(".")
                    .help("Folder for the output files, created if missing"),
            )
            .arg(
                opt!("high range")
                    .takes_value(false)
                    .help("Switch the camera to its high temperature range, if supported"),
            )
            .arg(arg!("file").help("Replay a recorded .npy file instead of a live camera"))
            .get_matches_from_safe(args)?;

        let offset = matches
            .value_of("offset")
            .map(|_| value_t!(matches, "offset", f64))
            .transpose()?;

        Ok(Args {
            rawcam: matches.is_present("rawcam"),
            device: matches.value_of("device").map(String::from),
            offset,
            stabilization: value_t!(matches, "stabilization", usize)?,
            output_folder: value_t!(matches, "output folder", PathBuf)?,
            high_range: matches.is_present("high range"),
            file: matches.value_of("file").map(PathBuf::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() -> clap::Result<()> {
        let args = Args::from_iter(vec!["thermal-capture"])?;
        assert_eq!(args.stabilization, 10);
        assert_eq!(args.output_folder, PathBuf::from("."));
        assert_eq!(args.offset, None);
        assert!(!args.rawcam && !args.high_range);
        assert!(args.file.is_none());
        Ok(())
    }

    #[test]
    fn negative_offset_and_replay_file() -> clap::Result<()> {
        let args = Args::from_iter(vec![
            "thermal-capture",
            "-o",
            "-2.5",
            "-s",
            "0",
            "--high-range",
            "rec.npy",
        ])?;
        assert_eq!(args.offset, Some(-2.5));
        assert_eq!(args.stabilization, 0);
        assert!(args.high_range);
        assert_eq!(args.file, Some(PathBuf::from("rec.npy")));
        Ok(())
    }

    #[test]
    fn unknown_flag_is_not_a_file() {
        let err = Args::from_iter(vec!["thermal-capture", "-x"]).unwrap_err();
        assert_eq!(err.kind, clap::ErrorKind::UnknownArgument);
    }
}

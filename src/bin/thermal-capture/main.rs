mod args;

use anyhow::Result;
use log::{error, info};
use thermal_capture::{
    camera::CameraConfig,
    cli::{init_logging, prepare_output_dir},
    stabilize,
    CaptureOutcome, CapturePipeline, PipelineConfig,
};

use crate::args::Args;

fn main() -> Result<()> {
    init_logging();
    let args = Args::from_cmd_line()?;
    prepare_output_dir(&args.output_folder)?;

    let camera = CameraConfig {
        raw: args.rawcam,
        device: args.device.clone(),
        fixed_offset: args.offset,
        replay: args.file.clone(),
    };
    let config = PipelineConfig {
        stabilization_frames: args.stabilization,
        stabilization_pause: stabilize::DEFAULT_PAUSE,
        output_dir: args.output_folder.clone(),
        high_range: args.high_range,
        progress: true,
        label: None,
    };

    let mut pipeline = CapturePipeline::open(&camera, config)?;
    match pipeline.run()? {
        CaptureOutcome::Captured(report) => {
            info!(
                "Captured {}x{} frame as thermal_{}",
                report.width, report.height, report.label
            );
            info!("Done!");
            Ok(())
        }
        CaptureOutcome::ReadFailed { .. } => {
            error!("No files written");
            std::process::exit(1);
        }
    }
}

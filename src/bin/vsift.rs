use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use log::{info, warn};
use time::macros::format_description;
use video_sift::app::{Controller, KeyEvent, StepOutput};
use video_sift::config::TrackerConfig;
use video_sift::io::{object_from_json, object_to_json};
use video_sift::render::RenderMode;
use video_sift::source::{FrameSource, ImageSequenceSource};
use video_sift::visualization::log_frame_outcome;

#[derive(Parser)]
#[command(version, about, author)]
struct VsiftCli {
    /// folder of frames to play as the live video
    frames: Option<PathBuf>,

    /// capture from this camera device instead of a frame folder
    #[cfg(feature = "camera")]
    #[arg(long)]
    camera: Option<i32>,

    /// tracker config json, defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// write the default config to this path and exit
    #[arg(long)]
    dump_config: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value = "outline")]
    render_mode: RenderMode,

    /// save the recording to this .rrd file instead of spawning a viewer
    #[arg(short, long)]
    save: Option<PathBuf>,

    /// load template features at start, as if `c` was pressed
    #[arg(long)]
    autoload: bool,

    /// replay the frame folder forever
    #[arg(long)]
    loop_frames: bool,

    #[arg(long, default_value = "15")]
    fps: u32,
}

fn default_recording_name() -> String {
    let now = time::OffsetDateTime::now_local().unwrap_or_else(|_| time::OffsetDateTime::now_utc());
    let fmt = format_description!("[year][month][day]_[hour][minute][second]");
    now.format(fmt)
        .map(|s| format!("vsift_{}.rrd", s))
        .unwrap_or_else(|_| "vsift.rrd".to_string())
}

/// Single key presses from the native windows.
#[cfg(feature = "camera")]
struct KeyInput {
    windows: video_sift::camera::NativeWindows,
}

#[cfg(feature = "camera")]
impl KeyInput {
    fn open() -> video_sift::Result<KeyInput> {
        info!("press c to load the features, space to pause, q to quit");
        Ok(KeyInput {
            windows: video_sift::camera::NativeWindows::open()?,
        })
    }

    fn show(&self, output: &StepOutput) -> video_sift::Result<()> {
        self.windows.show(output)
    }

    fn poll(&self) -> video_sift::Result<Vec<KeyEvent>> {
        Ok(self.windows.poll_key()?.into_iter().collect())
    }
}

/// Without native windows keys arrive as terminal lines.
#[cfg(not(feature = "camera"))]
struct KeyInput {
    keys: std::sync::mpsc::Receiver<KeyEvent>,
}

#[cfg(not(feature = "camera"))]
impl KeyInput {
    fn open() -> video_sift::Result<KeyInput> {
        use std::io::BufRead;

        info!("type c to load the features, <enter> to pause, q to quit, each followed by <enter>");
        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                match KeyEvent::from_input(&line) {
                    Some(key) => {
                        if tx.send(key).is_err() {
                            break;
                        }
                    }
                    None => warn!("unknown key {:?}", line),
                }
            }
        });
        Ok(KeyInput { keys: rx })
    }

    fn show(&self, _output: &StepOutput) -> video_sift::Result<()> {
        Ok(())
    }

    fn poll(&self) -> video_sift::Result<Vec<KeyEvent>> {
        Ok(self.keys.try_iter().collect())
    }
}

fn open_source(
    cli: &VsiftCli,
    config: &TrackerConfig,
) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    #[cfg(feature = "camera")]
    if let Some(index) = cli.camera {
        return Ok(Box::new(video_sift::camera::CameraSource::open(
            index,
            config.camera_width,
            config.camera_height,
        )?));
    }
    let Some(frames) = &cli.frames else {
        return Err("no frame folder given (or --camera with the camera feature)".into());
    };
    Ok(Box::new(ImageSequenceSource::open(
        frames,
        config.camera_width,
        config.camera_height,
        cli.loop_frames,
    )?))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = VsiftCli::parse();

    if let Some(path) = &cli.dump_config {
        object_to_json(path, &TrackerConfig::default())?;
        info!("default config written to {}", path.display());
        return Ok(());
    }

    let config: TrackerConfig = match &cli.config {
        Some(path) => object_from_json(path)?,
        None => TrackerConfig::default(),
    };
    let source = open_source(&cli, &config)?;
    let mut controller = Controller::from_config(config, source, cli.render_mode)?;

    let recording = match &cli.save {
        Some(path) => rerun::RecordingStreamBuilder::new("video_sift").save(path)?,
        None => match rerun::RecordingStreamBuilder::new("video_sift").spawn() {
            Ok(r) => r,
            Err(e) => {
                let path = default_recording_name();
                warn!("can't spawn viewer ({}), saving to {}", e, path);
                rerun::RecordingStreamBuilder::new("video_sift").save(path)?
            }
        },
    };

    let keys = KeyInput::open()?;
    if cli.autoload {
        controller.handle_key(KeyEvent::LoadFeatures);
        controller.wait_for_reload();
    }

    let frame_period = Duration::from_secs_f64(1.0 / cli.fps.max(1) as f64);
    let mut frame_idx: i64 = 0;
    'frames: loop {
        let tick = Instant::now();
        for key in keys.poll()? {
            if !controller.handle_key(key) {
                break 'frames;
            }
        }
        let Some(output) = controller.step() else {
            info!("end of frames");
            break;
        };
        keys.show(&output)?;
        if !output.paused {
            log_frame_outcome(
                &recording,
                frame_idx,
                &output.display,
                output.matches_view.as_ref(),
                output.outcome.as_ref(),
            )?;
            frame_idx += 1;
        }
        if let Some(rest) = frame_period.checked_sub(tick.elapsed()) {
            std::thread::sleep(rest);
        }
    }
    controller.wait_for_reload();
    Ok(())
}

use std::process::{Command, Stdio};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::config::SpeechConfig;
use crate::error::{Result, TrackerError};

/// Spoken phrase for a template label.
pub fn phrase_for(label: &str) -> Option<&'static str> {
    match label {
        "100" => Some("one hundred"),
        "200" => Some("two hundred"),
        "500" => Some("five hundred"),
        "1000" => Some("one thousand"),
        "2000" => Some("two thousand"),
        "5000" => Some("five thousand"),
        _ => None,
    }
}

/// Reacts to an accepted identity. Must never block the frame loop.
pub trait Notifier: Send {
    fn notify(&self, identity: &str);
}

/// Only logs the identity.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, identity: &str) {
        match phrase_for(identity) {
            Some(_) => info!("it's {}", identity),
            None => info!("none"),
        }
    }
}

/// Speaks through an external text to speech program, e.g. `espeak`.
///
/// The program runs in the background without blocking the caller. The same identity is not
/// repeated within `repeat_interval`.
#[derive(Debug)]
pub struct CommandNotifier {
    program: String,
    args: Vec<String>,
    repeat_interval: Duration,
    last_spoken: Mutex<Option<(String, Instant)>>,
}

impl CommandNotifier {
    pub fn new(config: &SpeechConfig) -> CommandNotifier {
        CommandNotifier {
            program: config.program.clone(),
            args: config.args.clone(),
            repeat_interval: Duration::from_millis(config.repeat_interval_ms),
            last_spoken: Mutex::new(None),
        }
    }

    fn should_speak(&self, identity: &str, now: Instant) -> bool {
        let mut last = self.last_spoken.lock().unwrap_or_else(|e| e.into_inner());
        let repeat = matches!(
            last.as_ref(),
            Some((l, t)) if l == identity && now.duration_since(*t) < self.repeat_interval
        );
        if !repeat {
            *last = Some((identity.to_string(), now));
        }
        !repeat
    }

    fn speak(&self, phrase: &str) -> Result<()> {
        Command::new(&self.program)
            .args(&self.args)
            .arg(phrase)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|mut child| {
                // reaped off the frame loop
                std::thread::spawn(move || child.wait());
            })
            .map_err(|e| TrackerError::Speech(format!("{}: {}", self.program, e)))
    }
}

impl Notifier for CommandNotifier {
    fn notify(&self, identity: &str) {
        let Some(phrase) = phrase_for(identity) else {
            info!("none");
            return;
        };
        info!("it's {}", identity);
        if !self.should_speak(identity, Instant::now()) {
            return;
        }
        if let Err(e) = self.speak(phrase) {
            warn!("{}, skipping spoken feedback", e);
        }
    }
}

pub fn notifier_from_config(config: &SpeechConfig) -> Box<dyn Notifier> {
    if config.enabled {
        Box::new(CommandNotifier::new(config))
    } else {
        Box::new(LogNotifier)
    }
}

use std::sync::Arc;
use std::thread::JoinHandle;

use image::RgbImage;
use log::{error, info, warn};

use crate::config::TrackerConfig;
use crate::consistent::{ConsistentMatcher, ModelMatcher};
use crate::disambiguation::{Disambiguator, FrameOutcome, RenderCommand};
use crate::error::Result;
use crate::features::{FastBriefEngine, FeatureEngine};
use crate::render::{RenderMode, RenderStrategy, create_renderer};
use crate::source::{FrameSource, Player, PlayerFrame};
use crate::speech::{Notifier, notifier_from_config};
use crate::template::TemplateBank;
use crate::visualization::{GREEN, MATCH_BLUE, RED, draw_keypoints_mut, draw_matches};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    /// space
    TogglePause,
    /// `c`
    LoadFeatures,
    Quit,
}

impl KeyEvent {
    /// Maps one line of terminal input to a key.
    pub fn from_input(line: &str) -> Option<KeyEvent> {
        match line.trim_end_matches(['\r', '\n']) {
            " " | "" | "space" => Some(KeyEvent::TogglePause),
            "c" | "C" => Some(KeyEvent::LoadFeatures),
            "q" | "Q" | "quit" => Some(KeyEvent::Quit),
            _ => None,
        }
    }

    /// Maps a window toolkit key code to a key, `None` for negative codes
    /// (no key pressed) and unbound keys. Modifier bits above the low byte
    /// are ignored.
    pub fn from_key_code(code: i32) -> Option<KeyEvent> {
        if code < 0 {
            return None;
        }
        match (code & 0xff) as u8 {
            b' ' => Some(KeyEvent::TogglePause),
            b'c' | b'C' => Some(KeyEvent::LoadFeatures),
            b'q' | b'Q' | 27 => Some(KeyEvent::Quit),
            _ => None,
        }
    }
}

/// Everything the display needs for one tick.
#[derive(Debug, Clone)]
pub struct StepOutput {
    pub display: RgbImage,
    pub matches_view: Option<RgbImage>,
    /// `None` when the frame was not processed
    pub outcome: Option<FrameOutcome>,
    pub paused: bool,
}

pub struct Controller {
    config: TrackerConfig,
    bank: Arc<TemplateBank>,
    engine: Arc<dyn FeatureEngine>,
    matcher: Option<Box<dyn ModelMatcher>>,
    player: Player,
    renderer: Box<dyn RenderStrategy>,
    notifier: Box<dyn Notifier>,
    disambiguator: Disambiguator,
    reload: Option<JoinHandle<()>>,
    last_matches_view: Option<RgbImage>,
}

impl Controller {
    pub fn new(
        config: TrackerConfig,
        bank: Arc<TemplateBank>,
        engine: Arc<dyn FeatureEngine>,
        player: Player,
        renderer: Box<dyn RenderStrategy>,
        notifier: Box<dyn Notifier>,
    ) -> Controller {
        let disambiguator = Disambiguator::new(config.max_condition, config.selection);
        Controller {
            config,
            bank,
            engine,
            matcher: None,
            player,
            renderer,
            notifier,
            disambiguator,
            reload: None,
            last_matches_view: None,
        }
    }

    /// Loads the template bank and builds the default engine, renderer and
    /// notifier. Fails if any reference image can't be read.
    pub fn from_config(
        config: TrackerConfig,
        source: Box<dyn FrameSource>,
        mode: RenderMode,
    ) -> Result<Controller> {
        let bank = Arc::new(TemplateBank::load(&config.templates)?);
        let engine: Arc<dyn FeatureEngine> = Arc::new(FastBriefEngine::new(&config.features)?);
        let renderer = create_renderer(mode, &config.overlay_image, &config.overlay_video);
        let notifier = notifier_from_config(&config.speech);
        Ok(Controller::new(
            config,
            bank,
            engine,
            Player::new(source),
            renderer,
            notifier,
        ))
    }

    pub fn bank(&self) -> &Arc<TemplateBank> {
        &self.bank
    }

    pub fn is_paused(&self) -> bool {
        self.player.is_paused()
    }

    pub fn has_matcher(&self) -> bool {
        self.matcher.is_some()
    }

    /// Returns `false` when the key asks to quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key {
            KeyEvent::TogglePause => {
                self.player.toggle_pause();
            }
            KeyEvent::LoadFeatures => {
                if self.matcher.is_none() {
                    info!("creating matcher");
                    self.matcher = Some(Box::new(ConsistentMatcher::new(
                        &self.config.matcher,
                        &self.config.estimator,
                    )));
                }
                self.start_reload();
            }
            KeyEvent::Quit => return false,
        }
        true
    }

    fn start_reload(&mut self) {
        if self.reload.as_ref().is_some_and(|h| !h.is_finished()) {
            warn!("template features are already being computed");
            return;
        }
        let bank = self.bank.clone();
        let engine = self.engine.clone();
        self.reload = Some(std::thread::spawn(move || {
            match bank.compute_features(engine.as_ref()) {
                Ok(_) => info!("template features loaded"),
                Err(e) => error!("failed to compute template features: {}", e),
            }
        }));
    }

    /// Blocks until a pending feature reload has finished.
    pub fn wait_for_reload(&mut self) {
        if let Some(handle) = self.reload.take() {
            if handle.join().is_err() {
                error!("feature reload thread panicked");
            }
        }
    }

    /// Pulls the next frame and processes it. `None` once the source ends.
    pub fn step(&mut self) -> Option<StepOutput> {
        match self.player.poll() {
            PlayerFrame::End => None,
            PlayerFrame::Paused(frame) => Some(StepOutput {
                display: frame,
                matches_view: self.last_matches_view.clone(),
                outcome: None,
                paused: true,
            }),
            PlayerFrame::Live(frame) => Some(self.process(frame)),
        }
    }

    fn process(&mut self, frame: RgbImage) -> StepOutput {
        let snapshot = self.bank.snapshot();
        let (Some(matcher), Some(features)) = (self.matcher.as_mut(), snapshot) else {
            return StepOutput {
                display: frame,
                matches_view: None,
                outcome: None,
                paused: false,
            };
        };

        let templates = self.bank.templates();
        let outcome = self.disambiguator.process_frame(
            &frame,
            templates,
            &features,
            self.engine.as_ref(),
            matcher.as_mut(),
        );

        let mut canvas = frame;
        draw_keypoints_mut(&mut canvas, &outcome.keypoints, RED, 1);
        let matches_view = match &outcome.render {
            RenderCommand::Accepted(m) => {
                if self.renderer.ensure_loaded() {
                    self.renderer.render(&mut canvas, &m.bounds_to_frame, &m.bounds);
                }
                self.notifier.notify(&m.label);
                Some(draw_matches(
                    &templates[m.template_index].image,
                    &canvas,
                    &features[m.template_index],
                    &outcome.keypoints,
                    &m.matches,
                    GREEN,
                ))
            }
            RenderCommand::Rejected {
                template_index,
                matches,
            } => Some(draw_matches(
                &templates[*template_index].image,
                &canvas,
                &features[*template_index],
                &outcome.keypoints,
                matches,
                MATCH_BLUE,
            )),
            RenderCommand::Nothing => None,
        };
        if matches_view.is_some() {
            self.last_matches_view = matches_view.clone();
        }
        StepOutput {
            display: canvas,
            matches_view,
            outcome: Some(outcome),
            paused: false,
        }
    }
}

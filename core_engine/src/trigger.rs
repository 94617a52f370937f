use std::time::{Duration, Instant};

use crate::detection::detection_sample;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    /// No dictionary yet, waiting for text worth sampling.
    Idle,
    /// Text seen, waiting for input to go quiet.
    Sampling,
    Detecting,
    Switching,
    /// A dictionary is active; detection only re-arms on a misspelling or
    /// when the host stops invoking the spell-check callback.
    Attached,
}

#[derive(Debug, Clone)]
pub struct TriggerConfig {
    pub debounce: Duration,
    pub attached_debounce: Duration,
    pub min_text_len: usize,
    pub sample_len: usize,
    pub boundary_threshold: u32,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(250),
            attached_debounce: Duration::from_millis(750),
            min_text_len: 8,
            sample_len: 256,
            boundary_threshold: 2,
        }
    }
}

/// Decides when settled input text is worth a language detection attempt.
///
/// Pure state: the caller feeds events with the current time and asks for
/// the next deadline, so the same machine runs under a real or paused clock.
#[derive(Debug)]
pub struct DetectionTrigger {
    config: TriggerConfig,
    phase: PipelinePhase,
    attached: bool,
    last_text: String,
    boundaries_since_check: u32,
    misspelling_seen: bool,
    deadline: Option<Instant>,
    pending: bool,
}

impl DetectionTrigger {
    pub fn new(config: TriggerConfig, attached: bool) -> Self {
        Self {
            config,
            phase: if attached {
                PipelinePhase::Attached
            } else {
                PipelinePhase::Idle
            },
            attached,
            last_text: String::new(),
            boundaries_since_check: 0,
            misspelling_seen: false,
            deadline: None,
            pending: false,
        }
    }

    pub fn phase(&self) -> PipelinePhase {
        self.phase
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn boundaries_since_check(&self) -> u32 {
        self.boundaries_since_check
    }

    pub fn observe_input(&mut self, text: &str, now: Instant) {
        if text.len() > self.last_text.len() && ends_word(text) {
            self.boundaries_since_check = self.boundaries_since_check.saturating_add(1);
        }
        self.last_text.clear();
        self.last_text.push_str(text);

        if self.phase == PipelinePhase::Idle {
            self.phase = PipelinePhase::Sampling;
        }
        self.deadline = Some(now + self.quiet_period());
    }

    pub fn on_spell_check_invoked(&mut self) {
        self.boundaries_since_check = 0;
    }

    pub fn on_misspelling(&mut self, now: Instant) {
        self.misspelling_seen = true;
        if self.attached && self.deadline.is_none() {
            self.deadline = Some(now + self.config.attached_debounce);
        }
    }

    /// Called once `now` passes the deadline. Returns the sample to detect,
    /// or `None` when this quiet period does not justify an attempt.
    pub fn fire(&mut self, now: Instant) -> Option<String> {
        let deadline = self.deadline?;
        if now < deadline {
            return None;
        }
        self.deadline = None;

        if self.in_flight() {
            self.pending = true;
            return None;
        }

        let rearmed = self.misspelling_seen
            || self.boundaries_since_check > self.config.boundary_threshold;
        if self.attached && !rearmed {
            return None;
        }

        if self.last_text.chars().count() < self.config.min_text_len {
            self.phase = self.resting_phase();
            return None;
        }

        self.misspelling_seen = false;
        self.boundaries_since_check = 0;
        self.phase = PipelinePhase::Detecting;
        Some(detection_sample(&self.last_text, self.config.sample_len).to_string())
    }

    /// `accepted` is false for failed or unreliable guesses.
    pub fn detection_finished(&mut self, accepted: bool, now: Instant) {
        if accepted {
            self.phase = PipelinePhase::Switching;
            return;
        }
        self.phase = self.resting_phase();
        self.release_pending(now);
    }

    pub fn switch_finished(&mut self, attached: bool, now: Instant) {
        self.attached = attached;
        self.phase = self.resting_phase();
        self.release_pending(now);
    }

    /// The session changed dictionaries outside this pipeline.
    pub fn set_attached(&mut self, attached: bool) {
        self.attached = attached;
        if !self.in_flight() && self.phase != PipelinePhase::Sampling {
            self.phase = self.resting_phase();
        }
    }

    fn in_flight(&self) -> bool {
        matches!(
            self.phase,
            PipelinePhase::Detecting | PipelinePhase::Switching
        )
    }

    fn quiet_period(&self) -> Duration {
        if self.attached {
            self.config.attached_debounce
        } else {
            self.config.debounce
        }
    }

    fn resting_phase(&self) -> PipelinePhase {
        if self.attached {
            PipelinePhase::Attached
        } else {
            PipelinePhase::Idle
        }
    }

    fn release_pending(&mut self, now: Instant) {
        if self.pending {
            self.pending = false;
            self.deadline = Some(now);
        }
    }
}

fn ends_word(text: &str) -> bool {
    let mut tail = text.chars().rev();
    match (tail.next(), tail.next()) {
        (Some(last), Some(before)) => last.is_whitespace() && !before.is_whitespace(),
        _ => false,
    }
}

use std::sync::{Arc, Weak};

use polyspell_core::{DetectionTrigger, LanguageCode};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinError, JoinHandle};
use tracing::debug;

use crate::guesser::guess_language;
use crate::session::{SessionSignal, SpellCheckSession, SwitchOutcome};

/// One change of the watched input's value. `value` is `None` when the
/// event target carries no text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputEvent {
    pub value: Option<String>,
}

impl InputEvent {
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
        }
    }
}

enum Step {
    Detected(Option<LanguageCode>),
    Switched(SwitchOutcome),
}

/// Watches an input stream and switches the session's language when the
/// text settles on something detectable.
pub struct LanguageDetectionPipeline {
    session: Weak<SpellCheckSession>,
    input: mpsc::Receiver<InputEvent>,
    signals: broadcast::Receiver<SessionSignal>,
    trigger: DetectionTrigger,
}

impl LanguageDetectionPipeline {
    pub fn new(session: &Arc<SpellCheckSession>, input: mpsc::Receiver<InputEvent>) -> Self {
        let trigger = DetectionTrigger::new(
            session.config().detection.trigger(),
            session.has_dictionary(),
        );
        Self {
            session: Arc::downgrade(session),
            input,
            signals: session.subscribe(),
            trigger,
        }
    }

    pub async fn run(self) {
        let Self {
            session,
            mut input,
            mut signals,
            mut trigger,
        } = self;
        let Some(scheduler) = session.upgrade().map(|session| session.scheduler()) else {
            return;
        };
        let mut in_flight: Option<JoinHandle<Step>> = None;

        loop {
            let deadline = trigger.deadline();
            let wake_at = deadline.unwrap_or_else(|| scheduler.now());

            tokio::select! {
                event = input.recv() => {
                    let Some(event) = event else { break };
                    if let Some(text) = event.value.filter(|text| !text.is_empty()) {
                        trigger.observe_input(&text, scheduler.now());
                    }
                }
                signal = signals.recv() => match signal {
                    Ok(SessionSignal::SpellCheckInvoked) => trigger.on_spell_check_invoked(),
                    Ok(SessionSignal::SpellingErrorOccurred(_)) => trigger.on_misspelling(scheduler.now()),
                    Ok(SessionSignal::SpellcheckerChanged(_)) => {
                        let Some(session) = session.upgrade() else { break };
                        trigger.set_attached(session.has_dictionary());
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        // A dropped SpellcheckerChanged would leave the trigger
                        // on the wrong side of attached.
                        debug!(skipped, "pipeline lagged behind session signals");
                        let Some(session) = session.upgrade() else { break };
                        trigger.set_attached(session.has_dictionary());
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = scheduler.sleep_until(wake_at), if deadline.is_some() => {
                    let Some(sample) = trigger.fire(scheduler.now()) else { continue };
                    let Some(session) = session.upgrade() else { break };
                    debug!(chars = sample.chars().count(), "input settled, detecting language");
                    in_flight = Some(tokio::spawn(detect(session, sample)));
                }
                finished = join(&mut in_flight), if in_flight.is_some() => {
                    in_flight = None;
                    let now = scheduler.now();
                    match finished {
                        Ok(Step::Detected(Some(language))) => {
                            trigger.detection_finished(true, now);
                            let Some(session) = session.upgrade() else { break };
                            in_flight = Some(tokio::spawn(switch(session, language)));
                        }
                        Ok(Step::Detected(None)) => trigger.detection_finished(false, now),
                        Ok(Step::Switched(outcome)) => {
                            if outcome == SwitchOutcome::Disposed {
                                break;
                            }
                            trigger.switch_finished(outcome.has_dictionary(), now);
                        }
                        Err(error) => {
                            debug!("detection task ended abnormally: {error}");
                            trigger.detection_finished(false, now);
                        }
                    }
                }
            }
        }

        if let Some(task) = in_flight {
            task.abort();
        }
        debug!("language detection pipeline stopped");
    }
}

async fn join(task: &mut Option<JoinHandle<Step>>) -> Result<Step, JoinError> {
    match task {
        Some(task) => task.await,
        None => std::future::pending().await,
    }
}

async fn detect(session: Arc<SpellCheckSession>, sample: String) -> Step {
    let detection = &session.config().detection;
    let language = guess_language(
        session.guesser(),
        &sample,
        detection.sample_len,
        detection.min_reliability,
    )
    .await;
    Step::Detected(language)
}

async fn switch(session: Arc<SpellCheckSession>, language: LanguageCode) -> Step {
    Step::Switched(session.switch_language(language.as_str()).await)
}

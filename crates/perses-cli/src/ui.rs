use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};
use perses::engine::progress::{Progress, ProgressCallback};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::warn;

#[derive(Debug)]
pub enum UiEvent {
    Progress(Progress),
    Log(String),
}

pub struct UiManager {
    mp: Arc<MultiProgress>,
    state: BarState,
    event_receiver: mpsc::Receiver<UiEvent>,
    shutdown_receiver: watch::Receiver<bool>,
    _sentinel_bar: ProgressBar,
}

#[derive(Default)]
struct BarState {
    active_bar: Option<ProgressBar>,
    base_message: String,
}

impl UiManager {
    pub fn new() -> (Self, mpsc::Sender<UiEvent>, watch::Sender<bool>) {
        let (event_sender, event_receiver) = mpsc::channel(1024);
        let (shutdown_sender, shutdown_receiver) = watch::channel(false);
        let mp = Arc::new(MultiProgress::new());
        mp.set_draw_target(ProgressDrawTarget::stderr_with_hz(12));
        let _sentinel_bar = mp.add(ProgressBar::hidden());
        let manager = Self {
            mp,
            state: BarState::default(),
            event_receiver,
            shutdown_receiver,
            _sentinel_bar,
        };

        (manager, event_sender, shutdown_sender)
    }

    pub async fn run(mut self) {
        loop {
            tokio::select! {
                Some(event) = self.event_receiver.recv() => {
                    self.handle_event(event);
                }
                result = self.shutdown_receiver.changed() => {
                    if result.is_err() || *self.shutdown_receiver.borrow() {
                        break;
                    }
                }
            }
        }
        // Flush log lines that arrived just before shutdown.
        while let Ok(event) = self.event_receiver.try_recv() {
            self.handle_event(event);
        }
        self._sentinel_bar.finish_and_clear();
    }

    fn handle_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Log(msg) => {
                self.mp.println(msg).ok();
            }
            UiEvent::Progress(progress) => self.handle_progress(progress),
        }
    }

    fn handle_progress(&mut self, progress: Progress) {
        match progress {
            Progress::PhaseStart { name } => {
                if let Some(bar) = self.state.active_bar.take() {
                    bar.finish_and_clear();
                }

                let pb = self.mp.add(ProgressBar::new_spinner());
                pb.enable_steady_tick(Duration::from_millis(80));
                pb.set_style(Self::spinner_style());
                pb.set_message(name);

                self.state.active_bar = Some(pb);
                self.state.base_message = name.to_string();
            }
            Progress::PhaseFinish => {
                if let Some(bar) = self.state.active_bar.take() {
                    bar.finish_and_clear();
                }

                let final_message = format!("✓ {}", self.state.base_message);
                self.mp.println(final_message).ok();

                self.state.base_message.clear();
            }
            Progress::TaskStart { total } => {
                if let Some(bar) = self.state.active_bar.as_ref() {
                    bar.set_style(Self::bar_style());
                    bar.set_length(total);
                    bar.set_position(0);
                    bar.disable_steady_tick();
                }
            }
            Progress::TaskIncrement { amount } => {
                if let Some(bar) = self.state.active_bar.as_ref() {
                    bar.inc(amount);
                }
            }
            Progress::TaskFinish => {
                if let Some(bar) = self.state.active_bar.as_ref() {
                    bar.finish();
                }
            }
            Progress::StatusUpdate { text } => {
                if let Some(bar) = self.state.active_bar.as_ref() {
                    bar.set_message(format!("{} ({})", self.state.base_message, text));
                }
            }
            Progress::Message(msg) => {
                self.mp.println(format!("  {}", msg)).ok();
            }
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{msg:<45} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .with_key(
                "eta",
                |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                    let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
                },
            )
            .progress_chars("━╸ ")
    }
}

#[derive(Clone)]
pub struct CliProgressHandler {
    sender: mpsc::Sender<UiEvent>,
}

impl CliProgressHandler {
    pub fn new(sender: mpsc::Sender<UiEvent>) -> Self {
        Self { sender }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let sender = self.sender.clone();
        Box::new(move |progress: Progress| {
            if let Err(e) = sender.try_send(UiEvent::Progress(progress)) {
                warn!("Failed to send progress update to UI channel: {}", e);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_manager() -> (UiManager, mpsc::Sender<UiEvent>) {
        let (manager, sender, _) = UiManager::new();
        manager.mp.set_draw_target(ProgressDrawTarget::hidden());
        (manager, sender)
    }

    #[test]
    fn handle_phase_start_creates_new_spinner() {
        let (mut manager, _) = setup_manager();
        assert!(manager.state.active_bar.is_none());

        manager.handle_event(UiEvent::Progress(Progress::PhaseStart {
            name: "Forward proposal",
        }));

        assert!(manager.state.active_bar.is_some());
        let bar = manager.state.active_bar.as_ref().unwrap();
        assert_eq!(bar.message(), "Forward proposal");
        assert_eq!(manager.state.base_message, "Forward proposal");
    }

    #[test]
    fn handle_phase_start_replaces_existing_bar() {
        let (mut manager, _) = setup_manager();
        manager.handle_event(UiEvent::Progress(Progress::PhaseStart {
            name: "Preparation",
        }));
        manager.handle_event(UiEvent::Progress(Progress::PhaseStart {
            name: "Reverse evaluation",
        }));

        let bar = manager.state.active_bar.as_ref().unwrap();
        assert_eq!(bar.message(), "Reverse evaluation");
        assert_eq!(manager.state.base_message, "Reverse evaluation");
    }

    #[test]
    fn handle_phase_finish_clears_active_bar() {
        let (mut manager, _) = setup_manager();
        manager.handle_event(UiEvent::Progress(Progress::PhaseStart {
            name: "Preparation",
        }));

        manager.handle_event(UiEvent::Progress(Progress::PhaseFinish));

        assert!(manager.state.active_bar.is_none());
        assert!(manager.state.base_message.is_empty());
    }

    #[test]
    fn task_events_drive_the_bar() {
        let (mut manager, _) = setup_manager();
        manager.handle_event(UiEvent::Progress(Progress::PhaseStart {
            name: "Forward proposal",
        }));
        manager.handle_event(UiEvent::Progress(Progress::TaskStart { total: 3 }));
        let bar = manager.state.active_bar.as_ref().unwrap();
        assert_eq!(bar.length(), Some(3));
        assert_eq!(bar.position(), 0);

        manager.handle_event(UiEvent::Progress(Progress::TaskIncrement { amount: 2 }));
        assert_eq!(manager.state.active_bar.as_ref().unwrap().position(), 2);

        manager.handle_event(UiEvent::Progress(Progress::TaskFinish));
        assert!(manager.state.active_bar.as_ref().unwrap().is_finished());
    }

    #[test]
    fn handle_status_update_changes_bar_message() {
        let (mut manager, _) = setup_manager();
        manager.handle_event(UiEvent::Progress(Progress::PhaseStart {
            name: "Forward proposal",
        }));

        manager.handle_event(UiEvent::Progress(Progress::StatusUpdate {
            text: "Growing 3 atoms".into(),
        }));

        let bar = manager.state.active_bar.as_ref().unwrap();
        assert_eq!(bar.message(), "Forward proposal (Growing 3 atoms)");
    }

    #[test]
    fn events_without_active_bar_are_ignored() {
        let (mut manager, _) = setup_manager();
        manager.handle_event(UiEvent::Progress(Progress::TaskStart { total: 10 }));
        manager.handle_event(UiEvent::Progress(Progress::StatusUpdate {
            text: "idle".into(),
        }));
        manager.handle_event(UiEvent::Log("Test log message".to_string()));
        manager.handle_event(UiEvent::Progress(Progress::Message("note".to_string())));
        assert!(manager.state.active_bar.is_none());
    }

    #[tokio::test]
    async fn cli_progress_handler_sends_progress_event() {
        let (sender, mut receiver) = mpsc::channel(1);
        let handler = CliProgressHandler::new(sender);
        let callback = handler.get_callback();

        callback(Progress::PhaseStart {
            name: "Preparation",
        });

        match receiver.recv().await.unwrap() {
            UiEvent::Progress(Progress::PhaseStart { name }) => assert_eq!(name, "Preparation"),
            other => panic!("Incorrect event received: {:?}", other),
        }
    }

    #[tokio::test]
    async fn run_exits_on_shutdown_signal() {
        let (manager, sender, shutdown) = UiManager::new();
        manager.mp.set_draw_target(ProgressDrawTarget::hidden());
        let handle = tokio::spawn(manager.run());

        sender
            .send(UiEvent::Log("before shutdown".to_string()))
            .await
            .unwrap();
        shutdown.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("UI manager did not stop")
            .unwrap();
    }
}

use serde::Serialize;
use tokio::sync::mpsc;

/// Notifications emitted for the UI and other collaborators
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JukeboxEvent {
    DownloadProgress {
        gd_song_id: i32,
        unique_id: String,
        progress: f32,
    },
    Error {
        /// Whether the failure affects a specific song the user acted on
        fatal: bool,
        message: String,
    },
    StateChanged {
        gd_song_id: i32,
    },
}

impl JukeboxEvent {
    pub fn error(fatal: bool, message: impl Into<String>) -> Self {
        JukeboxEvent::Error {
            fatal,
            message: message.into(),
        }
    }
}

/// Fire-and-forget event delivery
pub trait EventSink: Send + Sync {
    fn emit(&self, event: JukeboxEvent);
}

/// Sink that only writes events to the log
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: JukeboxEvent) {
        match &event {
            JukeboxEvent::Error { fatal, message } => {
                log::error!("[jukebox] error (fatal: {}): {}", fatal, message)
            }
            JukeboxEvent::DownloadProgress {
                unique_id, progress, ..
            } => log::debug!("[jukebox] {} at {:.0}%", unique_id, progress * 100.0),
            JukeboxEvent::StateChanged { gd_song_id } => {
                log::debug!("[jukebox] state changed for {}", gd_song_id)
            }
        }
    }
}

/// Sink forwarding every event into an unbounded channel
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<JukeboxEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<JukeboxEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: JukeboxEvent) {
        // Receiver may already be gone during shutdown
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_sink_delivers_in_order() {
        let (sink, mut rx) = ChannelSink::new();
        sink.emit(JukeboxEvent::StateChanged { gd_song_id: 1 });
        sink.emit(JukeboxEvent::error(false, "boom"));

        assert_eq!(
            rx.recv().await,
            Some(JukeboxEvent::StateChanged { gd_song_id: 1 })
        );
        assert_eq!(
            rx.recv().await,
            Some(JukeboxEvent::Error {
                fatal: false,
                message: "boom".to_string()
            })
        );
    }

    #[test]
    fn channel_sink_ignores_closed_receiver() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.emit(JukeboxEvent::StateChanged { gd_song_id: 1 });
    }
}

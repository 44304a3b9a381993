//! PreviewPlayer: at most one audio preview at a time.
//!
//! The player is a pure state machine.  It does not touch audio itself; each
//! transition returns the ordered backend commands needed to reach the new
//! state, and the caller executes them.  A `Stop` is always emitted before
//! the `Start` that replaces it, so the backend never carries two streams.
//!
//! ```text
//!   Idle ──play(a)──▶ Playing(a) ──play(a)──▶ Idle
//!                         │
//!                         ├──play(b)──▶ Playing(b)      (Stop, Start b)
//!                         └──failure(token of a)──▶ Idle
//! ```

use tracing::debug;

use crate::error::CurateError;

/// Identifies one started stream.  Failure reports carry the token of the
/// stream they belong to so a late report for an abandoned stream cannot
/// knock out the one that replaced it.
pub type StreamToken = u64;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing {
        record_id: String,
        token: StreamToken,
    },
}

/// Work for the audio backend, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewCommand {
    Stop,
    Start {
        record_id: String,
        url: String,
        token: StreamToken,
    },
}

#[derive(Debug, Default)]
pub struct PreviewPlayer {
    state: PlaybackState,
    next_token: StreamToken,
}

impl PreviewPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// Id of the record currently previewing, if any.
    pub fn current(&self) -> Option<&str> {
        match &self.state {
            PlaybackState::Playing { record_id, .. } => Some(record_id),
            PlaybackState::Idle => None,
        }
    }

    pub fn is_playing(&self, record_id: &str) -> bool {
        self.current() == Some(record_id)
    }

    /// Toggle preview of `record_id`.
    ///
    /// Same record playing → stop.  Another record playing → stop it, then
    /// start this one.  Idle → start.
    pub fn play(&mut self, record_id: &str, url: &str) -> Vec<PreviewCommand> {
        match &self.state {
            PlaybackState::Playing { record_id: cur, .. } if cur == record_id => {
                debug!("preview: toggle off {}", record_id);
                self.state = PlaybackState::Idle;
                vec![PreviewCommand::Stop]
            }
            PlaybackState::Playing { .. } => {
                let start = self.start(record_id, url);
                vec![PreviewCommand::Stop, start]
            }
            PlaybackState::Idle => vec![self.start(record_id, url)],
        }
    }

    fn start(&mut self, record_id: &str, url: &str) -> PreviewCommand {
        self.next_token += 1;
        let token = self.next_token;
        debug!("preview: start {} token={}", record_id, token);
        self.state = PlaybackState::Playing {
            record_id: record_id.to_string(),
            token,
        };
        PreviewCommand::Start {
            record_id: record_id.to_string(),
            url: url.to_string(),
            token,
        }
    }

    /// The backend reports that stream `token` failed.  Returns the notice to
    /// show when the failure concerns the live stream; stale reports are
    /// dropped.
    pub fn on_failure(&mut self, token: StreamToken, reason: &str) -> Option<CurateError> {
        match &self.state {
            PlaybackState::Playing { token: live, .. } if *live == token => {
                debug!("preview: stream token={} failed: {}", token, reason);
                self.state = PlaybackState::Idle;
                Some(CurateError::Playback(reason.to_string()))
            }
            _ => {
                debug!("preview: ignoring stale failure for token={}", token);
                None
            }
        }
    }

    /// Stop whatever is playing.  Used on teardown; always safe to call.
    pub fn shutdown(&mut self) -> Vec<PreviewCommand> {
        match std::mem::take(&mut self.state) {
            PlaybackState::Playing { .. } => vec![PreviewCommand::Stop],
            PlaybackState::Idle => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started_token(cmds: &[PreviewCommand]) -> StreamToken {
        cmds.iter()
            .find_map(|c| match c {
                PreviewCommand::Start { token, .. } => Some(*token),
                PreviewCommand::Stop => None,
            })
            .unwrap()
    }

    #[test]
    fn test_switching_stops_before_starting() {
        let mut p = PreviewPlayer::new();
        let cmds = p.play("a", "http://a");
        assert!(matches!(cmds.as_slice(), [PreviewCommand::Start { .. }]));

        let cmds = p.play("b", "http://b");
        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[0], PreviewCommand::Stop);
        assert!(matches!(&cmds[1], PreviewCommand::Start { record_id, .. } if record_id == "b"));
        assert_eq!(p.current(), Some("b"));
        assert!(!p.is_playing("a"));

        let cmds = p.play("b", "http://b");
        assert_eq!(cmds, vec![PreviewCommand::Stop]);
        assert_eq!(p.state(), &PlaybackState::Idle);
    }

    #[test]
    fn test_failure_returns_to_idle_with_notice() {
        let mut p = PreviewPlayer::new();
        let token = started_token(&p.play("a", "http://a"));
        let notice = p.on_failure(token, "stream unreachable");
        assert!(matches!(notice, Some(CurateError::Playback(_))));
        assert_eq!(p.current(), None);
    }

    #[test]
    fn test_stale_failure_is_ignored() {
        let mut p = PreviewPlayer::new();
        let old = started_token(&p.play("a", "http://a"));
        p.play("a", "http://a");
        let new = started_token(&p.play("a", "http://a"));
        assert_ne!(old, new);
        assert!(p.on_failure(old, "late").is_none());
        assert!(p.is_playing("a"));
    }

    #[test]
    fn test_shutdown_stops_only_when_playing() {
        let mut p = PreviewPlayer::new();
        assert!(p.shutdown().is_empty());
        p.play("a", "http://a");
        assert_eq!(p.shutdown(), vec![PreviewCommand::Stop]);
        assert_eq!(p.current(), None);
    }

    #[test]
    fn test_never_two_playing() {
        let mut p = PreviewPlayer::new();
        for id in ["a", "b", "a", "c", "c", "b", "a"] {
            let cmds = p.play(id, "http://x");
            let starts = cmds
                .iter()
                .filter(|c| matches!(c, PreviewCommand::Start { .. }))
                .count();
            assert!(starts <= 1);
            if starts == 1 && cmds.len() == 2 {
                assert_eq!(cmds[0], PreviewCommand::Stop);
            }
        }
    }
}

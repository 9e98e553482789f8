use std::time::{Duration, Instant};

use stallwatch_types::{Classification, ConversationState, EpisodeSnapshot, Evidence};
use uuid::Uuid;

/// One tracked stall, from first `Stalled` sample until `Active` is seen.
#[derive(Debug, Clone, PartialEq)]
pub struct StallEpisode {
    pub id: Uuid,
    pub started_at: Instant,
    pub first_sample_at: Instant,
    pub last_sample_at: Instant,
    pub action_taken: bool,
    pub last_action_at: Option<Instant>,
    /// Resume attempts made in this episode.
    pub consecutive_stall_count: u32,
    pub evidence: Evidence,
}

impl StallEpisode {
    fn open(now: Instant, sample_at: Instant, evidence: Evidence) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: now,
            first_sample_at: sample_at,
            last_sample_at: sample_at,
            action_taken: false,
            last_action_at: None,
            consecutive_stall_count: 0,
            evidence,
        }
    }

    pub fn snapshot(&self, now: Instant) -> EpisodeSnapshot {
        EpisodeSnapshot {
            id: self.id,
            open_for: now.saturating_duration_since(self.started_at),
            action_taken: self.action_taken,
            consecutive_stall_count: self.consecutive_stall_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebounceDecision {
    /// No episode, nothing to do.
    Idle,
    /// `Unknown` sample: state held as is.
    Hold,
    /// A new episode just opened.
    Opened { id: Uuid },
    /// Stalled, but dwell time or a second sample is still missing.
    Waiting,
    /// Send a resume now. `attempt` counts from 1 within the episode.
    Dispatch { attempt: u32 },
    /// A resume is due but automatic sending is off. Nothing is recorded, so
    /// the resume goes out on the first stalled sample after it is switched back on.
    Suppressed { attempt: u32 },
    /// Already resumed; waiting out the cooldown.
    CoolingDown,
    /// `Active` observed; the episode is closed.
    Resolved { id: Uuid, attempts: u32 },
}

/// Decides when a persisting stall deserves a resume, and when it deserves another.
#[derive(Debug)]
pub struct StallDebouncer {
    dwell: Duration,
    cooldown: Duration,
    auto_send: bool,
    episode: Option<StallEpisode>,
}

impl StallDebouncer {
    pub fn new(dwell: Duration, cooldown: Duration) -> Self {
        Self {
            dwell,
            cooldown,
            auto_send: true,
            episode: None,
        }
    }

    pub fn episode(&self) -> Option<&StallEpisode> {
        self.episode.as_ref()
    }

    pub fn auto_send(&self) -> bool {
        self.auto_send
    }

    pub fn set_auto_send(&mut self, enabled: bool) {
        self.auto_send = enabled;
    }

    /// Count an operator-requested resume against the open episode, so the
    /// next automatic one waits out the cooldown. Returns its attempt number,
    /// 0 when no stall is open.
    pub fn record_manual_action(&mut self, now: Instant) -> u32 {
        let Some(episode) = self.episode.as_mut() else {
            return 0;
        };
        episode.action_taken = true;
        episode.last_action_at = Some(now);
        episode.consecutive_stall_count += 1;
        episode.consecutive_stall_count
    }

    /// Feed one classified sample captured at `sample_at`, evaluated at `now`.
    pub fn observe(
        &mut self,
        classification: &Classification,
        sample_at: Instant,
        now: Instant,
    ) -> DebounceDecision {
        match classification.state {
            ConversationState::Unknown => {
                if self.episode.is_some() {
                    DebounceDecision::Hold
                } else {
                    DebounceDecision::Idle
                }
            }
            ConversationState::Active => match self.episode.take() {
                Some(episode) => DebounceDecision::Resolved {
                    id: episode.id,
                    attempts: episode.consecutive_stall_count,
                },
                None => DebounceDecision::Idle,
            },
            ConversationState::Stalled => self.observe_stalled(classification, sample_at, now),
        }
    }

    fn observe_stalled(
        &mut self,
        classification: &Classification,
        sample_at: Instant,
        now: Instant,
    ) -> DebounceDecision {
        let Some(episode) = self.episode.as_mut() else {
            let episode = StallEpisode::open(now, sample_at, classification.evidence.clone());
            let id = episode.id;
            self.episode = Some(episode);
            return DebounceDecision::Opened { id };
        };

        episode.last_sample_at = sample_at;
        episode.evidence = classification.evidence.clone();

        if episode.action_taken {
            let last = episode.last_action_at.unwrap_or(episode.started_at);
            if now.saturating_duration_since(last) < self.cooldown {
                return DebounceDecision::CoolingDown;
            }
            // still stalled after a full cooldown: re-arm
            episode.action_taken = false;
        }

        let dwelled = now.saturating_duration_since(episode.started_at) >= self.dwell;
        let resampled = episode.last_sample_at != episode.first_sample_at;
        if !(dwelled && resampled) {
            return DebounceDecision::Waiting;
        }
        if !self.auto_send {
            return DebounceDecision::Suppressed {
                attempt: episode.consecutive_stall_count + 1,
            };
        }

        episode.action_taken = true;
        episode.last_action_at = Some(now);
        episode.consecutive_stall_count += 1;
        DebounceDecision::Dispatch {
            attempt: episode.consecutive_stall_count,
        }
    }
}

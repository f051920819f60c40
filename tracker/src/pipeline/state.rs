use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The source yielded no further frame.
    SourceExhausted,
    /// Ctrl-C was observed at the end of an iteration.
    Cancelled,
}

/// Lifecycle of the frame loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Nothing decoded yet.
    Init,
    /// A preprocessed frame is stored as history but no mask exists yet.
    Seeding,
    /// Masks are being produced; every frame is composited and encoded.
    Running,
    Done(StopReason),
}

/// What the loop observed during one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEvent {
    /// A frame was decoded and preprocessed. `mask` says whether the motion
    /// builder produced a mask for it (false only for the seeding frame).
    Frame { mask: bool },
    Stop(StopReason),
}

impl LoopState {
    pub fn is_done(&self) -> bool {
        matches!(self, LoopState::Done(_))
    }

    /// Apply one event. `Done` is terminal, and history is never dropped once
    /// running.
    pub fn advance(self, event: LoopEvent) -> LoopState {
        let next = match (self, event) {
            (LoopState::Done(reason), _) => LoopState::Done(reason),
            (_, LoopEvent::Stop(reason)) => LoopState::Done(reason),
            (LoopState::Running, LoopEvent::Frame { .. }) => LoopState::Running,
            (_, LoopEvent::Frame { mask: true }) => LoopState::Running,
            (_, LoopEvent::Frame { mask: false }) => LoopState::Seeding,
        };
        match (self, next) {
            (LoopState::Init, LoopState::Seeding) => info!("INIT→SEEDING: first frame decoded"),
            (LoopState::Seeding, LoopState::Running) => info!("SEEDING→RUNNING: motion history ready"),
            (prev, LoopState::Done(reason)) if !prev.is_done() => {
                info!(from = ?prev, ?reason, "frame loop finished")
            }
            (prev, next) if prev != next => debug!(from = ?prev, to = ?next, "loop state changed"),
            _ => {}
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_lifecycle() {
        let s = LoopState::Init;
        let s = s.advance(LoopEvent::Frame { mask: false });
        assert_eq!(s, LoopState::Seeding);
        let s = s.advance(LoopEvent::Frame { mask: true });
        assert_eq!(s, LoopState::Running);
        let s = s.advance(LoopEvent::Frame { mask: true });
        assert_eq!(s, LoopState::Running);
        let s = s.advance(LoopEvent::Stop(StopReason::SourceExhausted));
        assert_eq!(s, LoopState::Done(StopReason::SourceExhausted));
        assert!(s.is_done());
    }

    #[test]
    fn empty_source_goes_straight_to_done() {
        let s = LoopState::Init.advance(LoopEvent::Stop(StopReason::SourceExhausted));
        assert_eq!(s, LoopState::Done(StopReason::SourceExhausted));
    }

    #[test]
    fn cancel_from_any_state() {
        for s in [LoopState::Init, LoopState::Seeding, LoopState::Running] {
            assert_eq!(
                s.advance(LoopEvent::Stop(StopReason::Cancelled)),
                LoopState::Done(StopReason::Cancelled)
            );
        }
    }

    #[test]
    fn done_is_terminal() {
        let s = LoopState::Done(StopReason::Cancelled);
        assert_eq!(s.advance(LoopEvent::Frame { mask: true }), s);
        assert_eq!(s.advance(LoopEvent::Stop(StopReason::SourceExhausted)), s);
    }

    #[test]
    fn running_never_returns_to_seeding() {
        let s = LoopState::Running.advance(LoopEvent::Frame { mask: false });
        assert_eq!(s, LoopState::Running);
    }
}

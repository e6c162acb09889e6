// Push connection state machine
//
// Pure transition logic: no sockets, no timers. The supervisor feeds events
// in and executes the returned effects, which keeps the reconnection policy
// testable without I/O and makes "at most one socket, at most one timer" a
// property of the effect stream rather than scattered flags.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushState {
    Disconnected,
    Connecting,
    Open,
    ReconnectWait,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushEvent {
    /// Begin a session from an idle state.
    Start,
    /// The socket finished its handshake.
    Opened,
    /// The socket closed or failed to open. `intentional` marks closes the
    /// manager itself requested; only unintentional closes consume budget.
    Closed { intentional: bool },
    /// The scheduled retry timer fired.
    RetryTimer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushEffect {
    OpenSocket,
    ScheduleRetry,
    CancelRetry,
    CloseSocket,
    NotifyConnected,
    NotifyFailed,
}

pub struct PushStateMachine {
    state: PushState,
    attempts: u32,
    max_attempts: u32,
}

impl PushStateMachine {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            state: PushState::Disconnected,
            attempts: 0,
            max_attempts,
        }
    }

    pub fn state(&self) -> PushState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn handle(&mut self, event: PushEvent) -> Vec<PushEffect> {
        match (self.state, event) {
            (PushState::Disconnected | PushState::Failed, PushEvent::Start) => {
                self.attempts = 0;
                self.state = PushState::Connecting;
                vec![PushEffect::OpenSocket]
            }
            (PushState::Connecting, PushEvent::Opened) => {
                self.attempts = 0;
                self.state = PushState::Open;
                vec![PushEffect::NotifyConnected]
            }
            (
                PushState::Connecting | PushState::Open,
                PushEvent::Closed { intentional: true },
            ) => {
                self.state = PushState::Disconnected;
                vec![]
            }
            (
                PushState::Connecting | PushState::Open,
                PushEvent::Closed { intentional: false },
            ) => {
                self.attempts += 1;
                if self.attempts >= self.max_attempts {
                    self.state = PushState::Failed;
                    vec![PushEffect::NotifyFailed]
                } else {
                    self.state = PushState::ReconnectWait;
                    vec![PushEffect::ScheduleRetry]
                }
            }
            (PushState::ReconnectWait, PushEvent::RetryTimer) => {
                self.state = PushState::Connecting;
                vec![PushEffect::OpenSocket]
            }
            (PushState::ReconnectWait, PushEvent::Closed { intentional: true }) => {
                self.state = PushState::Disconnected;
                vec![PushEffect::CancelRetry]
            }
            // Anything else is a stale or out-of-order signal
            _ => vec![],
        }
    }

    /// Manual reconnect: force-close whatever exists, reset the attempt
    /// budget and open a fresh socket.
    pub fn reconnect(&mut self) -> Vec<PushEffect> {
        let mut effects = match self.state {
            PushState::Connecting | PushState::Open => vec![PushEffect::CloseSocket],
            PushState::ReconnectWait => vec![PushEffect::CancelRetry],
            PushState::Disconnected | PushState::Failed => vec![],
        };
        self.attempts = 0;
        self.state = PushState::Connecting;
        effects.push(PushEffect::OpenSocket);
        effects
    }

    /// Intentional teardown: release socket and timer, schedule nothing.
    pub fn stop(&mut self) -> Vec<PushEffect> {
        let effects = match self.state {
            PushState::Connecting | PushState::Open => vec![PushEffect::CloseSocket],
            PushState::ReconnectWait => vec![PushEffect::CancelRetry],
            PushState::Disconnected | PushState::Failed => vec![],
        };
        self.state = PushState::Disconnected;
        effects
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unintentional() -> PushEvent {
        PushEvent::Closed { intentional: false }
    }

    #[test]
    fn test_start_opens_a_socket() {
        let mut machine = PushStateMachine::new(10);
        assert_eq!(machine.handle(PushEvent::Start), vec![PushEffect::OpenSocket]);
        assert_eq!(machine.state(), PushState::Connecting);
        assert_eq!(machine.attempts(), 0);
    }

    #[test]
    fn test_successful_open_resets_attempt_counter() {
        let mut machine = PushStateMachine::new(10);
        machine.handle(PushEvent::Start);
        machine.handle(unintentional());
        assert_eq!(machine.attempts(), 1);
        machine.handle(PushEvent::RetryTimer);

        let effects = machine.handle(PushEvent::Opened);
        assert_eq!(effects, vec![PushEffect::NotifyConnected]);
        assert_eq!(machine.state(), PushState::Open);
        assert_eq!(machine.attempts(), 0);
    }

    #[test]
    fn test_each_failure_increments_by_one_and_schedules_one_retry() {
        let mut machine = PushStateMachine::new(10);
        machine.handle(PushEvent::Start);
        for expected in 1..10 {
            let effects = machine.handle(unintentional());
            assert_eq!(effects, vec![PushEffect::ScheduleRetry]);
            assert_eq!(machine.attempts(), expected);
            assert_eq!(machine.state(), PushState::ReconnectWait);
            assert_eq!(
                machine.handle(PushEvent::RetryTimer),
                vec![PushEffect::OpenSocket]
            );
        }
    }

    #[test]
    fn test_max_consecutive_failures_emit_failed_exactly_once() {
        let mut machine = PushStateMachine::new(10);
        machine.handle(PushEvent::Start);

        let mut failed_signals = 0;
        for _ in 0..10 {
            let effects = machine.handle(unintentional());
            failed_signals += effects
                .iter()
                .filter(|e| **e == PushEffect::NotifyFailed)
                .count();
            if machine.state() == PushState::ReconnectWait {
                machine.handle(PushEvent::RetryTimer);
            }
        }
        assert_eq!(machine.state(), PushState::Failed);
        assert_eq!(failed_signals, 1);

        // Terminal: further closes neither reschedule nor re-emit
        assert!(machine.handle(unintentional()).is_empty());
        assert_eq!(machine.state(), PushState::Failed);
    }

    #[test]
    fn test_intentional_close_goes_quiet() {
        let mut machine = PushStateMachine::new(10);
        machine.handle(PushEvent::Start);
        machine.handle(PushEvent::Opened);

        let effects = machine.handle(PushEvent::Closed { intentional: true });
        assert!(effects.is_empty());
        assert_eq!(machine.state(), PushState::Disconnected);
    }

    #[test]
    fn test_reconnect_closes_existing_socket_and_resets_budget() {
        let mut machine = PushStateMachine::new(10);
        machine.handle(PushEvent::Start);
        machine.handle(PushEvent::Opened);
        machine.handle(unintentional());
        machine.handle(PushEvent::RetryTimer);
        machine.handle(unintentional());
        assert_eq!(machine.attempts(), 2);
        machine.handle(PushEvent::RetryTimer);

        let effects = machine.reconnect();
        assert_eq!(effects, vec![PushEffect::CloseSocket, PushEffect::OpenSocket]);
        assert_eq!(machine.attempts(), 0);
        assert_eq!(machine.state(), PushState::Connecting);
    }

    #[test]
    fn test_reconnect_from_failed_restarts() {
        let mut machine = PushStateMachine::new(1);
        machine.handle(PushEvent::Start);
        machine.handle(unintentional());
        assert_eq!(machine.state(), PushState::Failed);

        assert_eq!(machine.reconnect(), vec![PushEffect::OpenSocket]);
        assert_eq!(machine.state(), PushState::Connecting);
    }

    #[test]
    fn test_stop_cancels_pending_retry() {
        let mut machine = PushStateMachine::new(10);
        machine.handle(PushEvent::Start);
        machine.handle(unintentional());
        assert_eq!(machine.state(), PushState::ReconnectWait);

        assert_eq!(machine.stop(), vec![PushEffect::CancelRetry]);
        assert_eq!(machine.state(), PushState::Disconnected);
        // A cancelled timer that fires anyway must be ignored
        assert!(machine.handle(PushEvent::RetryTimer).is_empty());
    }
}

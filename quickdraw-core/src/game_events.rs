use quickdraw_types::{Player, WordRejection};

#[derive(Debug, Clone, PartialEq)]
pub enum RoundEvent {
    GameSetUp {
        players: Vec<Player>,
        category: String,
        timer_duration_seconds: u32,
    },
    GameStarted {
        time_remaining: u32,
    },
    WordAccepted {
        player: String,
        word: String,
        next_player: String,
    },
    WordRejected {
        word: String,
        reason: WordRejection,
    },
    GamePaused {
        time_remaining: u32,
    },
    GameResumed {
        time_remaining: u32,
    },
    PlayerTimedOut {
        loser: Player,
    },
    GameExited,
}

impl RoundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RoundEvent::GameSetUp { .. } => "game_set_up",
            RoundEvent::GameStarted { .. } => "game_started",
            RoundEvent::WordAccepted { .. } => "word_accepted",
            RoundEvent::WordRejected { .. } => "word_rejected",
            RoundEvent::GamePaused { .. } => "game_paused",
            RoundEvent::GameResumed { .. } => "game_resumed",
            RoundEvent::PlayerTimedOut { .. } => "player_timed_out",
            RoundEvent::GameExited => "game_exited",
        }
    }
}

/// Event handler trait for observing a round. Handlers run synchronously
/// while the round is locked, so they must not call back into it.
pub trait RoundEventHandler: Send {
    fn handle_event(&mut self, event: RoundEvent);
}

/// Simple event bus for distributing round events
pub struct RoundEventBus {
    handlers: Vec<Box<dyn RoundEventHandler>>,
}

impl RoundEventBus {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn add_handler(&mut self, handler: Box<dyn RoundEventHandler>) {
        self.handlers.push(handler);
    }

    pub fn publish(&mut self, event: RoundEvent) {
        for handler in &mut self.handlers {
            handler.handle_event(event.clone());
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

impl Default for RoundEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RoundEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoundEventBus")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct TestHandler {
        events: Arc<Mutex<Vec<RoundEvent>>>,
    }

    impl RoundEventHandler for TestHandler {
        fn handle_event(&mut self, event: RoundEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[test]
    fn test_event_bus_fans_out() {
        let mut bus = RoundEventBus::new();
        let first = Arc::new(Mutex::new(Vec::new()));
        let second = Arc::new(Mutex::new(Vec::new()));

        bus.add_handler(Box::new(TestHandler {
            events: first.clone(),
        }));
        bus.add_handler(Box::new(TestHandler {
            events: second.clone(),
        }));
        assert_eq!(bus.handler_count(), 2);

        bus.publish(RoundEvent::GameStarted { time_remaining: 15 });
        bus.publish(RoundEvent::GameExited);

        for events in [first, second] {
            let events = events.lock().unwrap();
            assert_eq!(events.len(), 2);
            assert_eq!(events[0].name(), "game_started");
            assert_eq!(events[1], RoundEvent::GameExited);
        }
    }

    #[test]
    fn test_publish_without_handlers() {
        let mut bus = RoundEventBus::default();
        bus.publish(RoundEvent::GameExited);
        assert_eq!(bus.handler_count(), 0);
    }
}

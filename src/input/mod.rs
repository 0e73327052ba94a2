//! Button event sources.
//!
//! Sources are polled once per loop iteration and never block.

use crate::modes::Button;
use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

/// Non-blocking source of debounced button presses.
pub trait ButtonSource {
    /// Returns every press received since the previous poll, oldest first.
    fn poll(&mut self) -> Vec<Button>;
}

/// Replays a fixed script, one batch of presses per poll.
#[derive(Debug, Clone, Default)]
pub struct ScriptedButtons {
    batches: VecDeque<Vec<Button>>,
}

impl ScriptedButtons {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a poll that returns `buttons`.
    pub fn then(mut self, buttons: &[Button]) -> Self {
        self.batches.push_back(buttons.to_vec());
        self
    }

    /// Appends `polls` polls that return nothing.
    pub fn idle(mut self, polls: usize) -> Self {
        self.batches
            .extend(std::iter::repeat_with(Vec::new).take(polls));
        self
    }

    pub fn remaining(&self) -> usize {
        self.batches.len()
    }
}

impl ButtonSource for ScriptedButtons {
    fn poll(&mut self) -> Vec<Button> {
        self.batches.pop_front().unwrap_or_default()
    }
}

/// Presses delivered from another thread over a channel.
#[derive(Debug)]
pub struct ChannelButtons {
    rx: Receiver<Button>,
    disconnected: bool,
}

impl ChannelButtons {
    pub fn new(rx: Receiver<Button>) -> Self {
        Self {
            rx,
            disconnected: false,
        }
    }

    /// Creates a connected sender/source pair.
    pub fn channel() -> (Sender<Button>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self::new(rx))
    }

    /// True once every sender has been dropped.
    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }
}

impl ButtonSource for ChannelButtons {
    fn poll(&mut self) -> Vec<Button> {
        let mut presses = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(button) => presses.push(button),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.disconnected {
                        tracing::debug!("Button channel closed");
                        self.disconnected = true;
                    }
                    break;
                }
            }
        }
        presses
    }
}

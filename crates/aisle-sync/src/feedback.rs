//! # Feedback Publisher
//!
//! The `Direction` key is shared by two unrelated signals: the basket's
//! `S`/`E` operation status and the drive controller's `F`/`B`/`L`/`R`/`S`
//! motion commands. Inside the engine they stay separate types
//! ([`OperationStatus`], [`MotionCommand`]); they meet only here, as a
//! [`DirectionSignal`] encoded to one character.
//!
//! Note that `S` means both "success" and "stop". The hardware reads it the
//! same way either way: halt and show green.

use tracing::debug;

use aisle_core::{DirectionSignal, MotionCommand, OperationStatus};

use crate::error::SyncResult;
use crate::topics::{StatusTopic, TopicBus};

#[derive(Clone)]
pub struct FeedbackPublisher {
    bus: TopicBus,
}

impl FeedbackPublisher {
    pub fn new(bus: TopicBus) -> Self {
        FeedbackPublisher { bus }
    }

    /// Reports the outcome of a basket transition.
    pub async fn publish_status(&self, status: OperationStatus) -> SyncResult<()> {
        self.publish(DirectionSignal::from(status)).await
    }

    /// Forwards a drive command to the wheels.
    pub async fn publish_motion(&self, command: MotionCommand) -> SyncResult<()> {
        self.publish(DirectionSignal::from(command)).await
    }

    async fn publish(&self, signal: DirectionSignal) -> SyncResult<()> {
        let c = signal.as_char();
        debug!(signal = ?signal, direction = %c, "Publishing Direction");
        self.bus.write::<StatusTopic>(&c).await
    }
}

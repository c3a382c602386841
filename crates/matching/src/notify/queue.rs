// Copyright 2025 itscheems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::time::Duration;

use barter_sdk::types::Notification;
use crossbeam::channel::{
	Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError, bounded,
};

/// Bounded queue between the orchestrator and the notification dispatcher
///
/// Properties:
/// - Multiple producers (one per concurrent matching run)
/// - Single consumer (the dispatcher thread)
/// - Bounded capacity; a full queue rejects instead of blocking
pub struct NotificationQueue {
	sender: Sender<Notification>,
	receiver: Receiver<Notification>,
}

impl NotificationQueue {
	pub fn new(capacity: usize) -> Self {
		let (sender, receiver) = bounded(capacity);
		Self { sender, receiver }
	}

	/// Split the queue into producer and consumer ends
	pub fn split(self) -> (NotificationProducer, NotificationConsumer) {
		(
			NotificationProducer {
				sender: self.sender,
			},
			NotificationConsumer {
				receiver: self.receiver,
			},
		)
	}
}

/// Producer end, cloned into every orchestrator
#[derive(Clone)]
pub struct NotificationProducer {
	sender: Sender<Notification>,
}

impl NotificationProducer {
	/// Enqueue a notification without blocking
	pub fn push(&self, notification: Notification) -> Result<(), NotificationQueueError> {
		self.sender.try_send(notification).map_err(|e| match e {
			TrySendError::Full(_) => NotificationQueueError::Full,
			TrySendError::Disconnected(_) => NotificationQueueError::Disconnected,
		})
	}

	pub fn len(&self) -> usize {
		self.sender.len()
	}

	pub fn is_empty(&self) -> bool {
		self.sender.is_empty()
	}
}

/// Consumer end, owned by the dispatcher
pub struct NotificationConsumer {
	receiver: Receiver<Notification>,
}

impl NotificationConsumer {
	pub fn try_recv(&self) -> Result<Notification, NotificationQueueError> {
		self.receiver.try_recv().map_err(|e| match e {
			TryRecvError::Empty => NotificationQueueError::Empty,
			TryRecvError::Disconnected => NotificationQueueError::Disconnected,
		})
	}

	/// Wait up to `timeout` for the next notification
	pub fn recv_timeout(&self, timeout: Duration) -> Result<Notification, NotificationQueueError> {
		self.receiver.recv_timeout(timeout).map_err(|e| match e {
			RecvTimeoutError::Timeout => NotificationQueueError::Empty,
			RecvTimeoutError::Disconnected => NotificationQueueError::Disconnected,
		})
	}

	/// Take everything currently queued
	pub fn drain(&self) -> Vec<Notification> {
		self.receiver.try_iter().collect()
	}
}

/// Errors that can occur when interacting with the notification queue
#[derive(Debug, thiserror::Error)]
pub enum NotificationQueueError {
	#[error("Notification queue is full")]
	Full,
	#[error("Notification queue is empty")]
	Empty,
	#[error("Notification queue disconnected")]
	Disconnected,
}

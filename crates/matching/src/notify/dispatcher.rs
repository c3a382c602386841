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

use std::{
	sync::{
		Arc,
		atomic::{AtomicBool, AtomicU64, Ordering},
	},
	thread::{self, JoinHandle},
	time::Duration,
};

use barter_sdk::types::Notification;
use tracing::{debug, info, warn};

use super::{NotificationConsumer, NotificationQueueError, Notifier};

/// Configuration for the notification dispatcher
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
	/// How long the dispatcher blocks waiting for work before checking shutdown
	pub poll_interval_ms: u64,
	/// Log every delivered notification
	pub verbose_logging: bool,
}

impl Default for DispatcherConfig {
	fn default() -> Self {
		Self {
			poll_interval_ms: 50,
			verbose_logging: false,
		}
	}
}

#[derive(Debug, Default)]
struct DispatchCounters {
	delivered: AtomicU64,
	failed: AtomicU64,
}

/// Notification Dispatcher - delivers queued notifications off the matching path
///
/// Runs in a dedicated thread, consuming from the notification queue and
/// handing each message to the notifier. Delivery failures are logged and
/// counted, never propagated: the matching result does not depend on them.
///
/// On shutdown, everything still queued is delivered before the thread exits.
pub struct NotificationDispatcher {
	thread_handle: Option<JoinHandle<()>>,
	shutdown: Arc<AtomicBool>,
	counters: Arc<DispatchCounters>,
}

impl NotificationDispatcher {
	/// Start the dispatcher thread
	pub fn start(
		consumer: NotificationConsumer,
		notifier: Arc<dyn Notifier>,
		config: DispatcherConfig,
	) -> std::io::Result<Self> {
		let shutdown = Arc::new(AtomicBool::new(false));
		let counters = Arc::new(DispatchCounters::default());

		let shutdown_clone = shutdown.clone();
		let counters_clone = counters.clone();

		let thread_handle = thread::Builder::new()
			.name("notification-dispatcher".to_string())
			.spawn(move || {
				info!(target: "notify", "Notification dispatcher started");
				Self::run_dispatch_loop(
					&consumer,
					notifier.as_ref(),
					&config,
					&shutdown_clone,
					&counters_clone,
				);
				info!(target: "notify", "Notification dispatcher stopped");
			})?;

		Ok(Self {
			thread_handle: Some(thread_handle),
			shutdown,
			counters,
		})
	}

	fn run_dispatch_loop(
		consumer: &NotificationConsumer,
		notifier: &dyn Notifier,
		config: &DispatcherConfig,
		shutdown: &AtomicBool,
		counters: &DispatchCounters,
	) {
		let poll = Duration::from_millis(config.poll_interval_ms);

		loop {
			match consumer.recv_timeout(poll) {
				Ok(notification) => Self::deliver(notifier, &notification, config, counters),
				Err(NotificationQueueError::Disconnected) => break,
				Err(NotificationQueueError::Empty) | Err(NotificationQueueError::Full) => {}
			}

			if shutdown.load(Ordering::Relaxed) {
				let remaining = consumer.drain();
				if !remaining.is_empty() {
					info!(
						target: "notify",
						remaining = remaining.len(),
						"Delivering queued notifications before shutdown"
					);
				}
				for notification in &remaining {
					Self::deliver(notifier, notification, config, counters);
				}
				break;
			}
		}
	}

	fn deliver(
		notifier: &dyn Notifier,
		notification: &Notification,
		config: &DispatcherConfig,
		counters: &DispatchCounters,
	) {
		match notifier.notify(notification) {
			Ok(()) => {
				counters.delivered.fetch_add(1, Ordering::Relaxed);
				if config.verbose_logging {
					debug!(
						target: "notify",
						user_id = %notification.user_id,
						title = %notification.title,
						"Notification delivered"
					);
				}
			}
			Err(e) => {
				counters.failed.fetch_add(1, Ordering::Relaxed);
				warn!(
					target: "notify",
					user_id = %notification.user_id,
					title = %notification.title,
					error = %e,
					"Failed to deliver notification"
				);
			}
		}
	}

	/// Notifications handed to the notifier successfully
	pub fn delivered(&self) -> u64 {
		self.counters.delivered.load(Ordering::Relaxed)
	}

	/// Notifications the notifier rejected
	pub fn failed(&self) -> u64 {
		self.counters.failed.load(Ordering::Relaxed)
	}

	/// Stop the dispatcher after delivering everything already queued
	pub fn shutdown(mut self) {
		info!(target: "notify", "Shutting down notification dispatcher");
		self.stop();
	}

	fn stop(&mut self) {
		self.shutdown.store(true, Ordering::Relaxed);
		if let Some(handle) = self.thread_handle.take()
			&& let Err(e) = handle.join()
		{
			warn!(target: "notify", error = ?e, "Notification dispatcher thread panicked");
		}
	}
}

impl Drop for NotificationDispatcher {
	fn drop(&mut self) {
		self.stop();
	}
}

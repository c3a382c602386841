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

mod dispatcher;
mod queue;

use barter_sdk::types::{NOTIFICATION_KIND_MATCH, Notification};
use thiserror::Error;
use tracing::info;

pub use dispatcher::{DispatcherConfig, NotificationDispatcher};
pub use queue::{NotificationConsumer, NotificationProducer, NotificationQueue, NotificationQueueError};

/// Error types for notification delivery
#[derive(Debug, Error)]
pub enum NotifyError {
	#[error("Failed to deliver notification to {user_id}: {reason}")]
	DeliveryFailed { user_id: String, reason: String },
	#[error("Notifier unavailable: {0}")]
	Unavailable(String),
}

/// Notifier trait - delivery seam for user-facing messages
///
/// Invoked from the dispatcher thread only, never on the matching path.
/// A failed delivery is logged by the dispatcher and not retried.
pub trait Notifier: Send + Sync {
	fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Notifier writing every message to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
	fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
		info!(
			target: "notify",
			user_id = %notification.user_id,
			kind = %notification.kind,
			title = %notification.title,
			link = %notification.link,
			"{}",
			notification.message
		);
		Ok(())
	}
}

/// Link to a party's page
pub fn party_link(party_id: &str) -> String {
	format!("/trade-parties/{}", party_id)
}

/// Participant message after a successful preview
pub fn matches_found(user_id: &str, party_id: &str, party_name: &str) -> Notification {
	Notification {
		user_id: user_id.to_string(),
		kind: NOTIFICATION_KIND_MATCH.to_string(),
		title: "Trade Matches Found!".to_string(),
		message: format!(
			"The trade party \"{}\" has been matched. Review your proposed trades before they are finalized.",
			party_name
		),
		link: party_link(party_id),
	}
}

/// Organizer summary after a successful preview
pub fn matching_complete(
	user_id: &str,
	party_id: &str,
	party_name: &str,
	trades: usize,
	chains: usize,
) -> Notification {
	Notification {
		user_id: user_id.to_string(),
		kind: NOTIFICATION_KIND_MATCH.to_string(),
		title: "Matching Complete".to_string(),
		message: format!(
			"Matching for \"{}\" found {} trades in {} chains. Review the preview and finalize when ready.",
			party_name, trades, chains
		),
		link: party_link(party_id),
	}
}

/// Participant message after finalize
pub fn matches_finalized(user_id: &str, party_id: &str, party_name: &str) -> Notification {
	Notification {
		user_id: user_id.to_string(),
		kind: NOTIFICATION_KIND_MATCH.to_string(),
		title: "Trade Matches Finalized!".to_string(),
		message: format!(
			"The trades for \"{}\" are final. Time to ship your items!",
			party_name
		),
		link: party_link(party_id),
	}
}

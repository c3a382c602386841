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

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for model validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
	#[error("Submission {0} wants itself")]
	SelfWant(String),
	#[error("Preference rank must be at least 1, got {0}")]
	InvalidRank(u32),
	#[error("Submission {0} has an empty id or owner")]
	MissingIdentity(String),
}

/// An item a user has offered into a trade party
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
	/// Stable unique identifier within one matching run
	pub id: String,
	/// Display title (free text, sanitized before encoding)
	pub title: String,
	/// Owning user
	pub user_id: String,
}

impl Submission {
	pub fn new(id: impl Into<String>, title: impl Into<String>, user_id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			title: title.into(),
			user_id: user_id.into(),
		}
	}

	pub fn validate(&self) -> Result<(), ModelError> {
		if self.id.trim().is_empty() || self.user_id.trim().is_empty() {
			return Err(ModelError::MissingIdentity(self.id.clone()));
		}
		Ok(())
	}
}

/// A ranked preference: the owner of `offered_submission_id` would give it
/// in exchange for `wanted_submission_id`.
///
/// The owning user is always derived from the offered submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WantEdge {
	pub offered_submission_id: String,
	pub wanted_submission_id: String,
	/// 1 = most preferred. Equal ranks carry equal weight.
	pub rank: u32,
}

impl WantEdge {
	pub fn new(offered: impl Into<String>, wanted: impl Into<String>, rank: u32) -> Self {
		Self {
			offered_submission_id: offered.into(),
			wanted_submission_id: wanted.into(),
			rank,
		}
	}

	pub fn validate(&self) -> Result<(), ModelError> {
		if self.offered_submission_id == self.wanted_submission_id {
			return Err(ModelError::SelfWant(self.offered_submission_id.clone()));
		}
		if self.rank == 0 {
			return Err(ModelError::InvalidRank(self.rank));
		}
		Ok(())
	}
}

/// Trade status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
	Pending,
	Accepted,
}

/// One edge of a realized chain: a submission moving from a giving user to
/// a receiving user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
	pub giving_submission_id: String,
	/// Same item as `giving_submission_id`, kept separately to mirror the
	/// decoded line shape
	pub receiving_submission_id: String,
	pub giving_user_id: String,
	pub receiving_user_id: String,
	/// Synthetic chain identifier, assigned once the trade is persisted
	pub chain_id: Option<String>,
	/// 1-based position within the chain
	pub position: usize,
	pub status: TradeStatus,
}

impl Trade {
	/// A dummy placeholder models a user keeping their own item
	pub fn is_self_trade(&self) -> bool {
		self.giving_user_id == self.receiving_user_id
	}
}

/// A cyclic sequence of trades discovered for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeChain {
	/// 1-based, in discovery order
	pub chain_number: usize,
	pub trades: Vec<Trade>,
	/// User ids on either side of any trade, first-appearance order
	pub participants: Vec<String>,
}

impl TradeChain {
	pub fn new(chain_number: usize) -> Self {
		Self {
			chain_number,
			trades: Vec::new(),
			participants: Vec::new(),
		}
	}

	pub fn len(&self) -> usize {
		self.trades.len()
	}

	pub fn is_empty(&self) -> bool {
		self.trades.is_empty()
	}

	/// Append a trade and record both of its users as participants
	pub fn push_trade(&mut self, mut trade: Trade) {
		trade.position = self.trades.len() + 1;
		for user in [&trade.receiving_user_id, &trade.giving_user_id] {
			if !self.participants.iter().any(|p| p == user) {
				self.participants.push(user.clone());
			}
		}
		self.trades.push(trade);
	}
}

/// Aggregate statistics over one engine output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStats {
	pub total_trades: usize,
	pub total_chains: usize,
	pub longest_chain: usize,
}

/// Trade party lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyStatus {
	AcceptingSubmissions,
	MatchingPreview,
	Execution,
	/// Terminal and absorbing
	Cancelled,
}

impl PartyStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			PartyStatus::AcceptingSubmissions => "accepting_submissions",
			PartyStatus::MatchingPreview => "matching_preview",
			PartyStatus::Execution => "execution",
			PartyStatus::Cancelled => "cancelled",
		}
	}

	/// Whether a preview run may start from this status
	pub fn allows_preview(&self) -> bool {
		matches!(
			self,
			PartyStatus::AcceptingSubmissions | PartyStatus::MatchingPreview
		)
	}
}

impl fmt::Display for PartyStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A trade party
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
	pub id: String,
	pub name: String,
	pub organizer_id: String,
	pub status: PartyStatus,
	#[serde(default)]
	pub matching_preview_at: Option<DateTime<Utc>>,
	#[serde(default)]
	pub matching_finalized_at: Option<DateTime<Utc>>,
}

impl Party {
	pub fn new(id: impl Into<String>, name: impl Into<String>, organizer_id: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			name: name.into(),
			organizer_id: organizer_id.into(),
			status: PartyStatus::AcceptingSubmissions,
			matching_preview_at: None,
			matching_finalized_at: None,
		}
	}
}

/// Persisted state of a match record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordState {
	/// Preview, replaced by the next run
	Draft,
	/// Committed by finalize
	Final,
}

/// A persisted trade belonging to one party's chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
	pub id: String,
	pub party_id: String,
	/// `{party_id}_chain_{n}`
	pub chain_id: String,
	/// 1-based
	pub chain_position: usize,
	pub trade: Trade,
	pub state: RecordState,
}

impl MatchRecord {
	pub fn chain_id_for(party_id: &str, chain_number: usize) -> String {
		format!("{}_chain_{}", party_id, chain_number)
	}

	pub fn is_draft(&self) -> bool {
		self.state == RecordState::Draft
	}
}

/// Kind tag carried by notifications
pub const NOTIFICATION_KIND_MATCH: &str = "trade_party_match";

/// A message for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
	pub user_id: String,
	pub kind: String,
	pub title: String,
	pub message: String,
	pub link: String,
}

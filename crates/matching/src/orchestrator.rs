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

//! Matching orchestrator driving the preview / finalize lifecycle
//!
//! ```text
//! AcceptingSubmissions --preview--> MatchingPreview --finalize--> Execution
//!                                     |        ^
//!                                     +preview-+
//! any state except Execution --cancel--> Cancelled
//! ```
//!
//! A preview replaces the party's draft generation; finalize flips drafts to
//! final without re-optimizing. Runs for the same party are serialized.

use std::{
	collections::HashSet,
	fmt,
	sync::{Arc, Mutex},
	time::Instant,
};

use barter_sdk::types::{
	MatchRecord, Notification, PartyStatus, RecordState, Submission, WantEdge,
};
use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
	config::MatchingConfig,
	decoder,
	encoder::{self, EncoderOptions},
	engine::{Engine, EngineError},
	notify::{self, NotificationProducer},
	store::{MatchStore, StoreError},
};

/// Why a run had nothing to match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
	NoSubmissions,
	NoWantEdges,
}

impl fmt::Display for EmptyReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			EmptyReason::NoSubmissions => "no eligible submissions",
			EmptyReason::NoWantEdges => "no want-list entries",
		})
	}
}

/// Store interaction that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
	LoadParty,
	LoadSubmissions,
	LoadWantEdges,
	ClearDrafts,
	PersistDrafts,
	UpdateStatus,
	LoadDrafts,
	FinalizeDrafts,
}

impl fmt::Display for Stage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Stage::LoadParty => "loading party",
			Stage::LoadSubmissions => "loading submissions",
			Stage::LoadWantEdges => "loading want-lists",
			Stage::ClearDrafts => "clearing draft matches",
			Stage::PersistDrafts => "persisting draft matches",
			Stage::UpdateStatus => "updating party status",
			Stage::LoadDrafts => "loading draft matches",
			Stage::FinalizeDrafts => "finalizing draft matches",
		})
	}
}

/// Lifecycle operation requested on a party
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
	Preview,
	Finalize,
	Cancel,
}

impl fmt::Display for Operation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Operation::Preview => "preview",
			Operation::Finalize => "finalize",
			Operation::Cancel => "cancel",
		})
	}
}

/// Error types for orchestrated matching runs
#[derive(Debug, Error)]
pub enum MatchingError {
	#[error("Party {party_id} has nothing to match: {reason}")]
	EmptyInput { party_id: String, reason: EmptyReason },
	#[error("Optimization failed for party {party_id}: {source}")]
	Engine {
		party_id: String,
		source: EngineError,
	},
	#[error("Store failure for party {party_id} while {stage}: {source}")]
	Store {
		party_id: String,
		stage: Stage,
		source: StoreError,
	},
	#[error("Party {party_id} has no draft matches to finalize")]
	NoDraftsToFinalize { party_id: String },
	#[error("Cannot {operation} party {party_id} in status {from}")]
	InvalidTransition {
		party_id: String,
		from: PartyStatus,
		operation: Operation,
	},
}

fn store_error(party_id: &str, stage: Stage) -> impl FnOnce(StoreError) -> MatchingError + '_ {
	move |source| {
		error!(
			target: "orchestrator",
			party_id,
			stage = %stage,
			error = %source,
			"Store operation failed"
		);
		MatchingError::Store {
			party_id: party_id.to_string(),
			stage,
			source,
		}
	}
}

/// Outcome of a preview run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
	pub party_id: String,
	/// Draft records written
	pub match_count: usize,
	pub chain_count: usize,
	pub longest_chain: usize,
	/// Distinct users in any chain
	pub participants: Vec<String>,
	/// Trades skipped because their submission could not be resolved
	pub unresolved_trades: usize,
	pub engine_input: String,
	pub engine_output: String,
}

/// Outcome of finalize
#[derive(Debug, Clone, Serialize)]
pub struct FinalizeSummary {
	pub party_id: String,
	pub finalized: usize,
	pub chain_count: usize,
	pub participants: Vec<String>,
}

/// Outcome of cancel
#[derive(Debug, Clone, Serialize)]
pub struct CancelSummary {
	pub party_id: String,
	pub removed_drafts: usize,
}

/// Matching Orchestrator - the lifecycle boundary of a trade party
///
/// Loads a party's submissions and want-lists from the store, runs them
/// through encoder, engine and decoder, persists the resulting chains as
/// draft records and enqueues notifications. Holds no state across runs
/// besides the per-party locks.
pub struct MatchingOrchestrator {
	store: Arc<dyn MatchStore>,
	notifications: NotificationProducer,
	config: MatchingConfig,
	engine: Engine,
	party_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl MatchingOrchestrator {
	pub fn new(
		store: Arc<dyn MatchStore>,
		notifications: NotificationProducer,
		config: MatchingConfig,
	) -> Self {
		let engine = Engine::new(config.engine.clone());
		Self {
			store,
			notifications,
			config,
			engine,
			party_locks: DashMap::new(),
		}
	}

	pub fn config(&self) -> &MatchingConfig {
		&self.config
	}

	/// Run `f` while holding the party's lock
	///
	/// The lock entry is dropped again once no other run holds or waits on
	/// it, so the map only holds parties with runs in flight.
	fn serialized<T>(&self, party_id: &str, f: impl FnOnce() -> T) -> T {
		let lock = self
			.party_locks
			.entry(party_id.to_string())
			.or_default()
			.clone();

		let result = {
			let _guard = lock.lock().unwrap();
			f()
		};

		drop(lock);
		self.party_locks
			.remove_if(party_id, |_, lock| Arc::strong_count(lock) == 1);
		result
	}

	/// Compute a fresh draft generation of matches for the party
	///
	/// An engine failure leaves the store untouched. A store failure after
	/// the drafts were cleared is not rolled back; re-running is the
	/// recovery path.
	pub fn run_preview(&self, party_id: &str) -> Result<RunSummary, MatchingError> {
		self.serialized(party_id, || self.preview_locked(party_id))
	}

	/// Commit the current draft generation
	pub fn finalize(&self, party_id: &str) -> Result<FinalizeSummary, MatchingError> {
		self.serialized(party_id, || self.finalize_locked(party_id))
	}

	/// Discard drafts and move the party to the terminal cancelled state
	pub fn cancel(&self, party_id: &str) -> Result<CancelSummary, MatchingError> {
		self.serialized(party_id, || self.cancel_locked(party_id))
	}

	fn preview_locked(&self, party_id: &str) -> Result<RunSummary, MatchingError> {
		let started = Instant::now();

		let party = self
			.store
			.party(party_id)
			.map_err(store_error(party_id, Stage::LoadParty))?;
		if !party.status.allows_preview() {
			return Err(MatchingError::InvalidTransition {
				party_id: party_id.to_string(),
				from: party.status,
				operation: Operation::Preview,
			});
		}

		let submissions = self
			.store
			.eligible_submissions(party_id)
			.map_err(store_error(party_id, Stage::LoadSubmissions))?;
		let submissions = Self::usable_submissions(party_id, submissions);
		if submissions.is_empty() {
			return Err(MatchingError::EmptyInput {
				party_id: party_id.to_string(),
				reason: EmptyReason::NoSubmissions,
			});
		}

		let want_edges = self
			.store
			.want_edges(party_id)
			.map_err(store_error(party_id, Stage::LoadWantEdges))?;
		let want_edges = Self::usable_edges(party_id, &submissions, want_edges);
		if want_edges.is_empty() {
			return Err(MatchingError::EmptyInput {
				party_id: party_id.to_string(),
				reason: EmptyReason::NoWantEdges,
			});
		}

		info!(
			target: "orchestrator",
			party_id,
			submissions = submissions.len(),
			want_edges = want_edges.len(),
			"Starting matching run"
		);

		let engine_input = encoder::encode(
			&submissions,
			&want_edges,
			&EncoderOptions::from(&self.config.engine),
		);

		let mut output = Vec::new();
		let solution = self.engine.run(&engine_input, &mut output).map_err(|source| {
			error!(
				target: "orchestrator",
				party_id,
				error = %source,
				"Optimization failed, discarding engine output"
			);
			MatchingError::Engine {
				party_id: party_id.to_string(),
				source,
			}
		})?;
		let engine_output = String::from_utf8_lossy(&output).into_owned();

		let decoded = decoder::decode(&engine_output, &submissions);
		if decoded.trade_count() != solution.trade_count {
			warn!(
				target: "orchestrator",
				party_id,
				decoded = decoded.trade_count(),
				optimized = solution.trade_count,
				"Decoded trade count differs from engine result"
			);
		}

		let removed = self
			.store
			.delete_unfinalized(party_id)
			.map_err(store_error(party_id, Stage::ClearDrafts))?;
		if removed > 0 {
			debug!(target: "orchestrator", party_id, removed, "Cleared previous draft matches");
		}

		let mut match_count = 0;
		for chain in &decoded.chains {
			let chain_id = MatchRecord::chain_id_for(party_id, chain.chain_number);
			for trade in &chain.trades {
				let mut trade = trade.clone();
				trade.chain_id = Some(chain_id.clone());

				let record = MatchRecord {
					id: Uuid::new_v4().to_string(),
					party_id: party_id.to_string(),
					chain_id: chain_id.clone(),
					chain_position: trade.position,
					trade,
					state: RecordState::Draft,
				};

				if self.config.verbose_logging {
					debug!(
						target: "orchestrator",
						party_id,
						chain_id = %record.chain_id,
						position = record.chain_position,
						submission_id = %record.trade.giving_submission_id,
						from = %record.trade.giving_user_id,
						to = %record.trade.receiving_user_id,
						"Persisting draft match"
					);
				}

				self.store
					.insert_match(record)
					.map_err(store_error(party_id, Stage::PersistDrafts))?;
				match_count += 1;
			}
		}

		self.store
			.update_party_status(party_id, PartyStatus::MatchingPreview, Utc::now())
			.map_err(store_error(party_id, Stage::UpdateStatus))?;

		let participants = decoded.participants();
		for user_id in &participants {
			self.enqueue(notify::matches_found(user_id, party_id, &party.name));
		}
		self.enqueue(notify::matching_complete(
			&party.organizer_id,
			party_id,
			&party.name,
			match_count,
			decoded.chains.len(),
		));

		info!(
			target: "orchestrator",
			party_id,
			matches = match_count,
			chains = decoded.chains.len(),
			longest_chain = decoded.stats.longest_chain,
			participants = participants.len(),
			unresolved = decoded.unresolved,
			elapsed_ms = started.elapsed().as_millis(),
			"Matching preview complete"
		);

		Ok(RunSummary {
			party_id: party_id.to_string(),
			match_count,
			chain_count: decoded.chains.len(),
			longest_chain: decoded.stats.longest_chain,
			participants,
			unresolved_trades: decoded.unresolved,
			engine_input,
			engine_output,
		})
	}

	fn finalize_locked(&self, party_id: &str) -> Result<FinalizeSummary, MatchingError> {
		let party = self
			.store
			.party(party_id)
			.map_err(store_error(party_id, Stage::LoadParty))?;
		if party.status != PartyStatus::MatchingPreview {
			return Err(MatchingError::InvalidTransition {
				party_id: party_id.to_string(),
				from: party.status,
				operation: Operation::Finalize,
			});
		}

		let drafts = self
			.store
			.matches(party_id, RecordState::Draft)
			.map_err(store_error(party_id, Stage::LoadDrafts))?;
		if drafts.is_empty() {
			return Err(MatchingError::NoDraftsToFinalize {
				party_id: party_id.to_string(),
			});
		}

		for record in &drafts {
			self.store
				.finalize_match(&record.id)
				.map_err(store_error(party_id, Stage::FinalizeDrafts))?;
		}

		self.store
			.update_party_status(party_id, PartyStatus::Execution, Utc::now())
			.map_err(store_error(party_id, Stage::UpdateStatus))?;

		let mut participants: Vec<String> = Vec::new();
		for record in &drafts {
			for user in [&record.trade.receiving_user_id, &record.trade.giving_user_id] {
				if !participants.contains(user) {
					participants.push(user.clone());
				}
			}
		}
		for user_id in &participants {
			self.enqueue(notify::matches_finalized(user_id, party_id, &party.name));
		}

		let chain_count = drafts
			.iter()
			.map(|r| r.chain_id.as_str())
			.collect::<HashSet<_>>()
			.len();

		info!(
			target: "orchestrator",
			party_id,
			finalized = drafts.len(),
			chains = chain_count,
			"Matches finalized"
		);

		Ok(FinalizeSummary {
			party_id: party_id.to_string(),
			finalized: drafts.len(),
			chain_count,
			participants,
		})
	}

	fn cancel_locked(&self, party_id: &str) -> Result<CancelSummary, MatchingError> {
		let party = self
			.store
			.party(party_id)
			.map_err(store_error(party_id, Stage::LoadParty))?;
		if party.status == PartyStatus::Execution {
			return Err(MatchingError::InvalidTransition {
				party_id: party_id.to_string(),
				from: party.status,
				operation: Operation::Cancel,
			});
		}

		let removed_drafts = self
			.store
			.delete_unfinalized(party_id)
			.map_err(store_error(party_id, Stage::ClearDrafts))?;
		self.store
			.update_party_status(party_id, PartyStatus::Cancelled, Utc::now())
			.map_err(store_error(party_id, Stage::UpdateStatus))?;

		info!(target: "orchestrator", party_id, removed_drafts, "Party cancelled");

		Ok(CancelSummary {
			party_id: party_id.to_string(),
			removed_drafts,
		})
	}

	/// Drop submissions the engine input cannot represent
	fn usable_submissions(party_id: &str, submissions: Vec<Submission>) -> Vec<Submission> {
		submissions
			.into_iter()
			.filter(|submission| {
				if let Err(e) = submission.validate() {
					warn!(target: "orchestrator", party_id, error = %e, "Skipping invalid submission");
					return false;
				}
				if encoder::sanitize_title(&submission.title).is_empty() {
					warn!(
						target: "orchestrator",
						party_id,
						submission_id = %submission.id,
						"Skipping submission whose title is empty after sanitization"
					);
					return false;
				}
				true
			})
			.collect()
	}

	/// Keep edges between eligible submissions, most preferred first
	///
	/// The sort is stable, so equal ranks keep store order.
	fn usable_edges(party_id: &str, submissions: &[Submission], edges: Vec<WantEdge>) -> Vec<WantEdge> {
		let eligible: HashSet<&str> = submissions.iter().map(|s| s.id.as_str()).collect();

		let mut usable: Vec<WantEdge> = edges
			.into_iter()
			.filter(|edge| {
				if let Err(e) = edge.validate() {
					warn!(target: "orchestrator", party_id, error = %e, "Skipping invalid want-list entry");
					return false;
				}
				let known = eligible.contains(edge.offered_submission_id.as_str())
					&& eligible.contains(edge.wanted_submission_id.as_str());
				if !known {
					warn!(
						target: "orchestrator",
						party_id,
						offered = %edge.offered_submission_id,
						wanted = %edge.wanted_submission_id,
						"Skipping want-list entry referencing an ineligible submission"
					);
				}
				known
			})
			.collect();

		usable.sort_by_key(|edge| edge.rank);
		usable
	}

	fn enqueue(&self, notification: Notification) {
		let user_id = notification.user_id.clone();
		if let Err(e) = self.notifications.push(notification) {
			warn!(
				target: "orchestrator",
				user_id = %user_id,
				error = %e,
				"Failed to enqueue notification"
			);
		}
	}
}

#[cfg(test)]
mod tests {
	use barter_sdk::types::Party;

	use super::*;
	use crate::{
		notify::{NotificationConsumer, NotificationQueue},
		store::MemoryMatchStore,
	};

	fn setup() -> (Arc<MemoryMatchStore>, MatchingOrchestrator, NotificationConsumer) {
		let store = Arc::new(MemoryMatchStore::new());
		store.insert_party(Party::new("p1", "Spring Swap", "org"));
		store.insert_submission("p1", Submission::new("sub1", "Wingspan", "alice"));
		store.insert_submission("p1", Submission::new("sub2", "Azul", "bob"));
		store.insert_want_edge("p1", WantEdge::new("sub1", "sub2", 1));
		store.insert_want_edge("p1", WantEdge::new("sub2", "sub1", 1));

		let (producer, consumer) = NotificationQueue::new(64).split();
		let orchestrator = MatchingOrchestrator::new(store.clone(), producer, MatchingConfig::default());
		(store, orchestrator, consumer)
	}

	#[test]
	fn test_preview_persists_drafts_and_notifies() {
		let (store, orchestrator, consumer) = setup();

		let summary = orchestrator.run_preview("p1").unwrap();
		assert_eq!(summary.match_count, 2);
		assert_eq!(summary.chain_count, 1);
		assert_eq!(summary.longest_chain, 2);

		let drafts = store.matches("p1", RecordState::Draft).unwrap();
		assert_eq!(drafts.len(), 2);
		assert!(drafts.iter().all(|r| r.chain_id == "p1_chain_1"));

		let party = store.party("p1").unwrap();
		assert_eq!(party.status, PartyStatus::MatchingPreview);
		assert!(party.matching_preview_at.is_some());

		let notifications = consumer.drain();
		assert_eq!(notifications.len(), 3);
		assert_eq!(notifications.last().unwrap().user_id, "org");
		assert_eq!(notifications.last().unwrap().title, "Matching Complete");
	}

	#[test]
	fn test_finalize_requires_preview() {
		let (_store, orchestrator, _consumer) = setup();
		let err = orchestrator.finalize("p1").unwrap_err();
		assert!(matches!(
			err,
			MatchingError::InvalidTransition {
				operation: Operation::Finalize,
				from: PartyStatus::AcceptingSubmissions,
				..
			}
		));
	}

	#[test]
	fn test_cancel_then_preview_rejected() {
		let (store, orchestrator, _consumer) = setup();
		orchestrator.run_preview("p1").unwrap();

		let cancelled = orchestrator.cancel("p1").unwrap();
		assert_eq!(cancelled.removed_drafts, 2);
		assert!(store.records("p1").is_empty());

		let err = orchestrator.run_preview("p1").unwrap_err();
		assert!(matches!(err, MatchingError::InvalidTransition { operation: Operation::Preview, .. }));
	}

	#[test]
	fn test_ineligible_wanted_submission_is_skipped() {
		let (store, orchestrator, _consumer) = setup();
		store.insert_submission("p1", Submission::new("sub3", "Root", "carol"));
		store.insert_want_edge("p1", WantEdge::new("sub3", "sub1", 1));
		store.insert_want_edge("p1", WantEdge::new("sub1", "sub3", 2));
		store.withdraw_submission("p1", "sub3").unwrap();

		let summary = orchestrator.run_preview("p1").unwrap();
		assert_eq!(summary.match_count, 2);
		assert!(!summary.engine_input.contains("sub3"));
	}

	#[test]
	fn test_submission_with_unusable_title_is_skipped() {
		let (store, orchestrator, _consumer) = setup();
		store.insert_submission("p1", Submission::new("sub3", " ( ) ", "carol"));
		store.insert_want_edge("p1", WantEdge::new("sub3", "sub1", 1));
		store.insert_want_edge("p1", WantEdge::new("sub1", "sub3", 1));

		let summary = orchestrator.run_preview("p1").unwrap();
		assert_eq!(summary.match_count, 2);
		assert!(!summary.engine_input.contains("sub3"));
		assert!(!summary.participants.contains(&"carol".to_string()));
	}

	#[test]
	fn test_party_locks_released_after_runs() {
		let (_store, orchestrator, _consumer) = setup();

		orchestrator.run_preview("p1").unwrap();
		assert!(orchestrator.party_locks.is_empty());

		orchestrator.finalize("ghost").unwrap_err();
		orchestrator.finalize("p1").unwrap();
		assert!(orchestrator.party_locks.is_empty());
	}

	#[test]
	fn test_error_messages() {
		let err = MatchingError::Store {
			party_id: "p1".to_string(),
			stage: Stage::PersistDrafts,
			source: StoreError::Unavailable("disk full".to_string()),
		};
		assert_eq!(
			err.to_string(),
			"Store failure for party p1 while persisting draft matches: Store unavailable: disk full"
		);

		let err = MatchingError::EmptyInput {
			party_id: "p1".to_string(),
			reason: EmptyReason::NoWantEdges,
		};
		assert_eq!(err.to_string(), "Party p1 has nothing to match: no want-list entries");
	}
}

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

mod memory;

use barter_sdk::types::{MatchRecord, Party, PartyStatus, RecordState, Submission, WantEdge};
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use memory::MemoryMatchStore;

/// Error types for match store operations
#[derive(Debug, Error)]
pub enum StoreError {
	#[error("Not found: {0}")]
	NotFound(String),
	#[error("Record already exists: {0}")]
	Duplicate(String),
	#[error("Store unavailable: {0}")]
	Unavailable(String),
}

/// Match Store trait - persistence seam of the orchestrator
///
/// The store owns parties, the eligible submissions and want-edges of each
/// party, and the match records produced by matching runs. A record is
/// either a draft (replaced by the next preview) or final (committed by
/// finalize and never deleted by a re-run).
///
/// Key semantic constraints:
/// - `eligible_submissions` returns only submissions allowed to trade
/// - `want_edges` returns only edges whose offering submission is eligible
/// - `delete_unfinalized` never touches final records
/// - `finalize_match` flips one record to final and accepts its trade
///
/// This abstraction is implementation-agnostic: it can be backed by
/// in-memory structures or any external database.
pub trait MatchStore: Send + Sync {
	/// Load a party by id
	fn party(&self, party_id: &str) -> Result<Party, StoreError>;

	/// Load the submissions eligible for matching
	fn eligible_submissions(&self, party_id: &str) -> Result<Vec<Submission>, StoreError>;

	/// Load want-edges between the party's eligible submissions
	fn want_edges(&self, party_id: &str) -> Result<Vec<WantEdge>, StoreError>;

	/// Delete all draft records of the party, returning how many were removed
	fn delete_unfinalized(&self, party_id: &str) -> Result<usize, StoreError>;

	/// Persist one match record
	fn insert_match(&self, record: MatchRecord) -> Result<(), StoreError>;

	/// Load the party's records in the given state, in insertion order
	fn matches(&self, party_id: &str, state: RecordState) -> Result<Vec<MatchRecord>, StoreError>;

	/// Mark a record final and its trade accepted
	fn finalize_match(&self, record_id: &str) -> Result<(), StoreError>;

	/// Move the party to `status`, stamping the matching timestamp it implies
	fn update_party_status(
		&self,
		party_id: &str,
		status: PartyStatus,
		at: DateTime<Utc>,
	) -> Result<(), StoreError>;
}

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
	collections::{HashMap, HashSet},
	sync::Mutex,
};

use barter_sdk::types::{
	MatchRecord, Party, PartyStatus, RecordState, Submission, TradeStatus, WantEdge,
};
use chrono::{DateTime, Utc};

use super::{MatchStore, StoreError};

#[derive(Debug, Clone)]
struct SubmissionEntry {
	submission: Submission,
	eligible: bool,
}

/// In-memory implementation of the match store
///
/// Non-persistent and suitable for tests, benchmarks and the CLI.
/// Characteristics:
/// - No durability guarantees
/// - Records kept in insertion order
/// - Each collection behind its own mutex
pub struct MemoryMatchStore {
	parties: Mutex<HashMap<String, Party>>,
	/// Submissions per party, insertion order
	submissions: Mutex<HashMap<String, Vec<SubmissionEntry>>>,
	want_edges: Mutex<HashMap<String, Vec<WantEdge>>>,
	records: Mutex<Vec<MatchRecord>>,
}

impl MemoryMatchStore {
	pub fn new() -> Self {
		Self {
			parties: Mutex::new(HashMap::new()),
			submissions: Mutex::new(HashMap::new()),
			want_edges: Mutex::new(HashMap::new()),
			records: Mutex::new(Vec::new()),
		}
	}

	pub fn insert_party(&self, party: Party) {
		self.parties.lock().unwrap().insert(party.id.clone(), party);
	}

	/// Add an eligible submission to a party
	pub fn insert_submission(&self, party_id: &str, submission: Submission) {
		self.submissions
			.lock()
			.unwrap()
			.entry(party_id.to_string())
			.or_default()
			.push(SubmissionEntry {
				submission,
				eligible: true,
			});
	}

	/// Exclude a submission from future runs
	pub fn withdraw_submission(&self, party_id: &str, submission_id: &str) -> Result<(), StoreError> {
		let mut submissions = self.submissions.lock().unwrap();
		let entry = submissions
			.get_mut(party_id)
			.and_then(|entries| entries.iter_mut().find(|e| e.submission.id == submission_id))
			.ok_or_else(|| StoreError::NotFound(format!("submission {}", submission_id)))?;
		entry.eligible = false;
		Ok(())
	}

	pub fn insert_want_edge(&self, party_id: &str, edge: WantEdge) {
		self.want_edges
			.lock()
			.unwrap()
			.entry(party_id.to_string())
			.or_default()
			.push(edge);
	}

	/// All records of a party regardless of state
	pub fn records(&self, party_id: &str) -> Vec<MatchRecord> {
		self.records
			.lock()
			.unwrap()
			.iter()
			.filter(|r| r.party_id == party_id)
			.cloned()
			.collect()
	}
}

impl Default for MemoryMatchStore {
	fn default() -> Self {
		Self::new()
	}
}

impl MatchStore for MemoryMatchStore {
	fn party(&self, party_id: &str) -> Result<Party, StoreError> {
		self.parties
			.lock()
			.unwrap()
			.get(party_id)
			.cloned()
			.ok_or_else(|| StoreError::NotFound(format!("party {}", party_id)))
	}

	fn eligible_submissions(&self, party_id: &str) -> Result<Vec<Submission>, StoreError> {
		Ok(self
			.submissions
			.lock()
			.unwrap()
			.get(party_id)
			.map(|entries| {
				entries
					.iter()
					.filter(|e| e.eligible)
					.map(|e| e.submission.clone())
					.collect()
			})
			.unwrap_or_default())
	}

	fn want_edges(&self, party_id: &str) -> Result<Vec<WantEdge>, StoreError> {
		let eligible: HashSet<String> = self
			.eligible_submissions(party_id)?
			.into_iter()
			.map(|s| s.id)
			.collect();

		Ok(self
			.want_edges
			.lock()
			.unwrap()
			.get(party_id)
			.map(|edges| {
				edges
					.iter()
					.filter(|e| {
						eligible.contains(&e.offered_submission_id) && !e.wanted_submission_id.is_empty()
					})
					.cloned()
					.collect()
			})
			.unwrap_or_default())
	}

	fn delete_unfinalized(&self, party_id: &str) -> Result<usize, StoreError> {
		let mut records = self.records.lock().unwrap();
		let before = records.len();
		records.retain(|r| !(r.party_id == party_id && r.is_draft()));
		Ok(before - records.len())
	}

	fn insert_match(&self, record: MatchRecord) -> Result<(), StoreError> {
		let mut records = self.records.lock().unwrap();
		if records.iter().any(|r| r.id == record.id) {
			return Err(StoreError::Duplicate(record.id));
		}
		records.push(record);
		Ok(())
	}

	fn matches(&self, party_id: &str, state: RecordState) -> Result<Vec<MatchRecord>, StoreError> {
		Ok(self
			.records
			.lock()
			.unwrap()
			.iter()
			.filter(|r| r.party_id == party_id && r.state == state)
			.cloned()
			.collect())
	}

	fn finalize_match(&self, record_id: &str) -> Result<(), StoreError> {
		let mut records = self.records.lock().unwrap();
		let record = records
			.iter_mut()
			.find(|r| r.id == record_id)
			.ok_or_else(|| StoreError::NotFound(format!("match record {}", record_id)))?;
		record.state = RecordState::Final;
		record.trade.status = TradeStatus::Accepted;
		Ok(())
	}

	fn update_party_status(
		&self,
		party_id: &str,
		status: PartyStatus,
		at: DateTime<Utc>,
	) -> Result<(), StoreError> {
		let mut parties = self.parties.lock().unwrap();
		let party = parties
			.get_mut(party_id)
			.ok_or_else(|| StoreError::NotFound(format!("party {}", party_id)))?;

		party.status = status;
		match status {
			PartyStatus::MatchingPreview => party.matching_preview_at = Some(at),
			PartyStatus::Execution => party.matching_finalized_at = Some(at),
			PartyStatus::AcceptingSubmissions | PartyStatus::Cancelled => {}
		}
		Ok(())
	}
}

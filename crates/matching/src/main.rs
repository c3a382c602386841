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

//! Matching service entry point
//!
//! Runs one trade party from a JSON fixture through the full pipeline:
//! - Match Store (in-memory, seeded from the fixture)
//! - Notification Queue + Dispatcher (log notifier)
//! - Orchestrator (preview, optionally finalize)
//!
//! ```bash
//! barter-matching --fixture demos/party.json --print-protocol
//! barter-matching --fixture demos/party.json --config matching.toml --finalize
//! ```

use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use barter_sdk::types::{Party, RecordState, Submission, WantEdge};
use clap::Parser;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use barter_matching::{
	DispatcherConfig, LogNotifier, MatchStore, MatchingConfig, MatchingOrchestrator,
	MemoryMatchStore, NotificationDispatcher, NotificationQueue,
};

#[derive(Parser)]
#[command(name = "barter-matching")]
#[command(about = "Compute trade chains for a trade party", long_about = None)]
struct Args {
	/// Party fixture (party, submissions and want-edges as JSON)
	#[arg(short, long)]
	fixture: PathBuf,

	/// Configuration file; environment variables prefixed MATCHING_ override it
	#[arg(short, long)]
	config: Option<String>,

	/// Finalize the preview right after it succeeds
	#[arg(long)]
	finalize: bool,

	/// Print the engine input and output text
	#[arg(long)]
	print_protocol: bool,
}

#[derive(Debug, Deserialize)]
struct Fixture {
	party: FixtureParty,
	submissions: Vec<FixtureSubmission>,
	#[serde(default)]
	want_edges: Vec<WantEdge>,
}

#[derive(Debug, Deserialize)]
struct FixtureParty {
	id: String,
	name: String,
	organizer_id: String,
}

#[derive(Debug, Deserialize)]
struct FixtureSubmission {
	#[serde(flatten)]
	submission: Submission,
	#[serde(default)]
	withdrawn: bool,
}

fn load_fixture(path: &PathBuf, store: &MemoryMatchStore) -> Result<String> {
	let raw = fs::read_to_string(path)
		.with_context(|| format!("Failed to read fixture {}", path.display()))?;
	let fixture: Fixture = serde_json::from_str(&raw)
		.with_context(|| format!("Failed to parse fixture {}", path.display()))?;

	let party_id = fixture.party.id.clone();
	store.insert_party(Party::new(
		fixture.party.id,
		fixture.party.name,
		fixture.party.organizer_id,
	));

	for entry in fixture.submissions {
		entry
			.submission
			.validate()
			.with_context(|| format!("Invalid submission {}", entry.submission.id))?;
		let id = entry.submission.id.clone();
		store.insert_submission(&party_id, entry.submission);
		if entry.withdrawn {
			store.withdraw_submission(&party_id, &id)?;
		}
	}
	for edge in fixture.want_edges {
		store.insert_want_edge(&party_id, edge);
	}

	Ok(party_id)
}

fn load_config(path: Option<&str>) -> Result<MatchingConfig> {
	match path {
		Some(path) => MatchingConfig::from_file(path)
			.with_context(|| format!("Failed to load configuration from {}", path)),
		None => Ok(MatchingConfig::from_env().unwrap_or_else(|_| {
			info!(target: "server", "Using default configuration");
			MatchingConfig::default()
		})),
	}
}

fn main() -> Result<()> {
	let args = Args::parse();

	barter_matching::logging::init_logging()?;

	let config = load_config(args.config.as_deref())?;
	info!(target: "server", "Starting Barter Matching Engine");
	info!(target: "server", "Priority scheme: {}", config.engine.priority_scheme);
	info!(target: "server", "Metric: {}", config.engine.metric);
	info!(target: "server", "Iterations: {}", config.engine.iterations);

	let store = Arc::new(MemoryMatchStore::new());
	let party_id = load_fixture(&args.fixture, &store)?;

	let (producer, consumer) = NotificationQueue::new(config.notification_queue_size).split();
	let dispatcher = NotificationDispatcher::start(
		consumer,
		Arc::new(LogNotifier),
		DispatcherConfig {
			verbose_logging: config.verbose_logging,
			..DispatcherConfig::default()
		},
	)
	.context("Failed to start notification dispatcher")?;

	let orchestrator = MatchingOrchestrator::new(store.clone(), producer, config);

	let summary = orchestrator
		.run_preview(&party_id)
		.with_context(|| format!("Matching preview failed for party {}", party_id))?;

	if args.print_protocol {
		println!("{}", summary.engine_input);
		println!("{}", summary.engine_output);
	}

	let chains: Vec<_> = store
		.matches(&party_id, RecordState::Draft)?
		.into_iter()
		.map(|record| {
			json!({
				"chain_id": record.chain_id,
				"position": record.chain_position,
				"submission_id": record.trade.giving_submission_id,
				"from": record.trade.giving_user_id,
				"to": record.trade.receiving_user_id,
			})
		})
		.collect();

	println!(
		"{}",
		serde_json::to_string_pretty(&json!({
			"party_id": summary.party_id,
			"matches": summary.match_count,
			"chains": summary.chain_count,
			"longest_chain": summary.longest_chain,
			"participants": summary.participants,
			"unresolved_trades": summary.unresolved_trades,
			"trades": chains,
		}))?
	);

	if args.finalize {
		let finalized = orchestrator
			.finalize(&party_id)
			.with_context(|| format!("Finalize failed for party {}", party_id))?;
		println!("{}", serde_json::to_string_pretty(&finalized)?);
	}

	dispatcher.shutdown();
	info!(target: "server", "Barter Matching Engine stopped");

	Ok(())
}

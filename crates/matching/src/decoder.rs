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

//! Result decoder turning engine output text into typed chains
//!
//! Tolerant by construction: unrecognized lines are ignored, and trades
//! naming unknown submissions are skipped with a warning.

use std::collections::HashMap;

use barter_sdk::types::{ChainStats, Submission, Trade, TradeChain, TradeStatus};
use tracing::warn;

const CHAIN_MARKER: &str = "*** CHAIN";

/// Chains and statistics extracted from one engine output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedResult {
	pub chains: Vec<TradeChain>,
	pub stats: ChainStats,
	/// Trade lines skipped because their submission id was unknown
	pub unresolved: usize,
}

impl DecodedResult {
	pub fn trade_count(&self) -> usize {
		self.chains.iter().map(TradeChain::len).sum()
	}

	/// Distinct users across all chains, first-appearance order
	pub fn participants(&self) -> Vec<String> {
		let mut users: Vec<String> = Vec::new();
		for user in self.chains.iter().flat_map(|c| c.participants.iter()) {
			if !users.contains(user) {
				users.push(user.clone());
			}
		}
		users
	}
}

/// A parsed `<receiver> receives <submission> from <giver>` line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TradeLine<'a> {
	receiver: &'a str,
	submission: &'a str,
	giver: &'a str,
}

fn parse_trade_line(line: &str) -> Option<TradeLine<'_>> {
	let tokens: Vec<&str> = line.split_whitespace().collect();
	if tokens.len() < 5 || tokens[1] != "receives" || tokens[tokens.len() - 2] != "from" {
		return None;
	}

	let line = line.trim();
	let body = line[tokens[0].len()..].trim_start().strip_prefix("receives")?;
	let end = body.rfind(" from ")?;
	let submission = body[..end].trim();
	if submission.is_empty() {
		return None;
	}

	Some(TradeLine {
		receiver: tokens[0],
		submission,
		giver: tokens[tokens.len() - 1],
	})
}

fn is_chain_marker(line: &str) -> bool {
	line.starts_with(CHAIN_MARKER)
}

fn chain_number(line: &str) -> Option<usize> {
	line.strip_prefix(CHAIN_MARKER)?
		.split_whitespace()
		.next()?
		.parse()
		.ok()
}

/// Decode engine output into chains and statistics
pub fn decode(output: &str, submissions: &[Submission]) -> DecodedResult {
	let (chains, unresolved) = parse_chains_counting(output, submissions);
	DecodedResult {
		chains,
		stats: parse_statistics(output),
		unresolved,
	}
}

/// Parse the chain list only
pub fn parse_chains(output: &str, submissions: &[Submission]) -> Vec<TradeChain> {
	parse_chains_counting(output, submissions).0
}

fn parse_chains_counting(output: &str, submissions: &[Submission]) -> (Vec<TradeChain>, usize) {
	let owners: HashMap<&str, &str> = submissions
		.iter()
		.map(|s| (s.id.as_str(), s.user_id.as_str()))
		.collect();

	let mut chains = Vec::new();
	let mut current: Option<TradeChain> = None;
	let mut unresolved = 0;

	for raw in output.lines() {
		let line = raw.trim();

		if is_chain_marker(line) {
			if let Some(chain) = current.take()
				&& !chain.is_empty()
			{
				chains.push(chain);
			}
			let number = chain_number(line).unwrap_or(chains.len() + 1);
			current = Some(TradeChain::new(number));
			continue;
		}

		let Some(parsed) = parse_trade_line(line) else {
			continue;
		};
		let Some(chain) = current.as_mut() else {
			continue;
		};

		let Some(owner) = owners.get(parsed.submission) else {
			warn!(
				target: "decoder",
				submission_id = parsed.submission,
				receiver = parsed.receiver,
				giver = parsed.giver,
				"Submission not found, skipping trade"
			);
			unresolved += 1;
			continue;
		};

		chain.push_trade(Trade {
			giving_submission_id: parsed.submission.to_string(),
			receiving_submission_id: parsed.submission.to_string(),
			giving_user_id: owner.to_string(),
			receiving_user_id: parsed.receiver.to_string(),
			chain_id: None,
			position: 0,
			status: TradeStatus::Pending,
		});
	}

	if let Some(chain) = current
		&& !chain.is_empty()
	{
		chains.push(chain);
	}

	(chains, unresolved)
}

/// Compute statistics directly from the text
///
/// Independent of submission resolution: every trade line counts.
pub fn parse_statistics(output: &str) -> ChainStats {
	let mut stats = ChainStats::default();
	let mut run = 0usize;
	let mut in_chain = false;

	for raw in output.lines() {
		let line = raw.trim();
		if is_chain_marker(line) {
			close_run(&mut stats, run, in_chain);
			run = 0;
			in_chain = true;
		} else if parse_trade_line(line).is_some() {
			stats.total_trades += 1;
			run += 1;
		}
	}
	close_run(&mut stats, run, in_chain);

	stats
}

fn close_run(stats: &mut ChainStats, run: usize, in_chain: bool) {
	stats.longest_chain = stats.longest_chain.max(run);
	if in_chain && run > 0 {
		stats.total_chains += 1;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn submissions() -> Vec<Submission> {
		vec![
			Submission::new("game1", "Catan", "alice"),
			Submission::new("game2", "Azul", "bob"),
			Submission::new("game3", "Root", "charlie"),
		]
	}

	const THREE_WAY: &str = "TRADE CHAINS:\n*** CHAIN 1\nalice receives game2 from bob\nbob receives game3 from charlie\ncharlie receives game1 from alice\n\nNum trades   = 3 of 3 items\nTotal cost   = 3\n";

	#[test]
	fn test_decode_three_way_chain() {
		let result = decode(THREE_WAY, &submissions());

		assert_eq!(result.chains.len(), 1);
		let chain = &result.chains[0];
		assert_eq!(chain.chain_number, 1);
		assert_eq!(chain.participants, vec!["alice", "bob", "charlie"]);
		assert_eq!(chain.trades[0].giving_user_id, "bob");
		assert_eq!(chain.trades[2].position, 3);
		assert_eq!(
			result.stats,
			ChainStats {
				total_trades: 3,
				total_chains: 1,
				longest_chain: 3,
			}
		);
	}

	#[test]
	fn test_giving_user_comes_from_submission_owner() {
		let output = "*** CHAIN 1\nalice receives game2 from mallory\nbob receives game1 from alice\n";
		let chains = parse_chains(output, &submissions());
		assert_eq!(chains[0].trades[0].giving_user_id, "bob");
	}

	#[test]
	fn test_unknown_submission_skipped() {
		let output = "*** CHAIN 1\nalice receives game9 from bob\nbob receives game1 from alice\n";
		let result = decode(output, &submissions());

		assert_eq!(result.unresolved, 1);
		assert_eq!(result.chains[0].len(), 1);
		assert_eq!(result.stats.total_trades, 2);
	}

	#[test]
	fn test_empty_chains_dropped_and_numbers_fallback() {
		let output = "*** CHAIN 4\n\n*** CHAIN\nalice receives game2 from bob\nbob receives game1 from alice\n";
		let result = decode(output, &submissions());

		assert_eq!(result.chains.len(), 1);
		assert_eq!(result.chains[0].chain_number, 1);
		assert_eq!(result.stats.total_chains, 1);
		assert_eq!(result.stats.longest_chain, 2);
	}

	#[test]
	fn test_trades_before_marker_only_count_in_stats() {
		let output = "alice receives game2 from bob\n*** CHAIN 1\nbob receives game1 from alice\nalice receives game2 from bob\n";
		let result = decode(output, &submissions());

		assert_eq!(result.trade_count(), 2);
		assert_eq!(result.stats.total_trades, 3);
		assert_eq!(result.stats.total_chains, 1);
		assert_eq!(result.stats.longest_chain, 2);
	}

	#[test]
	fn test_summary_lines_are_not_trades() {
		assert!(parse_trade_line("Num trades   = 3 of 3 items").is_none());
		assert!(parse_trade_line("Num users    = 3 of 3 users").is_none());
		assert!(parse_trade_line("alice receives from bob").is_none());

		let parsed = parse_trade_line("alice receives game 2 from bob").unwrap();
		assert_eq!(parsed.submission, "game 2");
	}

	#[test]
	fn test_empty_output() {
		let result = decode("", &submissions());
		assert!(result.chains.is_empty());
		assert_eq!(result.stats, ChainStats::default());
		assert!(result.participants().is_empty());
	}
}

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
	io::Write,
};

use super::{Metric, parser::Problem};

/// One item moving between two users
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolvedTrade {
	pub item: String,
	pub giver: String,
	pub receiver: String,
	/// Rank of the satisfied want
	pub rank: u32,
}

/// A closed exchange cycle, trades in item-flow order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolvedChain {
	pub number: usize,
	pub trades: Vec<SolvedTrade>,
}

/// Result of one optimization run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
	pub chains: Vec<SolvedChain>,
	/// Real items changing hands
	pub trade_count: usize,
	/// Sum of `cost(rank)` over satisfied wants
	pub total_cost: i64,
	pub item_count: usize,
	pub user_count: usize,
	pub users_trading: usize,
	pub metric: Metric,
	pub metric_value: i64,
	pub iterations_run: u32,
}

impl Solution {
	/// Decompose an assignment into chains
	///
	/// Chains are discovered from the lowest item index. Dummy hops are
	/// always between items of the same user and are elided.
	pub(crate) fn from_assignment(problem: &Problem, assignment: &[usize]) -> Self {
		let n = assignment.len();
		let scheme = problem.options.priority_scheme;

		let ranks: HashMap<(usize, usize), u32> = problem
			.wants
			.iter()
			.map(|want| ((want.offered, want.wanted), want.rank))
			.collect();

		let mut receiver_of = vec![0usize; n];
		for (giver, &received) in assignment.iter().enumerate() {
			receiver_of[received] = giver;
		}

		let owner = |item: usize| problem.owner_name(item).unwrap_or("unknown").to_string();

		let mut total_cost = 0i64;
		let mut chains = Vec::new();
		let mut visited = vec![false; n];

		for start in 0..n {
			if visited[start] || assignment[start] == start {
				continue;
			}

			let mut trades = Vec::new();
			let mut item = start;
			loop {
				visited[item] = true;
				let receiver = receiver_of[item];
				let rank = ranks.get(&(receiver, item)).copied().unwrap_or_default();
				total_cost += scheme.cost(rank).unwrap_or_default();

				if !problem.items[item].dummy {
					trades.push(SolvedTrade {
						item: problem.items[item].name.clone(),
						giver: owner(item),
						receiver: owner(receiver),
						rank,
					});
				}

				item = receiver;
				if item == start {
					break;
				}
			}

			if !trades.is_empty() {
				chains.push(SolvedChain {
					number: chains.len() + 1,
					trades,
				});
			}
		}

		let trade_count = chains.iter().map(|c| c.trades.len()).sum();
		let users_trading = chains
			.iter()
			.flat_map(|c| c.trades.iter().map(|t| t.giver.as_str()))
			.collect::<HashSet<_>>()
			.len();
		let user_count = problem
			.items
			.iter()
			.filter(|item| !item.dummy)
			.filter_map(|item| item.owner)
			.collect::<HashSet<_>>()
			.len();

		let metric = problem.options.metric;
		let metric_value = match metric {
			Metric::None => 0,
			Metric::ChainSizesSos => chains
				.iter()
				.map(|c| {
					let len = c.trades.len() as i64;
					len * len
				})
				.sum(),
			Metric::UsersTrading => users_trading as i64,
		};

		Self {
			chains,
			trade_count,
			total_cost,
			item_count: problem.real_item_count(),
			user_count,
			users_trading,
			metric,
			metric_value,
			iterations_run: 1,
		}
	}

	/// Objective order: more trades, then lower cost, then higher metric
	pub fn is_better_than(&self, other: &Solution) -> bool {
		if self.trade_count != other.trade_count {
			return self.trade_count > other.trade_count;
		}
		if self.total_cost != other.total_cost {
			return self.total_cost < other.total_cost;
		}
		self.metric_value > other.metric_value
	}

	/// Write the result protocol, one chain at a time
	pub fn write_to<W: Write>(&self, sink: &mut W) -> std::io::Result<()> {
		writeln!(sink, "TRADE CHAINS:")?;
		for chain in &self.chains {
			writeln!(sink, "*** CHAIN {}", chain.number)?;
			for trade in &chain.trades {
				writeln!(sink, "{} receives {} from {}", trade.receiver, trade.item, trade.giver)?;
			}
			writeln!(sink)?;
			sink.flush()?;
		}

		if self.chains.is_empty() {
			writeln!(sink)?;
		}
		writeln!(sink, "Num trades   = {} of {} items", self.trade_count, self.item_count)?;
		writeln!(sink, "Total cost   = {}", self.total_cost)?;
		writeln!(sink, "Num users    = {} of {} users", self.users_trading, self.user_count)?;
		writeln!(sink, "Num chains   = {}", self.chains.len())?;
		writeln!(sink, "Metric       = {} {}", self.metric, self.metric_value)?;
		writeln!(sink, "Iterations   = {}", self.iterations_run)?;
		sink.flush()
	}
}

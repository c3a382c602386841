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

mod assignment;
pub mod parser;
mod solution;

pub use parser::{Item, Problem, Want};
pub use solution::{Solution, SolvedChain, SolvedTrade};

use std::{fmt, io::Write, time::Instant};

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use assignment::Edge;

/// Upper bound for the refinement iteration budget
pub const MAX_ITERATIONS: u32 = 10_000;

/// Largest cost the assignment arithmetic is allowed to reach
const COST_LIMIT: i64 = i64::MAX / 16;

/// Error types for optimization runs
///
/// `Fatal` is the distinguished channel for structural problems in the
/// input. Any output already written to the sink must be discarded.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error(
		"Fatal engine error{}: {message}",
		.line.map(|l| format!(" at line {}", l)).unwrap_or_default()
	)]
	Fatal {
		line: Option<usize>,
		message: String,
	},
	#[error("Failed to write engine output: {0}")]
	Output(#[from] std::io::Error),
}

impl EngineError {
	pub(crate) fn fatal(message: impl Into<String>) -> Self {
		EngineError::Fatal {
			line: None,
			message: message.into(),
		}
	}

	pub(crate) fn fatal_at(line: usize, message: impl Into<String>) -> Self {
		EngineError::Fatal {
			line: Some(line),
			message: message.into(),
		}
	}

	pub fn is_fatal(&self) -> bool {
		matches!(self, EngineError::Fatal { .. })
	}
}

/// Cost function converting a preference rank into the minimized quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING-KEBAB-CASE")]
pub enum PriorityScheme {
	/// `r`
	#[default]
	Linear,
	/// `r(r+1)/2`
	Triangle,
	/// `r^2`
	Square,
}

impl PriorityScheme {
	pub fn cost(&self, rank: u32) -> Option<i64> {
		let r = i64::from(rank);
		match self {
			PriorityScheme::Linear => Some(r),
			PriorityScheme::Triangle => r.checked_mul(r + 1).map(|v| v / 2),
			PriorityScheme::Square => r.checked_mul(r),
		}
	}

	pub fn parse(value: &str) -> Option<Self> {
		match value.to_ascii_uppercase().as_str() {
			"LINEAR" => Some(PriorityScheme::Linear),
			"TRIANGLE" => Some(PriorityScheme::Triangle),
			"SQUARE" => Some(PriorityScheme::Square),
			_ => None,
		}
	}
}

impl fmt::Display for PriorityScheme {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			PriorityScheme::Linear => "LINEAR",
			PriorityScheme::Triangle => "TRIANGLE",
			PriorityScheme::Square => "SQUARE",
		})
	}
}

/// Secondary metric re-ranking equally good solutions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING-KEBAB-CASE")]
pub enum Metric {
	#[default]
	None,
	/// Sum of squared chain lengths, maximized (fewer, longer chains)
	ChainSizesSos,
	/// Distinct users trading, maximized
	UsersTrading,
}

impl Metric {
	pub fn parse(value: &str) -> Option<Self> {
		match value.to_ascii_uppercase().as_str() {
			"NONE" => Some(Metric::None),
			"CHAIN-SIZES-SOS" => Some(Metric::ChainSizesSos),
			"USERS-TRADING" => Some(Metric::UsersTrading),
			_ => None,
		}
	}
}

impl fmt::Display for Metric {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Metric::None => "NONE",
			Metric::ChainSizesSos => "CHAIN-SIZES-SOS",
			Metric::UsersTrading => "USERS-TRADING",
		})
	}
}

/// Configuration for the optimization engine
///
/// Directives present in the input text override these values. The
/// defaults match what the encoder produces from stored want-edges: ids
/// compared verbatim and every want-line carrying its stored rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
	pub allow_dummies: bool,
	pub case_sensitive: bool,
	/// Want-lines carry an explicit `=rank` suffix
	pub explicit_priorities: bool,
	pub priority_scheme: PriorityScheme,
	pub metric: Metric,
	/// Refinement budget, `1..=MAX_ITERATIONS`
	pub iterations: u32,
	/// Seed for the refinement shuffles
	pub seed: u64,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			allow_dummies: false,
			case_sensitive: true,
			explicit_priorities: true,
			priority_scheme: PriorityScheme::Linear,
			metric: Metric::None,
			iterations: 1,
			seed: 0,
		}
	}
}

impl EngineConfig {
	/// Settings for hand-written input: case-insensitive ids, ranks taken
	/// from want-line order
	pub fn lenient() -> Self {
		Self {
			case_sensitive: false,
			explicit_priorities: false,
			..Self::default()
		}
	}
}

/// Optimization engine computing a maximum-cardinality, minimum-cost set of
/// disjoint exchange cycles
///
/// The engine is a pure function of its input text and configuration:
/// - No shared state between runs
/// - Deterministic: refinement shuffles use a caller-supplied seed
/// - Bounded: at most `iterations` re-solves
pub struct Engine {
	config: EngineConfig,
}

impl Engine {
	pub fn new(config: EngineConfig) -> Self {
		Self { config }
	}

	pub fn config(&self) -> &EngineConfig {
		&self.config
	}

	/// Parse the input protocol, solve it and write the result protocol to
	/// `sink`
	pub fn run<W: Write>(&self, input: &str, sink: &mut W) -> Result<Solution, EngineError> {
		let problem = parser::parse(input, &self.config)?;
		let solution = self.solve(&problem)?;
		solution.write_to(sink)?;
		Ok(solution)
	}

	/// Solve an already parsed problem
	pub fn solve(&self, problem: &Problem) -> Result<Solution, EngineError> {
		let started = Instant::now();
		let options = &problem.options;

		if options.iterations == 0 || options.iterations > MAX_ITERATIONS {
			return Err(EngineError::fatal(format!(
				"iterations must be within 1..={}, got {}",
				MAX_ITERATIONS, options.iterations
			)));
		}

		let adjacency = Self::build_adjacency(problem)?;
		let n = adjacency.len();

		let mut order: Vec<usize> = (0..n).collect();
		let assignment = assignment::min_cost_assignment(&adjacency, &order)
			.ok_or_else(|| EngineError::fatal("no feasible assignment exists"))?;
		let mut best = Solution::from_assignment(problem, &assignment);
		let mut iterations_run = 1;

		if options.metric != Metric::None && options.iterations > 1 {
			let mut rng = StdRng::seed_from_u64(options.seed);
			let mut shuffled = adjacency.clone();

			for iteration in 2..=options.iterations {
				order.shuffle(&mut rng);
				for edges in shuffled.iter_mut() {
					edges.shuffle(&mut rng);
				}

				let Some(assignment) = assignment::min_cost_assignment(&shuffled, &order) else {
					continue;
				};
				let candidate = Solution::from_assignment(problem, &assignment);
				iterations_run = iteration;

				if candidate.is_better_than(&best) {
					debug!(
						target: "engine",
						iteration,
						metric = candidate.metric_value,
						previous = best.metric_value,
						"Refinement improved secondary metric"
					);
					best = candidate;
				}
			}
		}

		best.iterations_run = iterations_run;

		info!(
			target: "engine",
			items = problem.real_item_count(),
			wants = problem.wants.len(),
			trades = best.trade_count,
			chains = best.chains.len(),
			total_cost = best.total_cost,
			iterations = iterations_run,
			elapsed_ms = started.elapsed().as_millis(),
			"Optimization complete"
		);

		Ok(best)
	}

	/// Build the giver -> receiver adjacency with a self edge for every item
	///
	/// A real item keeping itself costs more than any possible sum of trade
	/// costs, so cardinality strictly dominates preference quality.
	fn build_adjacency(problem: &Problem) -> Result<Vec<Vec<Edge>>, EngineError> {
		let scheme = problem.options.priority_scheme;
		let too_large = || EngineError::fatal("problem too large for cost arithmetic");

		let mut max_cost: i64 = 1;
		let mut costs = Vec::with_capacity(problem.wants.len());
		for want in &problem.wants {
			let cost = scheme.cost(want.rank).ok_or_else(too_large)?;
			max_cost = max_cost.max(cost);
			costs.push(cost);
		}

		let n = problem.items.len() as i64;
		let no_trade = n
			.checked_mul(max_cost)
			.and_then(|v| v.checked_add(1))
			.ok_or_else(too_large)?;
		let worst_total = no_trade.checked_mul(n + 1).ok_or_else(too_large)?;
		if worst_total > COST_LIMIT {
			return Err(too_large());
		}

		let mut adjacency: Vec<Vec<Edge>> = vec![Vec::new(); problem.items.len()];
		for (want, cost) in problem.wants.iter().zip(costs) {
			adjacency[want.offered].push(Edge {
				to: want.wanted,
				cost,
			});
		}
		for (index, item) in problem.items.iter().enumerate() {
			let cost = if item.dummy { 0 } else { no_trade };
			adjacency[index].push(Edge { to: index, cost });
		}

		Ok(adjacency)
	}
}

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

use barter_sdk::types::{Submission, WantEdge};
use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};

#[derive(Clone, Copy, Debug)]
pub enum Scenario {
	/// Few wants per item, many items left over
	Sparse,
	/// Every item wants a large share of the party
	Dense,
	/// Popular items everyone wants, long tail nobody wants
	Skewed,
}

impl Scenario {
	pub fn name(&self) -> &'static str {
		match self {
			Scenario::Sparse => "sparse",
			Scenario::Dense => "dense",
			Scenario::Skewed => "skewed",
		}
	}
}

/// Deterministic trade party generator
pub struct WantGenerator {
	rng: StdRng,
	scenario: Scenario,
}

impl WantGenerator {
	pub fn new(seed: u64, scenario: Scenario) -> Self {
		Self {
			rng: StdRng::seed_from_u64(seed),
			scenario,
		}
	}

	/// `items` submissions spread over `items / 2` users, plus their wants
	pub fn party(&mut self, items: usize) -> (Vec<Submission>, Vec<WantEdge>) {
		let users = (items / 2).max(2);
		let submissions: Vec<Submission> = (0..items)
			.map(|i| Submission::new(format!("sub{}", i), format!("Game {}", i), format!("user{}", i % users)))
			.collect();

		let wants_per_item = match self.scenario {
			Scenario::Sparse => 3,
			Scenario::Dense => (items / 4).max(3),
			Scenario::Skewed => 8,
		};

		let mut edges = Vec::new();
		for offered in &submissions {
			let mut candidates: Vec<usize> = match self.scenario {
				Scenario::Skewed => {
					// Half of the wants go to the first tenth of the catalogue
					let hot = (items / 10).max(1);
					(0..wants_per_item)
						.map(|k| {
							if k % 2 == 0 {
								self.rng.gen_range(0..hot)
							} else {
								self.rng.gen_range(0..items)
							}
						})
						.collect()
				}
				Scenario::Sparse | Scenario::Dense => {
					let mut all: Vec<usize> = (0..items).collect();
					all.shuffle(&mut self.rng);
					all.truncate(wants_per_item + 1);
					all
				}
			};
			candidates.dedup();

			let mut rank = 1;
			for wanted in candidates {
				let wanted = &submissions[wanted];
				if wanted.user_id == offered.user_id {
					continue;
				}
				edges.push(WantEdge::new(offered.id.clone(), wanted.id.clone(), rank));
				rank += 1;
			}
		}

		(submissions, edges)
	}
}

//! Property tests for the optimization engine
//!
//! Small random parties are solved by exhaustive search over all
//! permutations and compared against the engine:
//! - Same number of items moved, same total cost, for every priority scheme
//!   with stored ranks and with ranks taken from want-line order
//! - Decoded chains are closed and conserve flow per user
//! - No user trades with themselves, with or without dummy items
//! - Identical input yields identical output

use std::collections::{HashMap, HashSet};

use barter_matching::{EncoderOptions, Engine, EngineConfig, PriorityScheme, Solution, decode, encode};
use barter_sdk::types::{Submission, WantEdge};
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct RandomParty {
	owners: Vec<usize>,
	/// (offered, wanted, rank), first occurrence of each pair kept
	edges: Vec<(usize, usize, u32)>,
}

impl RandomParty {
	fn submissions(&self) -> Vec<Submission> {
		self.owners
			.iter()
			.enumerate()
			.map(|(i, owner)| Submission::new(format!("s{}", i), format!("Item {}", i), format!("u{}", owner)))
			.collect()
	}

	fn want_edges(&self) -> Vec<WantEdge> {
		self.edges
			.iter()
			.map(|&(offered, wanted, rank)| WantEdge::new(format!("s{}", offered), format!("s{}", wanted), rank))
			.collect()
	}
}

fn random_party() -> impl Strategy<Value = RandomParty> {
	(2usize..7).prop_flat_map(|n| {
		(
			prop::collection::vec(0usize..4, n),
			prop::collection::vec((0..n, 0..n, 1u32..4), 0..24),
		)
			.prop_map(|(owners, raw)| {
				let mut seen = HashSet::new();
				let edges = raw
					.into_iter()
					.filter(|&(offered, wanted, _)| offered != wanted)
					.filter(|&(offered, wanted, _)| seen.insert((offered, wanted)))
					.collect();
				RandomParty { owners, edges }
			})
	})
}

/// Rank each edge would carry in the engine
///
/// With stored ranks this is the edge's own rank. Otherwise the engine
/// numbers each offered item's wants in line order.
fn effective_ranks(party: &RandomParty, stored: bool) -> Vec<u32> {
	let mut seen: HashMap<usize, u32> = HashMap::new();
	party
		.edges
		.iter()
		.map(|&(offered, _, rank)| {
			let position = seen.entry(offered).or_default();
			*position += 1;
			if stored { rank } else { *position }
		})
		.collect()
}

/// Best (moved items, total cost) over every permutation, trades maximized
/// first and cost minimized second
fn brute_force(party: &RandomParty, scheme: PriorityScheme, stored: bool) -> (usize, i64) {
	let n = party.owners.len();
	let cost: HashMap<(usize, usize), i64> = party
		.edges
		.iter()
		.zip(effective_ranks(party, stored))
		.filter(|&(&(offered, wanted, _), _)| party.owners[offered] != party.owners[wanted])
		.map(|(&(offered, wanted, _), rank)| ((offered, wanted), scheme.cost(rank).unwrap()))
		.collect();

	let mut best = (0usize, 0i64);
	let mut received: Vec<usize> = (0..n).collect();
	permutations(&mut received, 0, &mut |perm| {
		let mut moved = 0;
		let mut total = 0i64;
		for (item, &got) in perm.iter().enumerate() {
			if item == got {
				continue;
			}
			match cost.get(&(item, got)) {
				Some(&c) => {
					moved += 1;
					total += c;
				}
				None => return,
			}
		}
		if moved > best.0 || (moved == best.0 && total < best.1) {
			best = (moved, total);
		}
	});
	best
}

fn permutations(items: &mut Vec<usize>, k: usize, visit: &mut impl FnMut(&[usize])) {
	if k == items.len() {
		visit(items);
		return;
	}
	for i in k..items.len() {
		items.swap(k, i);
		permutations(items, k + 1, visit);
		items.swap(k, i);
	}
}

fn config(scheme: PriorityScheme, stored: bool) -> EngineConfig {
	EngineConfig {
		priority_scheme: scheme,
		explicit_priorities: stored,
		..EngineConfig::default()
	}
}

fn run(party: &RandomParty, config: EngineConfig) -> (Solution, String) {
	let input = encode(&party.submissions(), &party.want_edges(), &EncoderOptions::from(&config));
	let mut output = Vec::new();
	let solution = Engine::new(config).run(&input, &mut output).unwrap();
	(solution, String::from_utf8(output).unwrap())
}

fn scheme() -> impl Strategy<Value = PriorityScheme> {
	prop_oneof![
		Just(PriorityScheme::Linear),
		Just(PriorityScheme::Triangle),
		Just(PriorityScheme::Square),
	]
}

/// Hand-written input mixing real items with per-user dummies
///
/// Real item `rK` belongs to user `u{owner}`; dummy `%dK` belongs to
/// whichever user writes the line.
fn dummy_input() -> impl Strategy<Value = String> {
	(
		prop::collection::vec(0usize..3, 2..6),
		prop::collection::vec((0usize..3, 0usize..8, 0usize..8, any::<bool>()), 0..24),
	)
		.prop_map(|(owners, lines)| {
			let items = owners.len();
			let token = |index: usize| {
				if index < items {
					format!("r{}", index)
				} else {
					format!("%d{}", index % 2)
				}
			};

			let mut input = String::from("#!ALLOW-DUMMIES\n");
			for (writer, offered, wanted, offered_is_real) in lines {
				let offered = if offered_is_real { offered % items } else { items + offered };
				let (user, offered) = if offered < items {
					(owners[offered], token(offered))
				} else {
					(writer, token(offered))
				};
				let wanted = token(if wanted < items { wanted } else { items + wanted });
				if wanted == offered {
					continue;
				}
				input.push_str(&format!("(u{}) {} : {}\n", user, wanted, offered));
			}
			input
		})
}

proptest! {
	#[test]
	fn engine_matches_exhaustive_search(
		party in random_party(),
		scheme in scheme(),
		stored in any::<bool>(),
	) {
		let (solution, _) = run(&party, config(scheme, stored));
		let (moved, cost) = brute_force(&party, scheme, stored);

		prop_assert_eq!(solution.trade_count, moved);
		prop_assert_eq!(solution.total_cost, cost);
	}

	#[test]
	fn decoded_chains_are_closed_cycles(party in random_party()) {
		let submissions = party.submissions();
		let (solution, output) = run(&party, EngineConfig::default());
		let decoded = decode(&output, &submissions);

		prop_assert_eq!(decoded.unresolved, 0);
		prop_assert_eq!(decoded.trade_count(), solution.trade_count);
		prop_assert_eq!(decoded.stats.total_trades, solution.trade_count);

		let mut given = HashSet::new();
		for chain in &decoded.chains {
			let trades = &chain.trades;
			prop_assert!(trades.len() >= 2);

			let mut balance: HashMap<&str, i64> = HashMap::new();
			for (i, trade) in trades.iter().enumerate() {
				prop_assert_ne!(&trade.giving_user_id, &trade.receiving_user_id);
				prop_assert!(given.insert(trade.giving_submission_id.clone()));

				let next = &trades[(i + 1) % trades.len()];
				prop_assert_eq!(&trade.receiving_user_id, &next.giving_user_id);

				*balance.entry(trade.giving_user_id.as_str()).or_default() -= 1;
				*balance.entry(trade.receiving_user_id.as_str()).or_default() += 1;
			}
			prop_assert!(balance.values().all(|&b| b == 0));
		}
	}

	#[test]
	fn dummy_chains_have_no_self_trades(input in dummy_input()) {
		let mut output = Vec::new();
		let solution = Engine::new(EngineConfig::lenient()).run(&input, &mut output).unwrap();
		let output = String::from_utf8(output).unwrap();

		let mut moved = HashSet::new();
		for trade in solution.chains.iter().flat_map(|c| &c.trades) {
			prop_assert_ne!(&trade.giver, &trade.receiver);
			prop_assert!(!trade.item.starts_with('%'));
			prop_assert!(moved.insert(trade.item.clone()));
		}
		for line in output.lines().filter(|l| l.contains(" receives ")) {
			let tokens: Vec<&str> = line.split_whitespace().collect();
			prop_assert_ne!(tokens[0], tokens[tokens.len() - 1]);
		}
	}

	#[test]
	fn engine_is_deterministic(party in random_party(), scheme in scheme()) {
		let (_, first) = run(&party, config(scheme, true));
		let (_, second) = run(&party, config(scheme, true));
		prop_assert_eq!(first, second);
	}
}

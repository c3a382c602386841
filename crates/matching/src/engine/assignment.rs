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

//! Minimum-cost perfect assignment on a sparse bipartite graph
//!
//! Left node `u` is "the owner of item `u` giving it up", right node `v` is
//! "item `v` being received". Assigning `u -> v` means the owner of `u`
//! receives `v`. Because every item has a self edge, a perfect assignment
//! always exists and decomposes into disjoint cycles.
//!
//! Solved with successive shortest augmenting paths: Dijkstra over reduced
//! costs, with node potentials keeping every residual edge non-negative.

use std::{cmp::Reverse, collections::BinaryHeap};

const INF: i64 = i64::MAX / 4;
const NONE: usize = usize::MAX;

/// Edge from a giver to the item received in exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Edge {
	pub to: usize,
	pub cost: i64,
}

/// Compute a minimum-cost perfect assignment
///
/// `order` is the sequence in which left nodes are augmented; it changes
/// which optimum is found among equal-cost ones, never the optimal cost.
/// Returns `assignment[u] = v`, or `None` when no perfect assignment exists.
pub(crate) fn min_cost_assignment(adjacency: &[Vec<Edge>], order: &[usize]) -> Option<Vec<usize>> {
	let n = adjacency.len();

	let mut pot_left = vec![0i64; n];
	let mut pot_right = vec![0i64; n];
	let mut match_left = vec![NONE; n];
	let mut match_cost = vec![0i64; n];
	let mut match_right = vec![NONE; n];

	let mut dist_left = vec![INF; n];
	let mut dist_right = vec![INF; n];
	let mut prev_right = vec![NONE; n];
	let mut prev_cost = vec![0i64; n];
	let mut done = vec![false; n];
	let mut heap = BinaryHeap::new();

	for &source in order {
		dist_left.fill(INF);
		dist_right.fill(INF);
		done.fill(false);
		heap.clear();

		dist_left[source] = 0;
		heap.push(Reverse((0i64, source)));

		let mut end = NONE;
		let mut end_dist = INF;

		while let Some(Reverse((dist, u))) = heap.pop() {
			if dist >= end_dist {
				break;
			}
			if done[u] || dist > dist_left[u] {
				continue;
			}
			done[u] = true;

			for edge in &adjacency[u] {
				let v = edge.to;
				let next = dist + edge.cost + pot_left[u] - pot_right[v];
				if next >= dist_right[v] {
					continue;
				}
				dist_right[v] = next;
				prev_right[v] = u;
				prev_cost[v] = edge.cost;

				let holder = match_right[v];
				if holder == NONE {
					if next < end_dist {
						end_dist = next;
						end = v;
					}
				} else {
					// Residual edge back to the current holder of `v`
					let back = pot_right[v] - match_cost[holder] - pot_left[holder];
					let through = next + back;
					if through < dist_left[holder] {
						dist_left[holder] = through;
						heap.push(Reverse((through, holder)));
					}
				}
			}
		}

		if end == NONE {
			return None;
		}

		for node in 0..n {
			pot_left[node] += dist_left[node].min(end_dist);
			pot_right[node] += dist_right[node].min(end_dist);
		}

		let mut v = end;
		loop {
			let u = prev_right[v];
			let previous = match_left[u];
			match_left[u] = v;
			match_cost[u] = prev_cost[v];
			match_right[v] = u;
			if u == source || previous == NONE {
				break;
			}
			v = previous;
		}
	}

	if match_left.contains(&NONE) {
		return None;
	}
	Some(match_left)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn graph(n: usize, edges: &[(usize, usize, i64)], self_cost: i64) -> Vec<Vec<Edge>> {
		let mut adjacency = vec![Vec::new(); n];
		for &(from, to, cost) in edges {
			adjacency[from].push(Edge { to, cost });
		}
		for (node, list) in adjacency.iter_mut().enumerate() {
			list.push(Edge {
				to: node,
				cost: self_cost,
			});
		}
		adjacency
	}

	fn total(adjacency: &[Vec<Edge>], assignment: &[usize]) -> i64 {
		assignment
			.iter()
			.enumerate()
			.map(|(u, &v)| {
				adjacency[u]
					.iter()
					.filter(|e| e.to == v)
					.map(|e| e.cost)
					.min()
					.unwrap()
			})
			.sum()
	}

	#[test]
	fn test_identity_when_no_edges() {
		let adjacency = graph(3, &[], 10);
		let assignment = min_cost_assignment(&adjacency, &[0, 1, 2]).unwrap();
		assert_eq!(assignment, vec![0, 1, 2]);
	}

	#[test]
	fn test_swap_and_ring() {
		let adjacency = graph(3, &[(0, 1, 1), (1, 0, 1), (1, 2, 2), (2, 0, 1)], 100);
		let assignment = min_cost_assignment(&adjacency, &[0, 1, 2]).unwrap();
		// 0 -> 1 -> 2 -> 0 moves all three items
		assert_eq!(assignment, vec![1, 2, 0]);
		assert_eq!(total(&adjacency, &assignment), 4);
	}

	#[test]
	fn test_order_does_not_change_optimal_cost() {
		let edges = [
			(0, 1, 1),
			(0, 2, 2),
			(1, 0, 1),
			(1, 3, 2),
			(2, 3, 1),
			(2, 0, 2),
			(3, 2, 1),
			(3, 1, 2),
		];
		let adjacency = graph(4, &edges, 50);
		let forward = min_cost_assignment(&adjacency, &[0, 1, 2, 3]).unwrap();
		let backward = min_cost_assignment(&adjacency, &[3, 2, 1, 0]).unwrap();
		assert_eq!(total(&adjacency, &forward), 4);
		assert_eq!(total(&adjacency, &backward), 4);
	}

	#[test]
	fn test_augmenting_path_reassigns_earlier_choice() {
		// Node 0 first grabs item 1 cheaply; node 2 only accepts item 1,
		// so the optimum has to move node 0 to item 3.
		let adjacency = graph(4, &[(0, 1, 1), (0, 3, 2), (2, 1, 1), (1, 2, 1), (3, 0, 1)], 100);
		let assignment = min_cost_assignment(&adjacency, &[0, 1, 2, 3]).unwrap();
		assert_eq!(assignment, vec![3, 2, 1, 0]);
	}
}

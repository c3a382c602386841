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

use std::{hint::black_box, io, time::Duration};

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use barter_matching::{
	Engine, EngineConfig, Metric, decode,
	encoder::{EncoderOptions, encode},
};

mod common;
use common::want_generator::{Scenario, WantGenerator};

const PARTY_SIZES: &[usize] = &[50, 200, 1_000];
const SEED: u64 = 0x5eed;

fn benchmark_scenario(c: &mut Criterion, scenario: Scenario) {
	let mut group = c.benchmark_group(scenario.name());
	group.sample_size(10);
	group.measurement_time(Duration::from_secs(10));

	for &items in PARTY_SIZES {
		let (submissions, edges) = WantGenerator::new(SEED, scenario).party(items);
		let input = encode(&submissions, &edges, &EncoderOptions::default());
		let engine = Engine::new(EngineConfig::default());

		group.throughput(Throughput::Elements(edges.len() as u64));
		group.bench_with_input(BenchmarkId::new("solve", items), &input, |b, input| {
			b.iter(|| engine.run(black_box(input), &mut io::sink()).ok());
		});

		group.bench_with_input(BenchmarkId::new("pipeline", items), &items, |b, _| {
			b.iter(|| {
				let input = encode(black_box(&submissions), black_box(&edges), &EncoderOptions::default());
				let mut output = Vec::new();
				if engine.run(&input, &mut output).is_ok() {
					let output = String::from_utf8_lossy(&output);
					black_box(decode(&output, &submissions));
				}
			});
		});
	}

	group.finish();
}

fn bench_refinement(c: &mut Criterion) {
	let mut group = c.benchmark_group("refinement");
	group.sample_size(10);

	let (submissions, edges) = WantGenerator::new(SEED, Scenario::Skewed).party(200);
	let input = encode(&submissions, &edges, &EncoderOptions::default());

	for iterations in [1u32, 10, 50] {
		let engine = Engine::new(EngineConfig {
			metric: Metric::ChainSizesSos,
			iterations,
			..EngineConfig::default()
		});
		group.bench_with_input(BenchmarkId::from_parameter(iterations), &input, |b, input| {
			b.iter(|| engine.run(black_box(input), &mut io::sink()).ok());
		});
	}

	group.finish();
}

fn bench_sparse(c: &mut Criterion) {
	benchmark_scenario(c, Scenario::Sparse);
}

fn bench_dense(c: &mut Criterion) {
	benchmark_scenario(c, Scenario::Dense);
}

fn bench_skewed(c: &mut Criterion) {
	benchmark_scenario(c, Scenario::Skewed);
}

criterion_group!(benches, bench_sparse, bench_dense, bench_skewed, bench_refinement);
criterion_main!(benches);

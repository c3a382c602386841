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

//! Barter Matching Engine
//!
//! This crate turns the items offered into a trade party and the ranked
//! want-lists over them into closed trade chains, where every participant
//! gives one item and receives one they asked for.
//!
//! Architecture:
//! - Graph encoder producing a line-oriented engine input
//! - Deterministic optimization engine (maximum trades, then minimum cost)
//! - Result decoder turning engine output into typed chains
//! - Orchestrator with a preview / finalize lifecycle over a match store
//! - Bounded notification queue drained by a background dispatcher

pub mod config;
pub mod decoder;
pub mod encoder;
pub mod engine;
pub mod logging;
pub mod notify;
pub mod orchestrator;
pub mod store;

pub use config::MatchingConfig;
pub use decoder::{DecodedResult, decode};
pub use encoder::{EncoderOptions, encode};
pub use engine::{Engine, EngineConfig, EngineError, Metric, PriorityScheme, Solution};
pub use notify::{
	DispatcherConfig, LogNotifier, NotificationDispatcher, NotificationProducer, NotificationQueue,
	Notifier, NotifyError,
};
pub use orchestrator::{
	CancelSummary, FinalizeSummary, MatchingError, MatchingOrchestrator, RunSummary,
};
pub use store::{MatchStore, MemoryMatchStore, StoreError};

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

//! Parser for the line-oriented engine input protocol
//!
//! ```text
//! #!CASE-SENSITIVE
//! #!ALLOW-DUMMIES
//!
//! !BEGIN-OFFICIAL-NAMES
//! <submissionId> <title>
//! !END-OFFICIAL-NAMES
//!
//! (<user>) <wantedId> : <offeredId>
//! ```

use std::collections::HashMap;

use tracing::warn;

use super::{EngineConfig, EngineError, Metric, PriorityScheme};

const BEGIN_NAMES: &str = "!BEGIN-OFFICIAL-NAMES";
const END_NAMES: &str = "!END-OFFICIAL-NAMES";
const DUMMY_PREFIX: char = '%';

/// A node of the exchange graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
	/// Spelling used in output
	pub name: String,
	/// Index into `Problem::users`, set by the first want-line offering it
	pub owner: Option<usize>,
	pub dummy: bool,
}

/// One ranked want: the owner of `offered` would give it for `wanted`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Want {
	pub offered: usize,
	pub wanted: usize,
	pub rank: u32,
	/// 1-based input line
	pub line: usize,
}

/// Parsed engine input
#[derive(Debug, Clone)]
pub struct Problem {
	/// Base configuration with input directives applied
	pub options: EngineConfig,
	pub items: Vec<Item>,
	pub users: Vec<String>,
	pub wants: Vec<Want>,
}

impl Problem {
	pub fn real_item_count(&self) -> usize {
		self.items.iter().filter(|item| !item.dummy).count()
	}

	pub fn owner_name(&self, item: usize) -> Option<&str> {
		self.items[item].owner.map(|user| self.users[user].as_str())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
	Header,
	Names,
	Body,
}

struct Parser {
	options: EngineConfig,
	section: Section,
	names_seen: bool,
	items: Vec<Item>,
	item_index: HashMap<String, usize>,
	dummy_index: HashMap<(usize, String), usize>,
	users: Vec<String>,
	user_index: HashMap<String, usize>,
	wants: Vec<Want>,
	seen_wants: HashMap<usize, Vec<usize>>,
}

/// Parse `input`, applying its directives on top of `base`
pub fn parse(input: &str, base: &EngineConfig) -> Result<Problem, EngineError> {
	let mut parser = Parser {
		options: base.clone(),
		section: Section::Header,
		names_seen: false,
		items: Vec::new(),
		item_index: HashMap::new(),
		dummy_index: HashMap::new(),
		users: Vec::new(),
		user_index: HashMap::new(),
		wants: Vec::new(),
		seen_wants: HashMap::new(),
	};

	for (index, raw) in input.lines().enumerate() {
		parser.line(index + 1, raw.trim())?;
	}

	if parser.section == Section::Names {
		return Err(EngineError::fatal(format!("missing {}", END_NAMES)));
	}

	parser.finish()
}

impl Parser {
	fn key(&self, value: &str) -> String {
		if self.options.case_sensitive {
			value.to_string()
		} else {
			value.to_uppercase()
		}
	}

	fn line(&mut self, number: usize, line: &str) -> Result<(), EngineError> {
		if line.is_empty() {
			return Ok(());
		}

		if let Some(directive) = line.strip_prefix("#!") {
			if self.section != Section::Header {
				return Err(EngineError::fatal_at(
					number,
					"option directives must precede all other content",
				));
			}
			return self.directive(number, directive.trim());
		}
		if line.starts_with('#') {
			return Ok(());
		}

		match self.section {
			Section::Names => {
				if line == END_NAMES {
					self.section = Section::Body;
					Ok(())
				} else {
					self.official_name(number, line)
				}
			}
			Section::Header | Section::Body => {
				if line == BEGIN_NAMES {
					if self.names_seen {
						return Err(EngineError::fatal_at(number, "official names given twice"));
					}
					if !self.wants.is_empty() {
						return Err(EngineError::fatal_at(
							number,
							"official names must precede want-lines",
						));
					}
					self.names_seen = true;
					self.section = Section::Names;
					return Ok(());
				}
				if line == END_NAMES {
					return Err(EngineError::fatal_at(
						number,
						format!("{} without {}", END_NAMES, BEGIN_NAMES),
					));
				}
				self.section = Section::Body;
				self.want_line(number, line)
			}
		}
	}

	fn directive(&mut self, number: usize, directive: &str) -> Result<(), EngineError> {
		let (name, value) = match directive.split_once('=') {
			Some((name, value)) => (name.trim().to_ascii_uppercase(), Some(value.trim())),
			None => (directive.to_ascii_uppercase(), None),
		};

		let invalid = |what: &str| EngineError::fatal_at(number, format!("invalid {} directive", what));

		match (name.as_str(), value) {
			("CASE-SENSITIVE", None) => self.options.case_sensitive = true,
			("ALLOW-DUMMIES", None) => self.options.allow_dummies = true,
			("EXPLICIT-PRIORITIES", None) => self.options.explicit_priorities = true,
			("PRIORITIES", Some(value)) => {
				self.options.priority_scheme =
					PriorityScheme::parse(value).ok_or_else(|| invalid("PRIORITIES"))?;
			}
			("METRIC", Some(value)) => {
				self.options.metric = Metric::parse(value).ok_or_else(|| invalid("METRIC"))?;
			}
			("ITERATIONS", Some(value)) => {
				self.options.iterations = value.parse().map_err(|_| invalid("ITERATIONS"))?;
			}
			("SEED", Some(value)) => {
				self.options.seed = value.parse().map_err(|_| invalid("SEED"))?;
			}
			_ => {
				return Err(EngineError::fatal_at(
					number,
					format!("unknown option directive #!{}", directive),
				));
			}
		}
		Ok(())
	}

	fn official_name(&mut self, number: usize, line: &str) -> Result<(), EngineError> {
		let id = line.split_whitespace().next().unwrap_or_default();
		if id.starts_with(DUMMY_PREFIX) {
			return Err(EngineError::fatal_at(
				number,
				format!("dummy item {} cannot be an official name", id),
			));
		}

		let key = self.key(id);
		if self.item_index.contains_key(&key) {
			return Err(EngineError::fatal_at(
				number,
				format!("duplicate official name {}", id),
			));
		}

		self.item_index.insert(key, self.items.len());
		self.items.push(Item {
			name: id.to_string(),
			owner: None,
			dummy: false,
		});
		Ok(())
	}

	fn want_line(&mut self, number: usize, line: &str) -> Result<(), EngineError> {
		let malformed = || EngineError::fatal_at(number, format!("malformed want-line: {}", line));

		let rest = line.strip_prefix('(').ok_or_else(malformed)?;
		let (user, body) = rest.split_once(')').ok_or_else(malformed)?;
		let user = user.trim();
		if user.is_empty() || user.contains(char::is_whitespace) {
			return Err(malformed());
		}

		let (wanted_part, offered_part) = body.split_once(':').ok_or_else(malformed)?;
		if offered_part.contains(':') {
			return Err(malformed());
		}

		let mut wanted_tokens = wanted_part.split_whitespace();
		let wanted = wanted_tokens.next().ok_or_else(malformed)?;
		if wanted_tokens.next().is_some() {
			return Err(malformed());
		}

		let mut offered_tokens = offered_part.split_whitespace();
		let offered = offered_tokens.next().ok_or_else(malformed)?;
		let explicit_rank = offered_tokens.next();
		if offered_tokens.next().is_some() {
			return Err(malformed());
		}

		let rank = match (self.options.explicit_priorities, explicit_rank) {
			(true, Some(token)) => {
				let rank: u32 = token
					.strip_prefix('=')
					.and_then(|value| value.parse().ok())
					.ok_or_else(malformed)?;
				if rank == 0 {
					return Err(EngineError::fatal_at(number, "rank must be at least 1"));
				}
				Some(rank)
			}
			(true, None) => {
				return Err(EngineError::fatal_at(number, "missing explicit rank"));
			}
			(false, Some(_)) => return Err(malformed()),
			(false, None) => None,
		};

		if self.key(wanted) == self.key(offered) {
			return Err(EngineError::fatal_at(
				number,
				format!("item {} cannot want itself", offered),
			));
		}

		let user = self.user(user);
		let offered = self.resolve(number, offered, user)?;
		let wanted = self.resolve(number, wanted, user)?;

		match self.items[offered].owner {
			None => self.items[offered].owner = Some(user),
			Some(owner) if owner != user => {
				return Err(EngineError::fatal_at(
					number,
					format!(
						"item {} is offered by both {} and {}",
						self.items[offered].name, self.users[owner], self.users[user]
					),
				));
			}
			Some(_) => {}
		}

		let seen = self.seen_wants.entry(offered).or_default();
		if seen.contains(&wanted) {
			return Ok(());
		}
		seen.push(wanted);
		let rank = rank.unwrap_or(seen.len() as u32);

		self.wants.push(Want {
			offered,
			wanted,
			rank,
			line: number,
		});
		Ok(())
	}

	fn user(&mut self, name: &str) -> usize {
		let key = self.key(name);
		if let Some(&index) = self.user_index.get(&key) {
			return index;
		}
		let index = self.users.len();
		self.users.push(name.to_string());
		self.user_index.insert(key, index);
		index
	}

	/// Look up an item id, creating it when no official names were given.
	/// Dummy items are scoped to the user writing the want-line.
	fn resolve(&mut self, number: usize, id: &str, user: usize) -> Result<usize, EngineError> {
		if id.starts_with(DUMMY_PREFIX) {
			if !self.options.allow_dummies {
				return Err(EngineError::fatal_at(
					number,
					format!("dummy item {} used without #!ALLOW-DUMMIES", id),
				));
			}
			let key = (user, self.key(id));
			if let Some(&index) = self.dummy_index.get(&key) {
				return Ok(index);
			}
			let index = self.items.len();
			self.items.push(Item {
				name: id.to_string(),
				owner: Some(user),
				dummy: true,
			});
			self.dummy_index.insert(key, index);
			return Ok(index);
		}

		let key = self.key(id);
		if let Some(&index) = self.item_index.get(&key) {
			return Ok(index);
		}
		if self.names_seen {
			return Err(EngineError::fatal_at(number, format!("unknown item {}", id)));
		}

		let index = self.items.len();
		self.items.push(Item {
			name: id.to_string(),
			owner: None,
			dummy: false,
		});
		self.item_index.insert(key, index);
		Ok(index)
	}

	fn finish(self) -> Result<Problem, EngineError> {
		let Parser {
			options,
			items,
			users,
			wants,
			..
		} = self;

		let wants = wants
			.into_iter()
			.filter(|want| {
				let offered = &items[want.offered];
				let wanted = &items[want.wanted];
				match (offered.owner, wanted.owner) {
					// Never offered by anyone, can never move
					(_, None) => false,
					// A real item may only be received by another user. Wants
					// on the user's own dummies stay, they chain conditions.
					(Some(giver), Some(owner)) if giver == owner && !wanted.dummy => {
						warn!(
							target: "engine",
							line = want.line,
							user = %users[giver],
							offered = %offered.name,
							wanted = %wanted.name,
							"Dropping want for an item of the same user"
						);
						false
					}
					_ => true,
				}
			})
			.collect();

		Ok(Problem {
			options,
			items,
			users,
			wants,
		})
	}
}

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

//! Graph encoder producing the engine input protocol
//!
//! Pure: no I/O, never fails. Validation of the produced text is the
//! engine's job.

use std::{collections::HashMap, fmt::Write};

use barter_sdk::types::{Submission, WantEdge};

use crate::engine::EngineConfig;

/// Owner written for an edge whose offering submission is not in the list
pub const UNKNOWN_OWNER: &str = "unknown";

/// Directives emitted in the document header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderOptions {
	pub case_sensitive: bool,
	pub allow_dummies: bool,
	/// Append ` =<rank>` to every want-line
	pub explicit_priorities: bool,
}

impl Default for EncoderOptions {
	fn default() -> Self {
		Self::from(&EngineConfig::default())
	}
}

impl From<&EngineConfig> for EncoderOptions {
	fn from(config: &EngineConfig) -> Self {
		Self {
			case_sensitive: config.case_sensitive,
			allow_dummies: config.allow_dummies,
			explicit_priorities: config.explicit_priorities,
		}
	}
}

/// Encode submissions and want-edges into the engine input text
///
/// Submissions and edges are emitted in caller order.
pub fn encode(submissions: &[Submission], want_edges: &[WantEdge], options: &EncoderOptions) -> String {
	let mut out = String::new();

	if options.case_sensitive {
		out.push_str("#!CASE-SENSITIVE\n");
	}
	if options.allow_dummies {
		out.push_str("#!ALLOW-DUMMIES\n");
	}
	if options.explicit_priorities {
		out.push_str("#!EXPLICIT-PRIORITIES\n");
	}
	out.push('\n');

	out.push_str("!BEGIN-OFFICIAL-NAMES\n");
	for submission in submissions {
		// Writing to a String cannot fail
		let _ = writeln!(out, "{} {}", submission.id, sanitize_title(&submission.title));
	}
	out.push_str("!END-OFFICIAL-NAMES\n\n");

	let owners: HashMap<&str, &str> = submissions
		.iter()
		.map(|s| (s.id.as_str(), s.user_id.as_str()))
		.collect();

	for edge in want_edges {
		let owner = owners
			.get(edge.offered_submission_id.as_str())
			.copied()
			.unwrap_or(UNKNOWN_OWNER);

		let _ = write!(
			out,
			"({}) {} : {}",
			owner, edge.wanted_submission_id, edge.offered_submission_id
		);
		if options.explicit_priorities {
			let _ = write!(out, " ={}", edge.rank);
		}
		out.push('\n');
	}

	out
}

/// Make a title safe for the official-names block
///
/// Parentheses are removed and colons replaced with hyphens, since both are
/// structural in want-lines.
pub fn sanitize_title(title: &str) -> String {
	title
		.chars()
		.filter(|c| *c != '(' && *c != ')')
		.map(|c| if c == ':' { '-' } else { c })
		.collect::<String>()
		.trim()
		.to_string()
}

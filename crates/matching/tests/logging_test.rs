//! Integration test for the logging system
//!
//! Installs the global subscriber once, so this file holds a single test.
//! Verifies:
//! - Log directory and daily file creation under `LOG_DIR`
//! - Startup lines and structured fields from a matching run

use std::{fs, path::Path, sync::Arc, thread, time::Duration};

use barter_matching::{
	MatchingConfig, MatchingOrchestrator, MemoryMatchStore, NotificationQueue, logging,
};
use barter_sdk::types::{Party, Submission, WantEdge};

fn read_logs(dir: &Path) -> String {
	let Ok(entries) = fs::read_dir(dir) else {
		return String::new();
	};
	entries
		.filter_map(|e| e.ok())
		.map(|e| e.path())
		.filter(|p| p.extension().and_then(|ext| ext.to_str()) == Some("log"))
		.filter_map(|p| fs::read_to_string(p).ok())
		.collect::<Vec<_>>()
		.join("\n")
}

#[test]
fn test_log_file_creation_and_content() {
	let root = tempfile::tempdir().unwrap();
	unsafe {
		std::env::set_var("LOG_DIR", root.path());
		std::env::set_var("LOG_TO_CONSOLE", "false");
		std::env::set_var("RUST_LOG", "info");
	}

	logging::init_logging().unwrap();
	let log_dir = logging::log_dir();
	assert_eq!(log_dir, root.path().join("matching"));
	assert!(log_dir.exists());

	let store = Arc::new(MemoryMatchStore::new());
	store.insert_party(Party::new("p1", "Logging Swap", "org"));
	store.insert_submission("p1", Submission::new("sub1", "Wingspan", "alice"));
	store.insert_submission("p1", Submission::new("sub2", "Azul", "bob"));
	store.insert_want_edge("p1", WantEdge::new("sub1", "sub2", 1));
	store.insert_want_edge("p1", WantEdge::new("sub2", "sub1", 1));

	let (producer, _consumer) = NotificationQueue::new(16).split();
	let orchestrator = MatchingOrchestrator::new(store, producer, MatchingConfig::default());
	orchestrator.run_preview("p1").unwrap();

	// The file writer is non-blocking; give it a moment to catch up
	let mut content = String::new();
	for _ in 0..100 {
		content = read_logs(&log_dir);
		if content.contains("Matching preview complete") {
			break;
		}
		thread::sleep(Duration::from_millis(20));
	}

	assert!(content.contains("Log level"));
	assert!(content.contains("Optimization complete"));
	assert!(content.contains("Matching preview complete"));
	assert!(content.contains("party_id=\"p1\"") || content.contains("party_id=p1"));
	assert!(content.contains("ThreadId("));
}

/*!
 * Tests for video id parsing and input resolution
 */

use anyhow::Result;
use teamgrab::identifiers::{self, VIDEO_ID_LEN, VideoId};
use teamgrab::reporter::MemoryReporter;

use crate::common;

/// Test that literal ids and id files can be mixed
#[test]
fn test_resolve_withFileAndLiteral_shouldKeepInputOrder() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let list = common::create_test_file(temp_dir.path(), "ids.txt", "Q9w8E7r6T5y\nP0o9I8u7Y6t\n")?;
    let reporter = MemoryReporter::new();

    let inputs = vec![
        "A1b2C3d4E5f".to_string(),
        list.to_string_lossy().to_string(),
        "M1n2B3v4C5x".to_string(),
    ];
    let ids = identifiers::resolve(&inputs, &reporter);

    let raw: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
    assert_eq!(raw, vec!["A1b2C3d4E5f", "Q9w8E7r6T5y", "P0o9I8u7Y6t", "M1n2B3v4C5x"]);
    assert!(reporter.warnings().is_empty());
    Ok(())
}

/// Test that an input neither file nor id is reported and dropped
#[test]
fn test_resolve_withUnknownArg_shouldWarnAndContinue() {
    let reporter = MemoryReporter::new();

    let ids = identifiers::resolve(&["not-an-id", "Z2Qz9pK3xQ1"], &reporter);

    assert_eq!(ids.len(), 1);
    let warnings = reporter.warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("not-an-id"));
    assert!(warnings[0].contains("is not a file nor seems to be a video id"));
}

/// Test that blank lines are ignored without a warning
#[test]
fn test_resolve_withBlankLines_shouldIgnoreThemSilently() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let list = common::create_test_file(temp_dir.path(), "ids.txt", "\nZ2Qz9pK3xQ1\n\n\r\n")?;
    let reporter = MemoryReporter::new();

    let ids = identifiers::resolve(&[list.to_string_lossy()], &reporter);

    assert_eq!(ids.len(), 1);
    assert!(reporter.warnings().is_empty());
    Ok(())
}

/// Test that ids are counted in characters, not bytes
#[test]
fn test_parse_withMultibyteChars_shouldCountCharacters() {
    let id = "é".repeat(VIDEO_ID_LEN);
    assert!(VideoId::parse(&id).is_some());
    assert!(VideoId::parse(&"é".repeat(VIDEO_ID_LEN - 1)).is_none());
}

/// Test that a repeated id is kept twice and reported
#[test]
fn test_resolve_withDuplicates_shouldKeepBothAndWarn() {
    let reporter = MemoryReporter::new();

    let ids = identifiers::resolve(&["Z2Qz9pK3xQ1", "Z2Qz9pK3xQ1"], &reporter);

    assert_eq!(ids.len(), 2);
    assert!(reporter.warnings()[0].contains("more than once"));
}

/// Test that no inputs give no ids
#[test]
fn test_resolve_withNoInputs_shouldReturnEmpty() {
    let reporter = MemoryReporter::new();
    let inputs: Vec<String> = Vec::new();
    assert!(identifiers::resolve(&inputs, &reporter).is_empty());
}

/*!
 * Tests for the per-video directory layout
 */

use anyhow::Result;
use std::fs;
use teamgrab::identifiers::VideoId;
use teamgrab::workspace::VideoWorkspace;

use crate::common;

fn id(raw: &str) -> VideoId {
    VideoId::parse(raw).expect("test id must be valid")
}

/// Test that the artifact pattern follows the configuration
#[test]
fn test_from_config_withCustomArtifacts_shouldMatchConfiguredPattern() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut config = common::test_config(temp_dir.path(), 1);
    config.artifacts.prefix = "player_".to_string();
    config.artifacts.suffix = ".jpg".to_string();
    let workspace = VideoWorkspace::from_config(&config)?;
    let video = id("Z2Qz9pK3xQ1");

    let dir = workspace.ensure_dir(&video)?;
    fs::write(dir.join("player_1.jpg"), b"x")?;
    fs::write(dir.join("team_1.png"), b"x")?;

    let artifacts = workspace.list_artifacts(&video)?;
    assert_eq!(artifacts, vec![dir.join("player_1.jpg")]);
    Ok(())
}

/// Test that issues accumulate across calls
#[test]
fn test_append_issue_withTwoLines_shouldAppendBoth() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = common::test_config(temp_dir.path(), 1);
    let workspace = VideoWorkspace::from_config(&config)?;
    workspace.ensure_root()?;

    workspace.append_issue("issues.log", "Z2Qz9pK3xQ1: download failed")?;
    let path = workspace.append_issue("issues.log", "A1b2C3d4E5f: extraction failed")?;

    let content = fs::read_to_string(path)?;
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("Z2Qz9pK3xQ1: download failed"));
    assert!(lines[1].ends_with("A1b2C3d4E5f: extraction failed"));
    Ok(())
}

/// Test that artifacts are listed in name order
#[test]
fn test_list_artifacts_withUnorderedFiles_shouldSortByName() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = common::test_config(temp_dir.path(), 1);
    let workspace = VideoWorkspace::from_config(&config)?;
    let video = id("Z2Qz9pK3xQ1");
    let dir = common::seed_artifacts(&config, video.as_str(), 0)?;
    for name in ["team_c.png", "team_a.png", "team_b.png"] {
        fs::write(dir.join(name), b"x")?;
    }

    let names: Vec<String> = workspace
        .list_artifacts(&video)?
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .collect();

    assert_eq!(names, vec!["team_a.png", "team_b.png", "team_c.png"]);
    Ok(())
}

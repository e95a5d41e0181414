//! Tests for ContextBuilder

use parlance_agent::{ContextBuilder, ToolDescription, ToolResult};
use std::fs;
use tempfile::TempDir;

fn tools() -> Vec<ToolDescription> {
    vec![
        ToolDescription {
            name: "read_file".into(),
            description: "Read a file.".into(),
            usage: "<path>".into(),
        },
        ToolDescription {
            name: "search_web".into(),
            description: "Search the web.".into(),
            usage: "<query>".into(),
        },
    ]
}

#[tokio::test]
async fn test_system_prompt_identity() {
    let temp = TempDir::new().unwrap();
    let builder = ContextBuilder::new("Parlance", "You help people.", temp.path());

    let prompt = builder.build_system_prompt(&[]).await;
    assert!(prompt.starts_with("# Parlance"));
    assert!(prompt.contains("You help people."));
    assert!(prompt.contains("## Current Time"));
    assert!(prompt.contains(&temp.path().display().to_string()));
    assert!(!prompt.contains("## Tools"));
}

#[tokio::test]
async fn test_system_prompt_lists_tools_and_marker() {
    let temp = TempDir::new().unwrap();
    let builder = ContextBuilder::new("Parlance", "x", temp.path());

    let prompt = builder.build_system_prompt(&tools()).await;
    assert!(prompt.contains("## Tools"));
    assert!(prompt.contains("- read_file <path>: Read a file."));
    assert!(prompt.contains("- search_web <query>: Search the web."));
    assert!(prompt.contains("TOOL: <name>: <argument>"));
}

#[tokio::test]
async fn test_system_prompt_includes_persona() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("PERSONA.md"), "Always answer in Portuguese.").unwrap();

    let builder = ContextBuilder::new("Parlance", "x", temp.path());
    let prompt = builder.build_system_prompt(&[]).await;
    assert!(prompt.contains("## PERSONA.md"));
    assert!(prompt.contains("Always answer in Portuguese."));
}

#[tokio::test]
async fn test_system_prompt_ignores_blank_persona() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("PERSONA.md"), "   \n").unwrap();

    let builder = ContextBuilder::new("Parlance", "x", temp.path());
    assert!(!builder.build_system_prompt(&[]).await.contains("PERSONA.md"));
}

#[test]
fn test_follow_up_prompt_success() {
    let result = ToolResult::success("search_web", "Paris");
    let prompt = ContextBuilder::follow_up_prompt("Capital of France?", &result);
    assert!(prompt.contains("The tool search_web returned the result above."));
    assert!(prompt.contains("Capital of France?"));
}

#[test]
fn test_follow_up_prompt_failure() {
    let result = ToolResult::failure("read_file", "not found: x.txt");
    let prompt = ContextBuilder::follow_up_prompt("Read x.txt", &result);
    assert!(prompt.contains("The tool read_file failed: not found: x.txt"));
}

//! Tests for the read_file tool

use parlance_agent::tools::{Capability, ReadFileTool, ToolError};
use std::fs;
use tempfile::TempDir;

fn tool(workspace: &std::path::Path) -> ReadFileTool {
    ReadFileTool::new(workspace.to_path_buf(), true, 10_000)
}

#[tokio::test]
async fn test_read_file_relative_to_workspace() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("notes.txt"), "line one\nline two").unwrap();

    let out = tool(temp.path()).invoke("notes.txt").await.unwrap();
    assert_eq!(out, "line one\nline two");
}

#[tokio::test]
async fn test_read_file_absolute_inside_workspace() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("a.md");
    fs::write(&path, "# title").unwrap();

    let out = tool(temp.path())
        .invoke(path.to_str().unwrap())
        .await
        .unwrap();
    assert_eq!(out, "# title");
}

#[tokio::test]
async fn test_read_file_strips_quotes() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("q.txt"), "quoted").unwrap();

    let out = tool(temp.path()).invoke(" \"q.txt\" ").await.unwrap();
    assert_eq!(out, "quoted");
}

#[tokio::test]
async fn test_read_file_missing() {
    let temp = TempDir::new().unwrap();

    let result = tool(temp.path()).invoke("missing.txt").await;
    match result {
        Err(ToolError::NotFound(p)) => assert_eq!(p, "missing.txt"),
        other => panic!("Expected NotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_read_file_directory_rejected() {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("sub")).unwrap();

    let result = tool(temp.path()).invoke("sub").await;
    assert!(matches!(result, Err(ToolError::InvalidArgument(_))));
}

#[tokio::test]
async fn test_read_file_empty_argument() {
    let temp = TempDir::new().unwrap();
    let result = tool(temp.path()).invoke("   ").await;
    assert!(matches!(result, Err(ToolError::InvalidArgument(_))));
}

#[tokio::test]
async fn test_read_file_outside_workspace_blocked() {
    let temp = TempDir::new().unwrap();
    let workspace = temp.path().join("ws");
    fs::create_dir(&workspace).unwrap();
    fs::write(temp.path().join("secret.txt"), "secret").unwrap();

    let result = tool(&workspace).invoke("../secret.txt").await;
    let err = result.unwrap_err();
    assert!(matches!(err, ToolError::OutsideWorkspace { .. }));
    assert!(err.to_string().contains("is outside workspace"));
}

#[tokio::test]
async fn test_read_file_unrestricted_allows_outside() {
    let temp = TempDir::new().unwrap();
    let workspace = temp.path().join("ws");
    fs::create_dir(&workspace).unwrap();
    let outside = temp.path().join("shared.txt");
    fs::write(&outside, "shared").unwrap();

    let tool = ReadFileTool::new(workspace, false, 10_000);
    let out = tool.invoke(outside.to_str().unwrap()).await.unwrap();
    assert_eq!(out, "shared");
}

#[tokio::test]
async fn test_read_file_truncates_large_output() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("big.txt"), "a".repeat(500)).unwrap();

    let tool = ReadFileTool::new(temp.path().to_path_buf(), true, 100);
    let out = tool.invoke("big.txt").await.unwrap();
    assert!(out.starts_with(&"a".repeat(100)));
    assert!(out.contains("400 more characters"));
}

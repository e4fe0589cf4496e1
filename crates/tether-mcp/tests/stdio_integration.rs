//! Integration tests driving the registry against a scripted stdio server.
//!
//! The server is `tests/fixtures/mock_server.sh`, run under bash; its first
//! argument selects how it answers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tether_mcp::{Content, McpError, McpRegistry, McpServerConfig, Role, TransportKind};
use tokio::time::timeout;

fn fixture(mode: &str) -> McpServerConfig {
    let script = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/mock_server.sh");
    McpServerConfig {
        timeout_ms: 10_000,
        ..McpServerConfig::stdio("bash", vec![script.to_string(), mode.to_string()])
    }
}

#[tokio::test]
async fn connect_list_tools_disconnect() {
    let registry = McpRegistry::new();
    let client = registry.connect("srv", &fixture("ok")).await.unwrap();
    assert_eq!(client.transport_kind(), TransportKind::Stdio);
    assert_eq!(client.server_info().name, "mock");
    assert_eq!(client.server_info().version, "0.1.0");
    assert_eq!(client.server_info().protocol_version, "2024-11-05");

    let tools = client.list_tools().await.unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["echo", "add"]);
    assert_eq!(tools[0].description, "Echo text back");
    assert_eq!(tools[0].input_schema["properties"]["text"]["type"], "string");

    registry.disconnect("srv").await.unwrap();
    assert!(matches!(
        registry.get_client("srv").await,
        Err(McpError::NotFound { .. })
    ));
    assert!(registry.list_connections().await.is_empty());
}

#[tokio::test]
async fn tool_call_returns_text_content() {
    let registry = McpRegistry::new();
    let client = registry.connect("srv", &fixture("ok")).await.unwrap();

    let result = client
        .call_tool("echo", serde_json::json!({"text": "hi"}))
        .await
        .unwrap();
    assert!(!result.is_error);
    assert_eq!(result.content.len(), 1);
    assert_eq!(result.content[0].kind(), "text");
    assert_eq!(result.content[0].as_text(), Some("ok"));

    registry.disconnect_all().await.unwrap();
}

#[tokio::test]
async fn rpc_error_exposes_code_and_message() {
    let registry = McpRegistry::new();
    let client = registry.connect("srv", &fixture("rpc-error")).await.unwrap();

    match client.list_tools().await {
        Err(McpError::JsonRpc {
            server,
            code,
            message,
            ..
        }) => {
            assert_eq!(server, "srv");
            assert_eq!(code, -32601);
            assert_eq!(message, "Method not found");
        }
        other => panic!("Expected JsonRpc error, got: {other:?}"),
    }

    // The connection stays in step after a protocol error.
    let err = client.ping().await.unwrap_err();
    assert_eq!(err.rpc_code(), Some(-32601));
    registry.disconnect_all().await.unwrap();
}

#[tokio::test]
async fn duplicate_key_keeps_the_original_connection() {
    let registry = McpRegistry::new();
    let first = registry.connect("srv", &fixture("ok")).await.unwrap();

    match registry.connect("srv", &fixture("echo-id")).await {
        Err(McpError::AlreadyConnected { key }) => assert_eq!(key, "srv"),
        Err(other) => panic!("Expected AlreadyConnected, got: {other:?}"),
        Ok(_) => panic!("Expected error, got Ok"),
    }

    let current = registry.get_client("srv").await.unwrap();
    assert!(Arc::ptr_eq(&first, &current));
    // Still the "ok" server, not the rejected "echo-id" one.
    let result = current.call_tool("echo", serde_json::json!({})).await.unwrap();
    assert_eq!(result.content[0].as_text(), Some("ok"));

    registry.disconnect_all().await.unwrap();
}

#[tokio::test]
async fn request_ids_count_up_per_connection() {
    let registry = McpRegistry::new();
    let a = registry.connect("a", &fixture("echo-id")).await.unwrap();
    let b = registry.connect("b", &fixture("echo-id")).await.unwrap();

    // initialize took id 1 on each connection; the notification takes none.
    for expected in 2..=5 {
        let result = a.call_tool("echo", serde_json::Value::Null).await.unwrap();
        assert_eq!(result.content[0].as_text(), Some(expected.to_string().as_str()));
    }
    let result = b.call_tool("echo", serde_json::Value::Null).await.unwrap();
    assert_eq!(result.content[0].as_text(), Some("2"));

    registry.disconnect_all().await.unwrap();
}

#[tokio::test]
async fn concurrent_calls_on_one_connection_are_serialized() {
    let registry = McpRegistry::new();
    let client = registry.connect("srv", &fixture("echo-id")).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let client = Arc::clone(&client);
        handles.push(tokio::spawn(async move {
            client
                .call_tool("echo", serde_json::json!({}))
                .await
                .unwrap()
                .content[0]
                .as_text()
                .unwrap()
                .parse::<u64>()
                .unwrap()
        }));
    }
    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.sort();
    assert_eq!(ids, (2..=9).collect::<Vec<u64>>());

    registry.disconnect_all().await.unwrap();
}

#[tokio::test]
async fn resources_and_prompts() {
    let registry = McpRegistry::new();
    let client = registry.connect("srv", &fixture("ok")).await.unwrap();

    let resources = client.list_resources().await.unwrap();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].uri, "file:///readme.md");
    assert_eq!(resources[0].mime_type.as_deref(), Some("text/markdown"));

    let contents = client.read_resource("file:///readme.md").await.unwrap();
    assert_eq!(
        contents,
        vec![
            Content::Text {
                text: "# hello".into()
            },
            Content::Binary {
                data: "iVBORw==".into(),
                mime_type: "image/png".into()
            },
        ]
    );

    let prompts = client.list_prompts().await.unwrap();
    assert_eq!(prompts[0].name, "greet");
    assert!(prompts[0].arguments[0].required);

    let mut args = HashMap::new();
    args.insert("who".to_string(), "world".to_string());
    let rendered = client.get_prompt("greet", &args).await.unwrap();
    assert_eq!(rendered.description.as_deref(), Some("Greeting"));
    assert_eq!(rendered.messages.len(), 1);
    assert_eq!(rendered.messages[0].role, Role::User);
    assert_eq!(rendered.messages[0].content.as_text(), Some("hello"));

    registry.disconnect_all().await.unwrap();
}

#[tokio::test]
async fn absent_list_fields_are_empty() {
    let registry = McpRegistry::new();
    let client = registry.connect("srv", &fixture("empty")).await.unwrap();
    assert!(client.list_tools().await.unwrap().is_empty());
    assert!(client.list_resources().await.unwrap().is_empty());
    assert!(client.list_prompts().await.unwrap().is_empty());
    registry.disconnect_all().await.unwrap();
}

#[tokio::test]
async fn list_tools_follows_cursor() {
    let registry = McpRegistry::new();
    let client = registry.connect("srv", &fixture("paged")).await.unwrap();
    let tools = client.list_tools().await.unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["echo", "add"]);
    registry.disconnect_all().await.unwrap();
}

#[tokio::test]
async fn cycling_cursors_stop_the_walk() {
    let registry = McpRegistry::new();
    let client = registry.connect("srv", &fixture("cycle")).await.unwrap();
    let tools = client.list_tools().await.unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["first", "a", "b"]);
    registry.disconnect_all().await.unwrap();
}

#[tokio::test]
async fn server_chatter_is_skipped() {
    let registry = McpRegistry::new();
    let client = registry.connect("srv", &fixture("noise")).await.unwrap();
    assert_eq!(client.list_tools().await.unwrap().len(), 2);
    client.ping().await.unwrap();
    registry.disconnect_all().await.unwrap();
}

#[tokio::test]
async fn failed_handshake_leaves_registry_untouched() {
    let registry = McpRegistry::new();
    registry.connect("good", &fixture("ok")).await.unwrap();

    match registry.connect("bad", &fixture("bad-init")).await {
        Err(McpError::JsonRpc { code, message, .. }) => {
            assert_eq!(code, -32602);
            assert_eq!(message, "Unsupported protocol version");
        }
        Err(other) => panic!("Expected JsonRpc error, got: {other:?}"),
        Ok(_) => panic!("Expected error, got Ok"),
    }
    match registry.connect("odd", &fixture("odd-init")).await {
        Err(McpError::Protocol(msg)) => assert!(msg.contains("initialize")),
        Err(other) => panic!("Expected Protocol error, got: {other:?}"),
        Ok(_) => panic!("Expected error, got Ok"),
    }

    assert_eq!(registry.list_connections().await, vec!["good".to_string()]);
    registry.disconnect_all().await.unwrap();
}

#[tokio::test]
async fn connections_snapshot_tracks_connects_and_disconnects() {
    let registry = McpRegistry::new();
    for key in ["a", "b", "c", "d"] {
        registry.connect(key, &fixture("ok")).await.unwrap();
    }
    registry.disconnect("b").await.unwrap();
    registry.disconnect("d").await.unwrap();

    assert_eq!(
        registry.list_connections().await,
        vec!["a".to_string(), "c".to_string()]
    );

    registry.disconnect_all().await.unwrap();
    assert!(registry.list_connections().await.is_empty());
}

#[tokio::test]
async fn closed_client_refuses_calls() {
    let registry = McpRegistry::new();
    let client = registry.connect("srv", &fixture("ok")).await.unwrap();
    registry.disconnect("srv").await.unwrap();

    // A caller still holding the Arc sees a dead connection, not a hang.
    assert!(matches!(
        client.list_tools().await,
        Err(McpError::ServerNotRunning { .. })
    ));
    client.close().await.unwrap();
}

#[tokio::test]
async fn disconnect_cancels_an_in_flight_call() {
    let registry = McpRegistry::new();
    let config = McpServerConfig {
        timeout_ms: 0,
        ..fixture("silent")
    };
    let client = registry.connect("srv", &config).await.unwrap();

    let pending = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.list_tools().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    timeout(Duration::from_secs(3), registry.disconnect_all())
        .await
        .expect("disconnect_all waited for the in-flight call")
        .unwrap();
    let result = timeout(Duration::from_secs(3), pending)
        .await
        .expect("in-flight call never finished")
        .unwrap();
    assert!(matches!(result, Err(McpError::ServerNotRunning { .. })));
    assert!(registry.list_connections().await.is_empty());
}

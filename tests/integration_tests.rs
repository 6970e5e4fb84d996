//! Integration tests for the MCP tool server
//!
//! These tests drive the protocol end to end: raw JSON-RPC envelopes through
//! a server connection, and the client over in-process and TCP transports.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;

use mcp_tool_server::config::Config;
use mcp_tool_server::error::{ClientError, ToolError};
use mcp_tool_server::mcp::client::McpClient;
use mcp_tool_server::mcp::registry::{Arguments, ToolRegistry};
use mcp_tool_server::mcp::server::{serve_tcp, Connection, Server};
use mcp_tool_server::mcp::transport::{InProcessTransport, TcpTransport};

/// Helper to create a JSON-RPC request
fn make_request(id: i64, method: &str, params: Option<Value>) -> Value {
    let mut request = json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
    });
    if let Some(p) = params {
        request["params"] = p;
    }
    request
}

/// Send a request through a connection and parse the response
fn send(connection: &mut Connection, request: Value) -> Value {
    serde_json::from_str(&connection.handle(&request.to_string()))
        .expect("Failed to parse JSON response")
}

fn builtin_server() -> (Server, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let server = Server::new(Config::with_work_dir(dir.path())).unwrap();
    (server, dir)
}

fn init_params() -> Value {
    json!({
        "protocolVersion": "2024-11-05",
        "clientInfo": {"name": "test-client", "version": "1.0.0"},
        "capabilities": {}
    })
}

mod mcp_protocol_tests {
    use super::*;

    #[test]
    fn test_methods_fail_before_initialize_then_succeed() {
        let (server, _dir) = builtin_server();
        let mut connection = server.connect();

        let list = make_request(1, "tools/list", None);
        let call = make_request(
            2,
            "tools/call",
            Some(json!({"name": "calculate", "arguments": {"expression": "1 + 1"}})),
        );

        for request in [&list, &call] {
            let response = send(&mut connection, request.clone());
            assert_eq!(response["error"]["code"], -32002);
            assert!(response["error"]["message"].as_str().unwrap().contains("not initialized"));
        }

        let response = send(&mut connection, make_request(3, "initialize", Some(init_params())));
        assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
        assert!(response["result"]["capabilities"]["tools"].is_object());

        for request in [list, call] {
            let response = send(&mut connection, request);
            assert!(response["result"].is_object());
            assert!(response.get("error").is_none());
        }
    }

    #[test]
    fn test_second_initialize_fails() {
        let (server, _dir) = builtin_server();
        let mut connection = server.connect();

        send(&mut connection, make_request(1, "initialize", Some(init_params())));
        let response = send(&mut connection, make_request(2, "initialize", Some(init_params())));
        assert_eq!(response["id"], 2);
        assert!(response["error"]["message"]
            .as_str()
            .unwrap()
            .contains("already initialized"));

        // session remains usable
        let response = send(&mut connection, make_request(3, "tools/list", None));
        assert!(response["result"]["tools"].is_array());
    }

    #[test]
    fn test_response_echoes_string_id() {
        let (server, _dir) = builtin_server();
        let mut connection = server.connect();
        let response = send(
            &mut connection,
            json!({"jsonrpc": "2.0", "id": "req-1", "method": "initialize"}),
        );
        assert_eq!(response["id"], "req-1");
        assert!(response.get("error").is_none());
    }

    #[test]
    fn test_unknown_method() {
        let (server, _dir) = builtin_server();
        let mut connection = server.connect();
        let response = send(&mut connection, make_request(1, "prompts/list", None));
        assert_eq!(response["error"]["code"], -32601);
        assert!(response.get("result").is_none());
    }

    #[test]
    fn test_tools_list_shape() {
        let (server, _dir) = builtin_server();
        let mut connection = server.connect();
        send(&mut connection, make_request(1, "initialize", Some(init_params())));

        let response = send(&mut connection, make_request(2, "tools/list", None));
        let tools = response["result"]["tools"].as_array().unwrap();
        let calculate = tools.iter().find(|t| t["name"] == "calculate").unwrap();
        assert_eq!(calculate["parameters"]["expression"]["type"], "string");
        assert_eq!(calculate["parameters"]["expression"]["required"], true);
        assert!(calculate["description"].is_string());
        assert!(calculate.get("handler").is_none());
    }
}

mod dispatch_tests {
    use super::*;

    fn counting_server(counter: Arc<AtomicUsize>) -> Server {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                "greet",
                "Greets someone",
                &json!({
                    "type": "object",
                    "properties": {
                        "name": {"type": "string", "description": "Who to greet"},
                        "times": {"type": "integer", "description": "Repetitions"}
                    },
                    "required": ["name"]
                }),
                move |args: &Arguments| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    let name = args["name"].as_str().unwrap_or_default();
                    Ok(json!(format!("hello {}", name)))
                },
            )
            .unwrap();
        registry
            .register(
                "broken",
                "Always fails",
                &json!({"type": "object", "properties": {}}),
                |_: &Arguments| Err(ToolError::Failed("disk on fire".to_string())),
            )
            .unwrap();
        Server::with_registry(registry, &Config::with_work_dir("/tmp"))
    }

    fn ready(server: &Server) -> Connection {
        let mut connection = server.connect();
        send(&mut connection, make_request(0, "initialize", Some(init_params())));
        connection
    }

    #[test]
    fn test_list_matches_registered_names() {
        let server = counting_server(Arc::new(AtomicUsize::new(0)));
        let mut connection = ready(&server);

        let response = send(&mut connection, make_request(1, "tools/list", None));
        let names: Vec<&str> = response["result"]["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();

        let unique: HashSet<&str> = names.iter().copied().collect();
        assert_eq!(names.len(), unique.len());

        let registered = server.registry().names();
        let registered: HashSet<&str> = registered.iter().map(String::as_str).collect();
        assert_eq!(unique, registered);
        assert_eq!(names, vec!["greet", "broken"]);
    }

    #[test]
    fn test_unknown_tool_never_invokes_handler() {
        let counter = Arc::new(AtomicUsize::new(0));
        let server = counting_server(counter.clone());
        let mut connection = ready(&server);

        let response = send(
            &mut connection,
            make_request(1, "tools/call", Some(json!({"name": "greeet", "arguments": {"name": "x"}}))),
        );
        assert_eq!(response["error"]["code"], -32803);
        assert!(response.get("result").is_none());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_missing_required_never_invokes_handler() {
        let counter = Arc::new(AtomicUsize::new(0));
        let server = counting_server(counter.clone());
        let mut connection = ready(&server);

        let cases = [
            json!({"times": 2}),
            json!({"name": 5}),
            json!({"name": "x", "times": 1.5}),
            json!({"name": "x", "color": "red"}),
        ];
        for arguments in cases {
            let response = send(
                &mut connection,
                make_request(1, "tools/call", Some(json!({"name": "greet", "arguments": arguments}))),
            );
            assert_eq!(response["error"]["code"], -32602);
        }
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        let response = send(
            &mut connection,
            make_request(2, "tools/call", Some(json!({"name": "greet", "arguments": {"name": "x", "times": 2}}))),
        );
        assert_eq!(response["result"]["content"][0]["text"], "hello x");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_failure_is_tool_level() {
        let server = counting_server(Arc::new(AtomicUsize::new(0)));
        let mut connection = ready(&server);

        let response = send(
            &mut connection,
            make_request(1, "tools/call", Some(json!({"name": "broken", "arguments": {}}))),
        );
        assert!(response.get("error").is_none());
        assert_eq!(response["result"]["isError"], true);
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("disk on fire"));
    }
}

mod client_tests {
    use super::*;

    async fn ready_client(server: &Server) -> McpClient<InProcessTransport> {
        let mut client = McpClient::new(InProcessTransport::new(server));
        client.initialize().await.unwrap();
        client
    }

    #[tokio::test]
    async fn test_calculate_round_trip() {
        let (server, _dir) = builtin_server();
        let mut client = ready_client(&server).await;

        let result = client
            .call_tool("calculate", json!({"expression": "10 + 5 * 2"}))
            .await
            .unwrap();
        assert!(!result.is_error);
        let value: f64 = result.text_content().parse().unwrap();
        assert_eq!(value, 20.0);
    }

    #[tokio::test]
    async fn test_calculate_rejects_code() {
        let (server, _dir) = builtin_server();
        let mut client = ready_client(&server).await;

        let result = client
            .call_tool("calculate", json!({"expression": "import os"}))
            .await
            .unwrap();
        assert!(result.is_error);
        assert!(result.text_content().contains("Invalid argument"));
    }

    #[tokio::test]
    async fn test_division_by_zero_is_tool_error() {
        let (server, _dir) = builtin_server();
        let mut client = ready_client(&server).await;

        let result = client
            .call_tool("calculate", json!({"expression": "1 / 0"}))
            .await
            .unwrap();
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn test_write_then_read_file() {
        let (server, dir) = builtin_server();
        let mut client = ready_client(&server).await;

        let written = client
            .call_tool("write_file", json!({"path": "t.txt", "content": "hi"}))
            .await
            .unwrap();
        assert!(!written.is_error);
        assert!(dir.path().join("t.txt").is_file());

        let read = client.call_tool("read_file", json!({"path": "t.txt"})).await.unwrap();
        assert!(!read.is_error);
        assert_eq!(read.text_content(), "hi");
    }

    #[tokio::test]
    async fn test_read_missing_file_is_tool_error() {
        let (server, _dir) = builtin_server();
        let mut client = ready_client(&server).await;

        let result = client
            .call_tool("read_file", json!({"path": "missing.txt"}))
            .await
            .unwrap();
        assert!(result.is_error);
        assert!(result.text_content().contains("missing.txt"));
    }

    #[tokio::test]
    async fn test_current_time() {
        let (server, _dir) = builtin_server();
        let mut client = ready_client(&server).await;

        let result = client.call_tool("get_current_time", json!({})).await.unwrap();
        assert!(!result.is_error);
        let body: Value = serde_json::from_str(&result.text_content()).unwrap();
        assert_eq!(body["format"], "iso");
        assert!(body["timestamp"].is_i64());
    }

    #[tokio::test]
    async fn test_protocol_errors_raised_distinctly() {
        let (server, _dir) = builtin_server();
        let mut client = ready_client(&server).await;

        let err = client.call_tool("no_such_tool", json!({})).await.unwrap_err();
        assert!(matches!(err, ClientError::Protocol { code: -32803, .. }));

        let err = client.call_tool("read_file", json!({})).await.unwrap_err();
        assert_eq!(err.protocol_code(), Some(-32602));

        // session still Ready after protocol errors
        assert!(client.call_tool("calculate", json!({"expression": "2"})).await.is_ok());
    }

    #[tokio::test]
    async fn test_discover_tools_replaces_cache() {
        let (server, _dir) = builtin_server();
        let mut client = ready_client(&server).await;
        assert!(client.tools().is_empty());

        let names: Vec<String> = client
            .discover_tools()
            .await
            .unwrap()
            .iter()
            .map(|t| t.name.clone())
            .collect();
        assert_eq!(names, vec!["read_file", "write_file", "calculate", "get_current_time"]);

        client.discover_tools().await.unwrap();
        assert_eq!(client.tools().len(), 4);
        assert!(client.tool("calculate").is_some());
        assert_eq!(client.info().available_tools_count, 4);
    }

    #[tokio::test]
    async fn test_client_requires_initialize() {
        let (server, _dir) = builtin_server();
        let mut client = McpClient::new(InProcessTransport::new(&server));

        let err = client.discover_tools().await.unwrap_err();
        assert!(matches!(err, ClientError::NotInitialized));
        assert!(!client.transport().connection().is_initialized());
    }

    #[tokio::test]
    async fn test_client_over_tcp_sessions_are_independent() {
        let (server, _dir) = builtin_server();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve_tcp(server, listener));

        let mut first = McpClient::new(TcpTransport::connect(addr).await.unwrap());
        let mut second = McpClient::new(TcpTransport::connect(addr).await.unwrap());

        first.initialize().await.unwrap();
        second.initialize().await.unwrap();

        let a = first.call_tool("calculate", json!({"expression": "6 * 7"}));
        let b = second.call_tool("calculate", json!({"expression": "(1 + 2) / 2"}));
        let (a, b) = tokio::join!(a, b);
        assert_eq!(a.unwrap().text_content(), "42");
        assert_eq!(b.unwrap().text_content(), "1.5");
    }
}

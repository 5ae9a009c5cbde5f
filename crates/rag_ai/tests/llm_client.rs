use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use pretty_assertions::assert_eq;
use rag_ai::llm::{ChatCompletionsClient, GenerationOutcome, Llm, CONNECTION_ERROR_SENTINEL};
use serde_json::{json, Value};

/// Serves one canned HTTP response and hands back the JSON request body.
fn serve_once(status_line: &'static str, body: String) -> (String, thread::JoinHandle<Value>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let url = format!("http://{}/v1/chat/completions", listener.local_addr().expect("addr"));
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        let mut reader = BufReader::new(stream.try_clone().expect("clone"));

        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).expect("read header");
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().expect("content length");
                }
            }
        }
        let mut request = vec![0u8; content_length];
        reader.read_exact(&mut request).expect("read body");

        let mut stream = stream;
        write!(
            stream,
            "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
        .expect("write response");
        stream.flush().expect("flush");
        serde_json::from_slice(&request).expect("request json")
    });
    (url, handle)
}

#[test]
fn posts_chat_request_and_trims_first_choice() {
    let reply = json!({"choices": [{"message": {"role": "assistant", "content": "\n  Avoid peanuts.  \n"}}]});
    let (url, server) = serve_once("HTTP/1.1 200 OK", reply.to_string());

    let client = ChatCompletionsClient::new(url, "local-model")
        .with_max_tokens(64)
        .with_timeout(Duration::from_secs(5));
    let outcome = client.generate("What should I avoid?");
    assert_eq!(outcome, GenerationOutcome::Completed("Avoid peanuts.".to_string()));

    let request = server.join().expect("server thread");
    assert_eq!(
        request,
        json!({
            "model": "local-model",
            "messages": [{"role": "user", "content": "What should I avoid?"}],
            "max_tokens": 64
        })
    );
}

#[test]
fn missing_fields_read_as_empty_answer() {
    let (url, server) = serve_once("HTTP/1.1 200 OK", json!({"choices": []}).to_string());
    let outcome = ChatCompletionsClient::new(url, "m").generate("hi");
    assert_eq!(outcome, GenerationOutcome::Completed(String::new()));
    server.join().expect("server thread");
}

#[test]
fn error_status_is_a_transport_failure() {
    let (url, server) = serve_once(
        "HTTP/1.1 500 Internal Server Error",
        json!({"error": "boom"}).to_string(),
    );
    let outcome = ChatCompletionsClient::new(url, "m").generate("hi");
    assert!(outcome.is_transport_failure(), "{outcome:?}");
    assert_eq!(outcome.into_text(), CONNECTION_ERROR_SENTINEL);
    server.join().expect("server thread");
}

#[test]
fn undecodable_body_is_a_transport_failure() {
    let (url, server) = serve_once("HTTP/1.1 200 OK", "not json".to_string());
    let outcome = ChatCompletionsClient::new(url, "m").generate("hi");
    assert!(outcome.is_transport_failure(), "{outcome:?}");
    server.join().expect("server thread");
}

#[test]
fn refused_connection_yields_the_sentinel() {
    // Bind then drop to get a port with nothing listening on it.
    let port = TcpListener::bind("127.0.0.1:0")
        .expect("bind")
        .local_addr()
        .expect("addr")
        .port();
    let client = ChatCompletionsClient::new(format!("http://127.0.0.1:{port}/v1/chat/completions"), "m")
        .with_timeout(Duration::from_secs(2));
    assert_eq!(client.generate("hi").into_text(), CONNECTION_ERROR_SENTINEL);
}

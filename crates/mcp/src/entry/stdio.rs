#![forbid(unsafe_code)]

use super::framing::{
    TransportMode, detect_mode_from_first_line, parse_request, read_content_length_frame,
    write_frame,
};
use crate::McpServer;
use std::io::{BufRead, BufReader, Write};

/// Serves requests until stdin closes. Framing is detected once per process
/// so responses never mix styles.
pub(crate) fn run_stdio(server: &mut McpServer) -> Result<(), Box<dyn std::error::Error>> {
    let stdin = std::io::stdin();
    let mut reader = BufReader::new(stdin.lock());
    let mut stdout = std::io::stdout().lock();
    serve(server, &mut reader, &mut stdout)
}

fn serve<R: BufRead, W: Write>(
    server: &mut McpServer,
    reader: &mut R,
    writer: &mut W,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut mode: Option<TransportMode> = None;

    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        if mode.is_none() {
            mode = detect_mode_from_first_line(&line);
        }
        let Some(active) = mode else {
            continue;
        };

        let body = match active {
            TransportMode::NewlineJson => {
                let raw = line.trim();
                if raw.is_empty() {
                    continue;
                }
                raw.as_bytes().to_vec()
            }
            TransportMode::ContentLength => {
                if line.trim().is_empty() {
                    continue;
                }
                let Some(body) = read_content_length_frame(reader, line)? else {
                    break;
                };
                body
            }
        };

        let response = match parse_request(&body) {
            Ok(request) => server.handle(request),
            Err(error) => Some(error),
        };
        if let Some(resp) = response {
            write_frame(writer, active, &resp)?;
        }
    }

    tracing::debug!("stdin closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::test_server;
    use serde_json::Value;
    use std::io::Cursor;

    fn run(input: &str) -> String {
        let mut server = test_server();
        let mut reader = Cursor::new(input.as_bytes().to_vec());
        let mut out = Vec::new();
        serve(&mut server, &mut reader, &mut out).expect("serve");
        String::from_utf8(out).expect("utf8")
    }

    #[test]
    fn newline_mode_skips_notifications() {
        let out = run(concat!(
            "\n",
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"initialize\",\"params\":{}}\n",
            "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n",
        ));
        let lines: Vec<Value> = out
            .lines()
            .map(|line| serde_json::from_str(line).expect("json"))
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], 1);
        assert_eq!(lines[1]["result"], serde_json::json!({}));
    }

    #[test]
    fn content_length_mode_replies_framed() {
        let body = r#"{"jsonrpc":"2.0","id":7,"method":"ping"}"#;
        let out = run(&format!("Content-Length: {}\r\n\r\n{body}", body.len()));
        assert!(out.starts_with("Content-Length: "));
        let (_, json) = out.split_once("\r\n\r\n").expect("header separator");
        let resp: Value = serde_json::from_str(json).expect("json");
        assert_eq!(resp["id"], 7);
        assert_eq!(resp["result"], serde_json::json!({}));
    }

    #[test]
    fn malformed_line_gets_parse_error() {
        let out = run("{oops\n");
        let resp: Value = serde_json::from_str(out.trim()).expect("json");
        assert_eq!(resp["error"]["code"], -32700);
    }
}

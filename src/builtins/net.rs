// HTTP builtins
// `http_get` is a blocking client call; `http_serve` starts a background
// accept loop that dispatches each request to a user closure through the
// embedder callback.

use super::{get_int_arg, get_string_arg, wrong_args};
use crate::vm::caller;
use crate::vm::value::{HashMapPayload, HashPair, Value};
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};

pub fn http_get(args: &[Value]) -> Value {
    if args.len() != 1 {
        return wrong_args(args.len(), 1);
    }
    let url = match get_string_arg(&args[0], "http_get") {
        Ok(s) => s,
        Err(e) => return e,
    };

    match reqwest::blocking::get(url) {
        Ok(response) => match response.text() {
            Ok(body) => Value::string(body),
            Err(e) => Value::error(e.to_string()),
        },
        Err(e) => Value::error(e.to_string()),
    }
}

pub fn http_serve(args: &[Value]) -> Value {
    if args.len() != 2 {
        return wrong_args(args.len(), 2);
    }
    let port = match get_int_arg(&args[0], "http_serve") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let handler = match &args[1] {
        Value::Closure(cl) => cl.clone(),
        other => {
            return Value::error(format!(
                "arguments to http_serve must be (INTEGER, FUNCTION), got {}",
                other.type_name()
            ))
        }
    };

    let addr = format!("0.0.0.0:{}", port);
    let listener = match TcpListener::bind(&addr) {
        Ok(listener) => listener,
        Err(e) => return Value::error(format!("could not bind {}: {}", addr, e)),
    };

    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { continue };
            let handler = handler.clone();
            std::thread::spawn(move || handle_connection(stream, handler));
        }
    });

    Value::string(format!("Server running on :{}", port))
}

fn handle_connection(mut stream: TcpStream, handler: std::sync::Arc<crate::vm::value::Closure>) {
    let mut reader = BufReader::new(match stream.try_clone() {
        Ok(clone) => clone,
        Err(_) => return,
    });

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("GET").to_string();
    let path = parts.next().unwrap_or("/").to_string();

    // drain headers; bodies are not forwarded to handlers
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) if line == "\r\n" || line == "\n" => break,
            Ok(_) => continue,
            Err(_) => return,
        }
    }

    let request = request_hash(&method, &path);
    let result = caller::run_closure(&handler, vec![request]);

    let (status, body) = if result.is_error() {
        ("500 Internal Server Error", result.to_string())
    } else {
        ("200 OK", result.to_string())
    };

    let _ = write!(
        stream,
        "HTTP/1.1 {}\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
}

fn request_hash(method: &str, path: &str) -> Value {
    let mut pairs = HashMapPayload::default();
    for (key, value) in [("method", method), ("path", path)] {
        let key_value = Value::string(key);
        pairs.insert(
            key_value.hash_key().expect("string keys always hash"),
            HashPair {
                key: key_value,
                value: Value::string(value),
            },
        );
    }
    Value::hash(pairs)
}

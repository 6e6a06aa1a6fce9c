// Clipboard builtins
// Talks to the platform clipboard utility as a subprocess; platforms
// without one get an Error value back.

use super::{get_string_arg, wrong_args};
use crate::vm::value::Value;
use std::io::Write;
use std::process::{Command, Stdio};

#[cfg(target_os = "macos")]
const COPY_CMD: (&str, &[&str]) = ("pbcopy", &[]);
#[cfg(target_os = "macos")]
const PASTE_CMD: (&str, &[&str]) = ("pbpaste", &[]);

#[cfg(target_os = "linux")]
const COPY_CMD: (&str, &[&str]) = ("xclip", &["-selection", "clipboard"]);
#[cfg(target_os = "linux")]
const PASTE_CMD: (&str, &[&str]) = ("xclip", &["-selection", "clipboard", "-o"]);

#[cfg(target_os = "windows")]
const COPY_CMD: (&str, &[&str]) = ("clip", &[]);
#[cfg(target_os = "windows")]
const PASTE_CMD: (&str, &[&str]) = ("powershell", &["-command", "Get-Clipboard"]);

#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
const COPY_CMD: (&str, &[&str]) = ("", &[]);
#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
const PASTE_CMD: (&str, &[&str]) = ("", &[]);

pub fn copy(args: &[Value]) -> Value {
    if args.len() != 1 {
        return wrong_args(args.len(), 1);
    }
    let text = match get_string_arg(&args[0], "copy") {
        Ok(s) => s.to_string(),
        Err(e) => return e,
    };

    let (cmd, cmd_args) = COPY_CMD;
    if cmd.is_empty() {
        return Value::error("clipboard is not supported on this platform");
    }

    let child = Command::new(cmd)
        .args(cmd_args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    match child {
        Ok(mut child) => {
            if let Some(stdin) = child.stdin.as_mut() {
                let _ = stdin.write_all(text.as_bytes());
            }
            match child.wait() {
                Ok(status) if status.success() => Value::Null,
                _ => Value::error("clipboard copy failed"),
            }
        }
        Err(e) => Value::error(format!("clipboard copy failed: {}", e)),
    }
}

pub fn paste(args: &[Value]) -> Value {
    if !args.is_empty() {
        return wrong_args(args.len(), 0);
    }

    let (cmd, cmd_args) = PASTE_CMD;
    if cmd.is_empty() {
        return Value::error("clipboard is not supported on this platform");
    }

    match Command::new(cmd).args(cmd_args).output() {
        Ok(output) if output.status.success() => {
            let text = String::from_utf8_lossy(&output.stdout);
            Value::string(text.trim_end_matches(['\n', '\r']))
        }
        Ok(_) => Value::error("clipboard paste failed"),
        Err(e) => Value::error(format!("clipboard paste failed: {}", e)),
    }
}

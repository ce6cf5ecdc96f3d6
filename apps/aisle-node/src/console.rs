//! # Hardware Console
//!
//! Line protocol on stdin that stands in for the basket firmware.
//!
//! ```text
//! set <Key> <value>     write a channel key (JSON, or a bare string)
//! get <Key>             read a channel key
//! dump                  list every channel key
//! scan <payload>        feed decoded scanner text
//! drive <F|B|L|R|S>     locomotion command on Direction
//! cart                  print the basket
//! checkout              run checkout and wait for the outcome
//! resync                re-persist and republish the basket
//! help                  list commands
//! quit                  stop the node
//! ```

use serde_json::Value;

use aisle_core::MotionCommand;

/// One parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Set { key: String, value: Value },
    Get { key: String },
    Dump,
    Scan(String),
    Drive(MotionCommand),
    Cart,
    Checkout,
    Resync,
    Help,
    Quit,
}

impl ConsoleCommand {
    /// Parses one line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "set" => {
                let (key, raw) = rest
                    .split_once(char::is_whitespace)
                    .ok_or("usage: set <Key> <value>")?;
                ConsoleCommand::Set {
                    key: key.to_string(),
                    value: parse_value(raw.trim()),
                }
            }
            "get" => {
                if rest.is_empty() {
                    return Err("usage: get <Key>".into());
                }
                ConsoleCommand::Get {
                    key: rest.to_string(),
                }
            }
            "scan" => {
                if rest.is_empty() {
                    return Err("usage: scan <id|title|weight|price>".into());
                }
                ConsoleCommand::Scan(rest.to_string())
            }
            "drive" => {
                let mut chars = rest.chars();
                let command = match (chars.next(), chars.next()) {
                    (Some(c), None) => MotionCommand::from_char(c.to_ascii_uppercase()),
                    _ => None,
                };
                ConsoleCommand::Drive(command.ok_or("usage: drive <F|B|L|R|S>")?)
            }
            "dump" => ConsoleCommand::Dump,
            "cart" => ConsoleCommand::Cart,
            "checkout" => ConsoleCommand::Checkout,
            "resync" => ConsoleCommand::Resync,
            "help" | "?" => ConsoleCommand::Help,
            "quit" | "exit" => ConsoleCommand::Quit,
            other => return Err(format!("unknown command '{other}' (try 'help')")),
        };

        Ok(Some(command))
    }
}

/// JSON when it parses (`1`, `"1"`, `null`), the raw text otherwise.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

pub const HELP: &str = "\
commands:
  set <Key> <value>     write a channel key, e.g. set Modes 1
  get <Key>             read a channel key
  dump                  list every channel key
  scan <payload>        scanner text, e.g. scan p1|Banana|1kg|0.99
  drive <F|B|L|R|S>     motion command
  cart                  show the basket
  checkout              check out now
  resync                re-persist and republish the basket
  quit                  stop";

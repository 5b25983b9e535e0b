//! Command parsing
//!
//! Arguments are separated by whitespace. An argument holding spaces is
//! wrapped in double quotes; inside quotes `\"` and `\\` are escapes.

use crate::protocol::Command;

/// Splits a command line into arguments.
pub fn tokenize(line: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let Some(&first) = chars.peek() else {
            break;
        };

        let mut token = String::new();
        if first == '"' {
            chars.next();
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '"' => {
                        closed = true;
                        break;
                    }
                    '\\' => match chars.next() {
                        Some(escaped @ ('"' | '\\')) => token.push(escaped),
                        Some(other) => {
                            token.push('\\');
                            token.push(other);
                        }
                        None => return Err("Unterminated escape".into()),
                    },
                    _ => token.push(c),
                }
            }
            if !closed {
                return Err("Unterminated quoted argument".into());
            }
            if chars.peek().is_some_and(|c| !c.is_whitespace()) {
                return Err("Missing space after quoted argument".into());
            }
        } else {
            while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                token.push(c);
            }
        }
        tokens.push(token);
    }

    Ok(tokens)
}

/// Parses a raw line received from a client into a [`Command`].
///
/// Known commands with the wrong arguments become [`Command::INVALID`].
pub fn parse_command(raw: &str) -> Command {
    let mut args = match tokenize(raw.trim_end_matches(['\r', '\n'])) {
        Ok(args) => args.into_iter(),
        Err(reason) => return Command::INVALID(reason),
    };
    let Some(cmd) = args.next() else {
        return Command::UNKNOWN;
    };
    let args: Vec<String> = args.collect();

    match (cmd.to_ascii_uppercase().as_str(), args.as_slice()) {
        ("LIST", []) => Command::LIST(String::new()),
        ("LIST", [path]) => Command::LIST(path.clone()),
        ("MKD", [path, name]) => Command::MKD {
            path: path.clone(),
            name: name.clone(),
        },
        ("RMD", [path, name]) => Command::RMD {
            path: path.clone(),
            name: name.clone(),
            confirmed: false,
        },
        ("RMD", [path, name, flag]) if flag.eq_ignore_ascii_case("CONFIRM") => Command::RMD {
            path: path.clone(),
            name: name.clone(),
            confirmed: true,
        },
        ("DELE", [path, names @ ..]) if !names.is_empty() => Command::DELE {
            path: path.clone(),
            names: names.to_vec(),
        },
        ("RETR", [path, name]) => Command::RETR {
            path: path.clone(),
            name: name.clone(),
        },
        ("STOR", [path, name, size]) => match size.parse::<u64>() {
            Ok(size) => Command::STOR {
                path: path.clone(),
                name: name.clone(),
                size,
            },
            Err(_) => Command::INVALID(format!("Invalid size: {size}")),
        },
        ("NOOP", []) => Command::NOOP,
        ("QUIT" | "Q", []) => Command::QUIT,
        (known @ ("LIST" | "MKD" | "RMD" | "DELE" | "RETR" | "STOR" | "NOOP" | "QUIT"), _) => {
            Command::INVALID(format!("Wrong arguments for {known}"))
        }
        _ => Command::UNKNOWN,
    }
}

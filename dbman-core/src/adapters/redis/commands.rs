//! Parsing of raw command text.

use crate::Result;
use crate::error::DbManError;

/// Commands accepted by raw queries.
///
/// Server administration, blocking, pub/sub and database switching are not
/// on the list; wiping goes through the dedicated operation.
pub const ALLOWED_COMMANDS: &[&str] = &[
    // keys
    "DEL", "EXISTS", "EXPIRE", "KEYS", "PERSIST", "RENAME", "SCAN", "TTL", "TYPE",
    // strings
    "APPEND", "DECR", "DECRBY", "GET", "GETRANGE", "INCR", "INCRBY", "MGET", "MSET", "SET",
    "SETNX", "STRLEN",
    // lists
    "LINDEX", "LLEN", "LPOP", "LPUSH", "LRANGE", "LREM", "LSET", "RPOP", "RPUSH",
    // sets
    "SADD", "SCARD", "SISMEMBER", "SMEMBERS", "SREM",
    // sorted sets
    "ZADD", "ZCARD", "ZRANGE", "ZRANK", "ZREM", "ZSCORE",
    // hashes
    "HDEL", "HEXISTS", "HGET", "HGETALL", "HKEYS", "HLEN", "HSET", "HVALS",
    // server
    "DBSIZE", "ECHO", "INFO", "PING",
];

/// A command name with its positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Upper-cased command name.
    pub name: String,
    pub args: Vec<String>,
}

/// Splits command text on whitespace; double quotes group a token and
/// `\"` inside quotes is a literal quote.
pub fn tokenize(text: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut in_quotes = false;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                in_token = true;
            }
            '\\' if in_quotes => match chars.next() {
                Some(next) => current.push(next),
                None => current.push('\\'),
            },
            c if c.is_whitespace() && !in_quotes => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if in_quotes {
        return Err(DbManError::malformed("unterminated quote in command"));
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Parses command text and checks the command against [`ALLOWED_COMMANDS`].
pub fn parse_command(text: &str) -> Result<ParsedCommand> {
    let mut tokens = tokenize(text)?.into_iter();
    let name = tokens
        .next()
        .ok_or_else(|| DbManError::malformed("command text is empty"))?
        .to_ascii_uppercase();
    if !ALLOWED_COMMANDS.contains(&name.as_str()) {
        return Err(DbManError::unsupported(format!("command {}", name), "Redis"));
    }
    Ok(ParsedCommand {
        name,
        args: tokens.collect(),
    })
}

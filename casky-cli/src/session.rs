use casky::storage::engine::Engine;

/// What the server should do with one parsed command.
#[derive(Debug, PartialEq)]
pub enum Response {
    /// Write this reply (which may span several lines, as STATS does).
    Message(String),
    /// Write `BYE` and close the connection.
    Bye,
}

/// The `VER` reply: the library version, tagged in thread-safe builds.
fn version_reply() -> String {
    if cfg!(feature = "thread-safe") {
        format!("{} (thread-safe)", casky::version())
    } else {
        casky::version().to_string()
    }
}

/// Executes one protocol line against the engine.
///
/// The first whitespace-separated token is the verb, matched
/// case-insensitively. Keys are single tokens; a PUT value is everything
/// after the key, so values may contain spaces. Library errors come back as
/// `ERROR <code>` lines and are logged at WARN.
pub fn execute<E: Engine>(engine: &mut E, line: &str) -> Response {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Response::Message("ERROR invalid command".into());
    }

    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let verb = parts.next().unwrap_or_default();
    let rest = parts.next().map(str::trim_start).unwrap_or_default();

    match verb.to_ascii_uppercase().as_str() {
        "PUT" => {
            let mut kv = rest.splitn(2, char::is_whitespace);
            let key = kv.next().unwrap_or_default();
            let value = kv.next().map(str::trim_start).unwrap_or_default();
            if key.is_empty() || value.is_empty() {
                return Response::Message("ERROR usage: PUT <key> <value>".into());
            }
            match engine.put(key.as_bytes(), value.as_bytes(), 0) {
                Ok(()) => {
                    log::debug!("PUT key='{}' ok", key);
                    Response::Message("OK".into())
                }
                Err(error) => {
                    log::warn!("PUT key='{}' failed: {}", key, error);
                    Response::Message(format!("ERROR {}", error.code()))
                }
            }
        }
        "GET" => {
            let key = rest.split_whitespace().next().unwrap_or_default();
            if key.is_empty() {
                return Response::Message("ERROR usage: GET <key>".into());
            }
            match engine.get(key.as_bytes()) {
                Ok(Some(value)) => {
                    log::debug!("GET key='{}' hit", key);
                    Response::Message(format!("VALUE {}", String::from_utf8_lossy(&value)))
                }
                Ok(None) => {
                    log::debug!("GET key='{}' miss", key);
                    Response::Message("NOT_FOUND".into())
                }
                Err(error) => {
                    log::warn!("GET key='{}' failed: {}", key, error);
                    Response::Message(format!("ERROR {}", error.code()))
                }
            }
        }
        "DEL" => {
            let key = rest.split_whitespace().next().unwrap_or_default();
            if key.is_empty() {
                return Response::Message("ERROR usage: DEL <key>".into());
            }
            match engine.delete(key.as_bytes()) {
                Ok(true) => {
                    log::debug!("DEL key='{}' ok", key);
                    Response::Message("OK".into())
                }
                Ok(false) => {
                    log::debug!("DEL key='{}' not found", key);
                    Response::Message("NOT_FOUND".into())
                }
                Err(error) => {
                    log::warn!("DEL key='{}' failed: {}", key, error);
                    Response::Message(format!("ERROR {}", error.code()))
                }
            }
        }
        "COMPACT" => {
            if cfg!(feature = "thread-safe") {
                log::info!("COMPACT requested by client");
                match engine.compact() {
                    Ok(()) => Response::Message("OK".into()),
                    Err(error) => {
                        log::warn!("COMPACT failed: {}", error);
                        Response::Message(format!("ERROR {}", error.code()))
                    }
                }
            } else {
                Response::Message("ERROR not supported".into())
            }
        }
        "STATS" => {
            let stats = engine.stats();
            Response::Message(format!(
                "STATS\n total keys={}\n total gets={}\n total puts={}\n total deletes={}\n occupied memory={}",
                stats.total_keys,
                stats.num_gets,
                stats.num_puts,
                stats.num_deletes,
                stats.memory_bytes,
            ))
        }
        "VER" => Response::Message(version_reply()),
        "QUIT" => Response::Bye,
        _ => Response::Message("ERROR unknown command".into()),
    }
}

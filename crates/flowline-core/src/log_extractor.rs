//! Recovers per-instruction event payloads from a transaction's runtime log
//! stream.

use base64::Engine;

/// Extracts every base64-decoded "Program data" payload logged while the
/// runtime's current path equalled `query`.
///
/// Walks `log_messages` in order, tracking a current depth and, per depth,
/// the 0-based position of the instruction currently executing at that
/// depth (an invoke line resets deeper positions; a finish line pops the
/// depth back down). A data line is emitted only when the path built from
/// those positions equals `query`. Lines that match neither an invoke,
/// data, compute-units, nor finish shape are inert and ignored.
pub fn extract_log_events(log_messages: &[String], query: &[usize]) -> Vec<Vec<u8>> {
    let mut depth: usize = 0;
    // 1-indexed by depth; position_at_level[d] is the 0-based position of
    // the instruction currently executing at depth d.
    let mut position_at_level: Vec<usize> = Vec::new();
    let mut events = Vec::new();

    for line in log_messages {
        if let Some(new_depth) = parse_invoke_depth(line) {
            let position = if new_depth > depth {
                0
            } else {
                position_at_level.get(new_depth - 1).copied().unwrap_or(0) + 1
            };
            position_at_level.truncate(new_depth - 1);
            if position_at_level.len() < new_depth {
                position_at_level.resize(new_depth, 0);
            }
            position_at_level[new_depth - 1] = position;
            depth = new_depth;
        } else if is_finish_line(line) {
            depth = depth.saturating_sub(1);
        } else if is_compute_units_line(line) {
            // No state change.
        } else if let Some(payload) = parse_data_payload(line) {
            let current_path: Vec<usize> = position_at_level[..depth.min(position_at_level.len())].to_vec();
            if current_path == query {
                if let Ok(decoded) = base64::engine::general_purpose::STANDARD.decode(payload) {
                    events.push(decoded);
                }
            }
        }
    }

    events
}

fn parse_invoke_depth(line: &str) -> Option<usize> {
    if !line.starts_with("Program ") || !line.contains(" invoke [") {
        return None;
    }
    let start = line.rfind(" invoke [")? + " invoke [".len();
    let rest = &line[start..];
    let end = rest.find(']')?;
    rest[..end].parse::<usize>().ok()
}

fn is_finish_line(line: &str) -> bool {
    line.starts_with("Program ") && (line.ends_with(" success") || line.contains(" failed"))
}

fn is_compute_units_line(line: &str) -> bool {
    line.contains("consumed") && line.contains("compute units")
}

fn parse_data_payload(line: &str) -> Option<&str> {
    if is_finish_line(line) || parse_invoke_depth(line).is_some() || is_compute_units_line(line) {
        return None;
    }
    line.split_whitespace().last().filter(|field| !field.is_empty())
}

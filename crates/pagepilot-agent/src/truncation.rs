use serde_json::Value;

/// Caps the size of a tool result before it is sent back to the assistant.
///
/// Results that fit are returned untouched. Oversized results are rendered to
/// text and cut in the middle, so the shape of the head and tail survives.
pub fn truncate_tool_output(output: Value, max_chars: usize) -> Value {
    let rendered = match &output {
        Value::String(text) => {
            if text.chars().count() <= max_chars {
                return output;
            }
            text.clone()
        }
        other => {
            let text = other.to_string();
            if text.chars().count() <= max_chars {
                return output;
            }
            text
        }
    };
    Value::String(truncate_chars(&rendered, max_chars))
}

pub fn truncate_chars(output: &str, max_chars: usize) -> String {
    let char_count = output.chars().count();
    if char_count <= max_chars {
        return output.to_string();
    }

    let removed = char_count.saturating_sub(max_chars);
    let head = max_chars / 2;
    let tail = max_chars.saturating_sub(head);
    format!(
        "{}\n\n[WARNING: Tool output was truncated. {} characters were removed from the middle.]\n\n{}",
        take_head(output, head),
        removed,
        take_tail(output, tail, char_count)
    )
}

fn take_head(input: &str, char_count: usize) -> String {
    input.chars().take(char_count).collect()
}

fn take_tail(input: &str, char_count: usize, total: usize) -> String {
    input.chars().skip(total.saturating_sub(char_count)).collect()
}

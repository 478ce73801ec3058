//! Incremental extraction of completed objects from a streamed JSON array
//!
//! Accumulates raw text chunks and slices out each top-level object of a
//! named array as soon as its closing brace arrives.

/// Stateful slicer for one named JSON array.
///
/// The buffer is append-only and re-scanned from the array start on every
/// call; earlier bytes may still be needed to locate the array once later
/// chunks arrive. Documents are small (tens of KB), so the re-scan keeps the
/// state machine trivial instead of fast.
pub struct ArrayObjectExtractor {
    quoted_key: String,
    buffer: String,
    emitted_count: usize,
}

impl ArrayObjectExtractor {
    /// `array_key` is the bare key name, without quotes.
    pub fn new(array_key: &str) -> Self {
        Self {
            quoted_key: format!("\"{array_key}\""),
            buffer: String::new(),
            emitted_count: 0,
        }
    }

    /// Everything accumulated so far.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Append a chunk and return the object substrings it completed.
    ///
    /// Objects are returned at most once each, in document order. An array
    /// still waiting for its opening `[`, or a string left unterminated at
    /// the buffer end, simply yields nothing until more text arrives.
    pub fn add_chunk(&mut self, chunk: &str) -> Vec<String> {
        if !chunk.is_empty() {
            self.buffer.push_str(chunk);
        }

        let completed = extract_completed_objects(&self.buffer, &self.quoted_key);
        if completed.len() <= self.emitted_count {
            return Vec::new();
        }
        let fresh = completed[self.emitted_count..].to_vec();
        self.emitted_count = completed.len();
        fresh
    }
}

fn extract_completed_objects(source: &str, quoted_key: &str) -> Vec<String> {
    let mut result = Vec::new();
    let Some(array_start) = resolve_array_start(source, quoted_key) else {
        return result;
    };

    let mut in_string = false;
    let mut escaping = false;
    let mut object_start: Option<usize> = None;
    let mut brace_depth = 0usize;

    for (offset, ch) in source[array_start + 1..].char_indices() {
        let index = array_start + 1 + offset;

        if in_string {
            if escaping {
                escaping = false;
                continue;
            }
            match ch {
                '\\' => escaping = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        if ch == '"' {
            in_string = true;
            continue;
        }

        match object_start {
            None => {
                if ch == '{' {
                    object_start = Some(index);
                    brace_depth = 1;
                } else if ch == ']' {
                    // Array closed before another object started.
                    break;
                }
            }
            Some(start) => {
                if ch == '{' {
                    brace_depth += 1;
                } else if ch == '}' {
                    brace_depth -= 1;
                    if brace_depth == 0 {
                        result.push(source[start..=index].to_string());
                        object_start = None;
                    }
                }
            }
        }
    }

    result
}

/// Find the `[` introduced by the configured key.
///
/// The key string may also appear inside an unrelated quoted value earlier in
/// the document; such occurrences are rejected and the search resumes just
/// past them.
fn resolve_array_start(source: &str, quoted_key: &str) -> Option<usize> {
    let mut search_from = 0;
    loop {
        let key_index = source[search_from..].find(quoted_key)? + search_from;
        let after_key = key_index + quoted_key.len();
        if let Some(offset) = find_array_start(&source[after_key..]) {
            return Some(after_key + offset);
        }
        search_from = after_key;
    }
}

/// Scan past whitespace and a single colon for the opening `[`. Any other
/// character means this key occurrence does not introduce the array.
fn find_array_start(source: &str) -> Option<usize> {
    for (index, ch) in source.char_indices() {
        if ch == '[' {
            return Some(index);
        }
        if !ch.is_whitespace() && ch != ':' {
            return None;
        }
    }
    None
}

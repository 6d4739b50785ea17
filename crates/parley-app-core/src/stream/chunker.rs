/// Re-chunks streamed text into whole words (a word plus its trailing
/// whitespace) so the client renders smoothly regardless of how the
/// provider split its deltas.
#[derive(Debug, Default)]
pub struct WordChunker {
    buffer: String,
}

impl WordChunker {
    pub fn push(&mut self, delta: &str) -> Vec<String> {
        self.buffer.push_str(delta);
        let mut out = Vec::new();
        while let Some(end) = word_end(&self.buffer) {
            out.push(self.buffer.drain(..end).collect());
        }
        out
    }

    /// Remaining text, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buffer))
        }
    }
}

/// Byte offset just past the first `\S+\s+` run, if the buffer holds one.
fn word_end(text: &str) -> Option<usize> {
    let start = text.find(|c: char| !c.is_whitespace())?;
    let gap = start + text[start..].find(char::is_whitespace)?;
    let rest = &text[gap..];
    let tail = rest.find(|c: char| !c.is_whitespace()).unwrap_or(rest.len());
    Some(gap + tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_whole_words() {
        let mut chunker = WordChunker::default();
        assert!(chunker.push("Hel").is_empty());
        assert_eq!(chunker.push("lo wor"), vec!["Hello "]);
        assert_eq!(chunker.push("ld, how  are"), vec!["world, ", "how  "]);
        assert_eq!(chunker.finish().as_deref(), Some("are"));
        assert_eq!(chunker.finish(), None);
    }

    #[test]
    fn leading_whitespace_travels_with_the_next_word() {
        let mut chunker = WordChunker::default();
        assert_eq!(chunker.push("  ü\nnext"), vec!["  ü\n"]);
        assert_eq!(chunker.finish().as_deref(), Some("next"));
    }

    #[test]
    fn chunks_reassemble_to_the_input() {
        let input = "The quick  brown\tfox\njumps over the lazy dog. ";
        let mut chunker = WordChunker::default();
        let mut out = String::new();
        for piece in input.as_bytes().chunks(3) {
            out.extend(chunker.push(std::str::from_utf8(piece).unwrap()));
        }
        out.extend(chunker.finish());
        assert_eq!(out, input);
    }
}

//! Segmented Text Accumulator
//!
//! `BufferBuilder` collects a value that spans several buffer refills
//! (long text runs, comments, CDATA sections) without re-copying what has
//! already been appended. Full segments are kept in a list and only joined
//! once, when the value is taken. Segments released by `clear` are pooled
//! and reused for the next value.

/// Default segment capacity in bytes
pub const DEFAULT_SEGMENT_SIZE: usize = 16 * 1024;

/// Maximum number of spare segments kept for reuse
const MAX_POOLED_SEGMENTS: usize = 8;

/// Growable, segmented text builder
#[derive(Debug)]
pub struct BufferBuilder {
    segments: Vec<String>,
    current: String,
    len: usize,
    segment_size: usize,
    pool: Vec<String>,
}

impl Default for BufferBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferBuilder {
    pub fn new() -> Self {
        Self::with_segment_size(DEFAULT_SEGMENT_SIZE)
    }

    pub fn with_segment_size(segment_size: usize) -> Self {
        let segment_size = segment_size.max(4);
        BufferBuilder {
            segments: Vec::new(),
            current: String::with_capacity(segment_size),
            len: 0,
            segment_size,
            pool: Vec::new(),
        }
    }

    /// Total length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append text, spilling into new segments as needed
    pub fn append(&mut self, mut text: &str) {
        self.len += text.len();
        while !text.is_empty() {
            let room = self.segment_size.saturating_sub(self.current.len());
            if text.len() <= room {
                self.current.push_str(text);
                return;
            }
            let mut split = room;
            while !text.is_char_boundary(split) {
                split -= 1;
            }
            if split == 0 && self.current.is_empty() {
                // A single character wider than an empty segment still has to go somewhere
                split = text.chars().next().map_or(text.len(), char::len_utf8);
            }
            self.current.push_str(&text[..split]);
            text = &text[split..];
            self.next_segment();
        }
    }

    fn next_segment(&mut self) {
        let fresh = self
            .pool
            .pop()
            .unwrap_or_else(|| String::with_capacity(self.segment_size));
        let full = std::mem::replace(&mut self.current, fresh);
        self.segments.push(full);
    }

    /// Reset to zero length, keeping segments for reuse
    pub fn clear(&mut self) {
        for mut segment in self.segments.drain(..) {
            if self.pool.len() < MAX_POOLED_SEGMENTS {
                segment.clear();
                self.pool.push(segment);
            }
        }
        self.current.clear();
        self.len = 0;
    }

    /// Copy the accumulated text out, leaving the builder untouched
    pub fn concat(&self) -> String {
        let mut out = String::with_capacity(self.len);
        for segment in &self.segments {
            out.push_str(segment);
        }
        out.push_str(&self.current);
        out
    }

    /// Take the accumulated text, then clear the builder
    pub fn take(&mut self) -> String {
        let out = if self.segments.is_empty() {
            let cap = self.segment_size;
            std::mem::replace(&mut self.current, String::with_capacity(cap))
        } else {
            self.concat()
        };
        self.clear();
        out
    }
}

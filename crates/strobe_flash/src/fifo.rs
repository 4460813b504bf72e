//! Bounded word FIFO used for both data channels.

use std::collections::VecDeque;

/// A fixed-depth queue of 32-bit words.
#[derive(Clone, Debug)]
pub struct WordFifo {
    words: VecDeque<u32>,
    depth: usize,
}

impl WordFifo {
    /// Creates an empty FIFO holding at most `depth` words (at least one).
    pub fn new(depth: usize) -> Self {
        let depth = depth.max(1);
        Self {
            words: VecDeque::with_capacity(depth),
            depth,
        }
    }

    /// Maximum number of words held.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Words currently held.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Whether no word is held.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Whether a push would be refused.
    pub fn is_full(&self) -> bool {
        self.words.len() >= self.depth
    }

    /// Head of the queue without consuming it.
    pub fn front(&self) -> Option<u32> {
        self.words.front().copied()
    }

    /// Appends a word. Returns `false` and drops the word when full.
    pub fn push(&mut self, word: u32) -> bool {
        if self.is_full() {
            return false;
        }
        self.words.push_back(word);
        true
    }

    /// Removes and returns the head of the queue.
    pub fn pop(&mut self) -> Option<u32> {
        self.words.pop_front()
    }

    /// Drops every held word.
    pub fn clear(&mut self) {
        self.words.clear();
    }
}

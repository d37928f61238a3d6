//! Read-only presentation of chain state.

use crate::{constants::DISPLAY_HASH_LEN, Block};

const BOX_WIDTH: usize = 36;

/// What a renderer gets to see of one block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockView<'a> {
    pub index: u64,
    pub hash: &'a str,
    pub transactions: Vec<(&'a str, &'a str, i64)>,
}

impl<'a> BlockView<'a> {
    pub fn new(block: &'a Block) -> Self {
        Self {
            index: block.index(),
            hash: block.hash(),
            transactions: block
                .transactions()
                .iter()
                .map(|t| (t.sender(), t.receiver(), t.amount()))
                .collect(),
        }
    }

    /// First few hex characters of the hash followed by `...`.
    pub fn display_hash(&self) -> String {
        let end = self
            .hash
            .char_indices()
            .nth(DISPLAY_HASH_LEN)
            .map_or(self.hash.len(), |(i, _)| i);
        format!("{}...", &self.hash[..end])
    }

    fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Index: {}", self.index),
            format!("Hash: {}", self.display_hash()),
        ];
        lines.extend(
            self.transactions
                .iter()
                .map(|(sender, receiver, amount)| format!("{sender} -> {receiver}: {amount}")),
        );
        lines
    }
}

pub fn views(blocks: &[Block]) -> Vec<BlockView<'_>> {
    blocks.iter().map(BlockView::new).collect()
}

/// One box per block, top to bottom, joined by arrows.
pub fn render_text(blocks: &[Block]) -> String {
    let border = format!("+{}+", "-".repeat(BOX_WIDTH + 2));
    let pad = " ".repeat(BOX_WIDTH / 2 + 2);
    let arrow = format!("{pad}|\n{pad}v");

    let mut out = Vec::new();
    for (i, view) in views(blocks).iter().enumerate() {
        if i > 0 {
            out.push(arrow.clone());
        }
        out.push(border.clone());
        for line in view.lines() {
            out.push(format!("| {line:<width$} |", width = BOX_WIDTH));
        }
        out.push(border.clone());
    }
    out.join("\n")
}

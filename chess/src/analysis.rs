//! Engine search results shared between the protocol client and the game store.

use serde::{Deserialize, Serialize};

/// Base value for mate scores. Every mate score lies beyond `±(MATE_SCORE - MAX_MATE_DISTANCE)`,
/// far outside any centipawn evaluation an engine reports.
pub const MATE_SCORE: i32 = 100_000;

/// Mate distances at or above this are not representable as distinct scores.
pub const MAX_MATE_DISTANCE: i32 = 1_000;

/// Summary of one engine search, parsed from a single progress line.
///
/// `score` is in centipawns from the searching side's perspective, or a mate
/// score produced by [`encode_mate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchInfo {
    pub depth: u32,
    pub score: i32,
    pub nodes: u64,
    pub time_ms: u64,
    /// Principal variation as move tokens.
    pub pv: Vec<String>,
}

/// Encode a UCI `score mate <n>` value.
///
/// Positive `n` (engine mates) maps to `MATE_SCORE - n`, so shorter mates rank
/// higher. Zero or negative `n` (engine is mated) maps to `-MATE_SCORE - n`.
pub fn encode_mate(n: i32) -> i32 {
    let n = n.clamp(-(MAX_MATE_DISTANCE - 1), MAX_MATE_DISTANCE - 1);
    if n > 0 {
        MATE_SCORE - n
    } else {
        -MATE_SCORE - n
    }
}

/// Inverse of [`encode_mate`]; `None` for centipawn scores.
pub fn decode_mate(score: i32) -> Option<i32> {
    if score >= MATE_SCORE - MAX_MATE_DISTANCE {
        Some(MATE_SCORE - score)
    } else if score <= -(MATE_SCORE - MAX_MATE_DISTANCE) {
        Some(-MATE_SCORE - score)
    } else {
        None
    }
}

impl SearchInfo {
    /// A record is only meaningful once the engine reports a positive depth.
    pub fn is_meaningful(&self) -> bool {
        self.depth > 0
    }

    /// Human-readable score: "+0.35", "-1.20", "+M3", "-M2".
    pub fn display_score(&self) -> String {
        match decode_mate(self.score) {
            Some(m) if m > 0 => format!("+M{}", m),
            Some(m) => format!("-M{}", m.abs()),
            None => format!("{:+.2}", self.score as f64 / 100.0),
        }
    }
}

impl std::fmt::Display for SearchInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "depth {} score {} nodes {} time {}ms",
            self.depth,
            self.display_score(),
            self.nodes,
            self.time_ms
        )?;
        if !self.pv.is_empty() {
            write!(f, " pv {}", self.pv.join(" "))?;
        }
        Ok(())
    }
}

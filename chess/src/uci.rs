//! Move tokens in UCI long algebraic form ("e2e4", "e7e8q").

use cozy_chess::{Board, File, Move, Piece, Rank, Square};

use crate::types::PieceKind;

/// A move parsed from its token, independent of any position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateMove {
    pub from: String,
    pub to: String,
    /// Canonical token: standard UCI castling, lowercase promotion letter.
    pub token: String,
    pub promotion: Option<PieceKind>,
}

impl CandidateMove {
    pub(crate) fn from_move(mv: Move) -> Self {
        Self {
            from: format_square(mv.from),
            to: format_square(mv.to),
            token: format_uci_move(mv),
            promotion: mv.promotion.map(PieceKind::from),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveTokenError {
    #[error("Invalid move: {0}")]
    InvalidMove(String),
    #[error("Invalid square: {0}")]
    InvalidSquare(String),
    #[error("Invalid promotion: {0}")]
    InvalidPromotion(String),
}

/// Parse a move token into its parts without consulting a position.
pub fn parse_move_token(token: &str) -> Result<CandidateMove, MoveTokenError> {
    parse_uci_move(token).map(CandidateMove::from_move)
}

/// Parse UCI move format (e2e4, e7e8q) into a cozy-chess move.
pub fn parse_uci_move(s: &str) -> Result<Move, MoveTokenError> {
    let s = s.trim();
    if !s.is_ascii() || !(4..=5).contains(&s.len()) {
        return Err(MoveTokenError::InvalidMove(s.to_string()));
    }

    let from = parse_square(&s[0..2])?;
    let to = parse_square(&s[2..4])?;

    let promotion = match s.get(4..5) {
        None => None,
        Some(p) => Some(match p {
            "q" => Piece::Queen,
            "r" => Piece::Rook,
            "b" => Piece::Bishop,
            "n" => Piece::Knight,
            _ => return Err(MoveTokenError::InvalidPromotion(s.to_string())),
        }),
    };

    Ok(Move {
        from,
        to,
        promotion,
    })
}

pub fn parse_square(s: &str) -> Result<Square, MoveTokenError> {
    let mut chars = s.chars();
    let (Some(f), Some(r), None) = (chars.next(), chars.next(), chars.next()) else {
        return Err(MoveTokenError::InvalidSquare(s.to_string()));
    };

    let file = match f {
        'a' => File::A,
        'b' => File::B,
        'c' => File::C,
        'd' => File::D,
        'e' => File::E,
        'f' => File::F,
        'g' => File::G,
        'h' => File::H,
        _ => return Err(MoveTokenError::InvalidSquare(s.to_string())),
    };

    let rank = match r {
        '1' => Rank::First,
        '2' => Rank::Second,
        '3' => Rank::Third,
        '4' => Rank::Fourth,
        '5' => Rank::Fifth,
        '6' => Rank::Sixth,
        '7' => Rank::Seventh,
        '8' => Rank::Eighth,
        _ => return Err(MoveTokenError::InvalidSquare(s.to_string())),
    };

    Ok(Square::new(file, rank))
}

pub fn file_char(file: File) -> char {
    match file {
        File::A => 'a',
        File::B => 'b',
        File::C => 'c',
        File::D => 'd',
        File::E => 'e',
        File::F => 'f',
        File::G => 'g',
        File::H => 'h',
    }
}

pub fn rank_char(rank: Rank) -> char {
    match rank {
        Rank::First => '1',
        Rank::Second => '2',
        Rank::Third => '3',
        Rank::Fourth => '4',
        Rank::Fifth => '5',
        Rank::Sixth => '6',
        Rank::Seventh => '7',
        Rank::Eighth => '8',
    }
}

pub fn format_square(sq: Square) -> String {
    format!("{}{}", file_char(sq.file()), rank_char(sq.rank()))
}

/// Format a move in UCI notation (e.g., "e2e4", "e7e8q")
pub fn format_uci_move(mv: Move) -> String {
    let mut s = format!("{}{}", format_square(mv.from), format_square(mv.to));
    if let Some(promo) = mv.promotion {
        s.push(PieceKind::from(promo).to_char_lower());
    }
    s
}

/// Convert UCI castling notation to cozy_chess notation
///
/// UCI uses standard notation (king moves 2 squares): e1g1, e1c1, e8g8, e8c8
/// cozy_chess uses king-to-rook notation: e1h1, e1a1, e8h8, e8a8
///
/// The move is only rewritten when the converted form is in `legal_moves`.
pub fn convert_uci_castling_to_cozy(mv: Move, legal_moves: &[Move]) -> Move {
    let is_rank_1_or_8 = matches!(mv.from.rank(), Rank::First | Rank::Eighth);
    let is_e_file = matches!(mv.from.file(), File::E);
    let is_g_or_c_file = matches!(mv.to.file(), File::G | File::C);

    if is_rank_1_or_8 && is_e_file && is_g_or_c_file && mv.promotion.is_none() {
        let rook_file = if mv.to.file() == File::G {
            File::H
        } else {
            File::A
        };
        let converted = Move {
            from: mv.from,
            to: Square::new(rook_file, mv.from.rank()),
            promotion: None,
        };

        if legal_moves.contains(&converted) {
            return converted;
        }
    }

    mv
}

/// Convert a cozy_chess castling move (king takes own rook) back to UCI notation.
///
/// Must be called with the board the move is played from.
pub fn convert_cozy_castling_to_uci(board: &Board, mv: Move) -> Move {
    if !is_castling(board, mv) {
        return mv;
    }
    let king_file = if file_char(mv.to.file()) > file_char(mv.from.file()) {
        File::G
    } else {
        File::C
    };
    Move {
        from: mv.from,
        to: Square::new(king_file, mv.from.rank()),
        promotion: None,
    }
}

/// True when `mv` is a castling move in cozy_chess notation.
pub fn is_castling(board: &Board, mv: Move) -> bool {
    board.piece_on(mv.from) == Some(Piece::King)
        && board.piece_on(mv.to) == Some(Piece::Rook)
        && board.color_on(mv.from) == board.color_on(mv.to)
}

//! Standard Algebraic Notation for moves played through the rules capability.

use cozy_chess::{Board, GameStatus, Move, Piece};

use crate::types::PieceKind;
use crate::uci::{file_char, format_square, is_castling, rank_char};

/// Format a legal move (cozy_chess notation) as SAN, e.g. "Nbd7", "exd5", "O-O", "e8=Q#".
pub fn format_san(board: &Board, mv: Move, legal_moves: &[Move]) -> String {
    let Some(piece) = board.piece_on(mv.from) else {
        return crate::uci::format_uci_move(mv);
    };

    let mut san = String::new();

    if is_castling(board, mv) {
        if file_char(mv.to.file()) > file_char(mv.from.file()) {
            san.push_str("O-O");
        } else {
            san.push_str("O-O-O");
        }
    } else {
        let is_capture = is_capture(board, mv);

        if piece == Piece::Pawn {
            if is_capture {
                san.push(file_char(mv.from.file()));
            }
        } else {
            san.push(PieceKind::from(piece).to_char_upper());
            san.push_str(&disambiguation(board, mv, piece, legal_moves));
        }

        if is_capture {
            san.push('x');
        }

        san.push_str(&format_square(mv.to));

        if let Some(promo) = mv.promotion {
            san.push('=');
            san.push(PieceKind::from(promo).to_char_upper());
        }
    }

    let mut after = board.clone();
    after.play_unchecked(mv);
    if after.status() == GameStatus::Won {
        san.push('#');
    } else if !after.checkers().is_empty() {
        san.push('+');
    }

    san
}

/// A move captures when the destination holds an enemy piece, or a pawn moves diagonally
/// onto an empty square (en passant). Reads the board before the move is played.
pub fn is_capture(board: &Board, mv: Move) -> bool {
    captured_piece(board, mv).is_some()
}

pub fn captured_piece(board: &Board, mv: Move) -> Option<Piece> {
    if is_castling(board, mv) {
        return None;
    }
    match board.piece_on(mv.to) {
        Some(p) if board.color_on(mv.to) != board.color_on(mv.from) => Some(p),
        Some(_) => None,
        None if board.piece_on(mv.from) == Some(Piece::Pawn) && mv.from.file() != mv.to.file() => {
            Some(Piece::Pawn)
        }
        None => None,
    }
}

fn disambiguation(board: &Board, mv: Move, piece: Piece, legal_moves: &[Move]) -> String {
    let rivals: Vec<&Move> = legal_moves
        .iter()
        .filter(|other| {
            other.to == mv.to
                && other.from != mv.from
                && board.piece_on(other.from) == Some(piece)
                && !is_castling(board, **other)
        })
        .collect();

    if rivals.is_empty() {
        return String::new();
    }

    let shares_file = rivals.iter().any(|o| o.from.file() == mv.from.file());
    let shares_rank = rivals.iter().any(|o| o.from.rank() == mv.from.rank());

    match (shares_file, shares_rank) {
        (false, _) => file_char(mv.from.file()).to_string(),
        (true, false) => rank_char(mv.from.rank()).to_string(),
        (true, true) => format_square(mv.from),
    }
}

//! Square, piece and color text conversions.

use cozy_chess::{Color, File, Piece, Rank, Square};

/// Piece letters in `Piece::ALL` order.
const PIECE_LETTERS: [char; 6] = ['p', 'n', 'b', 'r', 'q', 'k'];

/// Parse a square string like "e2". Files are case-insensitive.
pub fn parse_square(s: &str) -> Option<Square> {
    let &[file, rank] = s.as_bytes() else {
        return None;
    };
    let file = File::ALL
        .get(file.to_ascii_lowercase().checked_sub(b'a')? as usize)
        .copied()?;
    let rank = Rank::ALL.get(rank.checked_sub(b'1')? as usize).copied()?;
    Some(Square::new(file, rank))
}

/// Format a square as "e2".
pub fn format_square(sq: Square) -> String {
    format!("{}{}", format_file(sq.file()), format_rank(sq.rank()))
}

pub fn format_file(f: File) -> char {
    (b'a' + f as u8) as char
}

pub fn format_rank(r: Rank) -> char {
    (b'1' + r as u8) as char
}

/// Lowercase piece letter, as used for UCI promotions.
pub fn format_piece(piece: Piece) -> char {
    PIECE_LETTERS[piece as usize]
}

/// Piece letter in FEN case: uppercase for White, lowercase for Black.
pub fn format_colored_piece(piece: Piece, color: Color) -> char {
    let c = format_piece(piece);
    match color {
        Color::White => c.to_ascii_uppercase(),
        Color::Black => c,
    }
}

/// Parse a piece letter in either case.
pub fn parse_piece(c: char) -> Option<Piece> {
    let c = c.to_ascii_lowercase();
    PIECE_LETTERS
        .iter()
        .position(|&letter| letter == c)
        .map(|i| Piece::ALL[i])
}

/// Parse "white"/"black" or "w"/"b", in any case.
pub fn parse_color(s: &str) -> Option<Color> {
    match s.to_lowercase().as_str() {
        "white" | "w" => Some(Color::White),
        "black" | "b" => Some(Color::Black),
        _ => None,
    }
}

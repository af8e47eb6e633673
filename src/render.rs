//! Movetext rendering from nested move records.

use crate::codec::PgnCodecOptions;
use crate::comment::join_commands;
use crate::position::Side;
use crate::record::MoveRecord;
use serde_json::Value;

/// Renders `moves` as `1. e4 c6 (1... c5 2. Nf3) 2. d4`.
///
/// Move numbers come from each record's own resulting position, so the
/// renderer needs no board. No result token is written.
pub(crate) fn render_movetext(moves: &[MoveRecord], options: &PgnCodecOptions) -> String {
    let mut out = String::new();
    write_line(&mut out, moves, options);
    out
}

fn write_line(out: &mut String, moves: &[MoveRecord], options: &PgnCodecOptions) {
    // A Black move needs its number at the start of a line and after
    // anything that interrupts the move pair.
    let mut interrupted = true;

    for record in moves {
        if let Some(number) = move_number(record, interrupted) {
            push_token(out, &number);
        }
        push_token(out, &record.notation);
        interrupted = false;

        let comment = comment_text(record, options);
        if !comment.is_empty() {
            push_token(out, &format!("{{ {comment} }}"));
            interrupted = true;
        }

        for line in &record.variations {
            push_token(out, "(");
            write_line(out, line, options);
            out.push(')');
            interrupted = true;
        }
    }
}

fn move_number(record: &MoveRecord, interrupted: bool) -> Option<String> {
    let fullmove = record.position.fullmove_number()?;

    // The position is the one after the move, so the mover is the side that
    // is no longer to move.
    match record.position.side_to_move().opposite() {
        Side::White => Some(format!("{fullmove}.")),
        Side::Black if interrupted => Some(format!("{}...", fullmove.saturating_sub(1))),
        Side::Black => None,
    }
}

/// A `}` inside a payload comment would close the braces early, so it is
/// written as `)`.
fn comment_text(record: &MoveRecord, options: &PgnCodecOptions) -> String {
    let text = record.comment.as_deref();
    let joined = if options.comment_commands {
        let command = |key: &str| record.extra.get(key).and_then(Value::as_str);
        join_commands(command("clk"), command("eval"), text)
    } else {
        text.unwrap_or_default().to_string()
    };
    joined.replace('}', ")")
}

fn push_token(out: &mut String, token: &str) {
    if !out.is_empty() && !out.ends_with('(') {
        out.push(' ');
    }
    out.push_str(token);
}

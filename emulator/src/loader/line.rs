//! Program line parsing
//!
//! A line holds a byte when it starts with a binary digit, written as 8 binary digits. Anything
//! after the 8th digit is ignored, and anything after a `#` is a comment. Lines starting with
//! anything else are not part of the program.

use nom::{
    branch::alt,
    bytes::complete::{take_till, take_while_m_n},
    character::complete::{char, satisfy},
    combinator::{all_consuming, map, map_res, not, opt, rest, value},
    sequence::{preceded, terminated},
    Finish, IResult,
};

use crate::constants::Word;

fn is_binary_digit(c: char) -> bool {
    c == '0' || c == '1'
}

/// Parses a byte written as exactly 8 binary digits
fn parse_binary_literal(input: &str) -> IResult<&str, Word> {
    map_res(take_while_m_n(8, 8, is_binary_digit), |digits| {
        Word::from_str_radix(digits, 2)
    })(input)
}

/// Parses an instruction byte, skipping whatever follows it up to the comment
fn parse_instruction(input: &str) -> IResult<&str, Word> {
    terminated(parse_binary_literal, take_till(|c| c == '#'))(input)
}

/// Parses an inline comment
fn parse_comment(input: &str) -> IResult<&str, &str> {
    preceded(char('#'), rest)(input)
}

/// Parses the text before the comment, which is skipped unless it starts with a binary digit
fn parse_code(input: &str) -> IResult<&str, Option<Word>> {
    alt((
        map(parse_instruction, Some),
        value(
            None,
            preceded(not(satisfy(is_binary_digit)), take_till(|c| c == '#')),
        ),
    ))(input)
}

/// Parses a whole line
fn parse_line_inner(input: &str) -> IResult<&str, Option<Word>> {
    let (input, byte) = parse_code(input)?;
    let (input, _) = opt(parse_comment)(input)?;
    Ok((input, byte))
}

/// Parse a single line of a program
///
/// Returns `None` for lines which do not start with a binary digit.
///
/// # Errors
///
/// When a line starts with a binary digit but does not hold 8 of them, returns the offset in
/// the line where parsing stopped.
pub(crate) fn parse_line(line: &str) -> Result<Option<Word>, usize> {
    all_consuming(parse_line_inner)(line)
        .finish()
        .map(|(_, value)| value)
        .map_err(|e: nom::error::Error<&str>| line.len() - e.input.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[track_caller]
    fn fully_parsed<T>(result: IResult<&str, T>) -> T {
        let (input, result) = result.unwrap();
        assert_eq!(input, "");
        result
    }

    #[test]
    fn parse_binary_literal_test() {
        assert_eq!(fully_parsed(parse_binary_literal("10000010")), 130);
        assert_eq!(fully_parsed(parse_binary_literal("00000000")), 0);
        assert_eq!(fully_parsed(parse_binary_literal("11111111")), 255);
        assert_eq!(parse_binary_literal("100000101"), Ok(("1", 130)));
        assert!(parse_binary_literal("1000001").is_err());
        assert!(parse_binary_literal("1000201").is_err());
    }

    #[test]
    fn parse_empty_line_test() {
        assert_eq!(parse_line(""), Ok(None));
        assert_eq!(parse_line("   \t"), Ok(None));
    }

    #[test]
    fn parse_comment_line_test() {
        assert_eq!(parse_line("# hello"), Ok(None));
        assert_eq!(parse_line("   # 10000010"), Ok(None));
        assert_eq!(parse_line("#"), Ok(None));
    }

    #[test]
    fn parse_instruction_line_test() {
        assert_eq!(parse_line("10000010"), Ok(Some(130)));
        assert_eq!(parse_line("10000010 # LDI R0,8"), Ok(Some(130)));
        assert_eq!(parse_line("00000001# HLT"), Ok(Some(1)));
        // Only the first 8 characters matter
        assert_eq!(parse_line("0000100011 trailing"), Ok(Some(8)));
    }

    #[test]
    fn skip_non_binary_line_test() {
        assert_eq!(parse_line("LDI R0, 8"), Ok(None));
        assert_eq!(parse_line("LDI R0 # 10000010"), Ok(None));
        // Bytes must start at the beginning of the line
        assert_eq!(parse_line("  01000111"), Ok(None));
        assert_eq!(parse_line("\t10000010 # LDI"), Ok(None));
    }

    #[test]
    fn parse_invalid_line_test() {
        assert_eq!(parse_line("1000001"), Err(0));
        assert_eq!(parse_line("1000001 # too short"), Err(0));
        assert_eq!(parse_line("1000x010"), Err(0));
        assert_eq!(parse_line("0"), Err(0));
    }
}

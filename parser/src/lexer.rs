//! FILENAME: parser/src/lexer.rs
//! PURPOSE: Scans a raw formula string and produces a stream of Tokens.
//! CONTEXT: This is the first stage of the parsing pipeline. It handles
//! whitespace skipping, number parsing (including fractional parts and
//! exponents like 2.5e-3), and identifiers used for cell references.
//!
//! SUPPORTED OPERATORS:
//! - Single char: + - * / ( )

use crate::token::Token;
use std::iter::Peekable;
use std::str::Chars;

pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input: input.chars().peekable(),
        }
    }

    /// Advances the lexer and returns the next token.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        match self.input.next() {
            Some('+') => Token::Plus,
            Some('-') => Token::Minus,
            Some('*') => Token::Asterisk,
            Some('/') => Token::Slash,
            Some('(') => Token::LParen,
            Some(')') => Token::RParen,

            // Handle Numbers (starts with digit or dot)
            Some(ch) if ch.is_ascii_digit() || ch == '.' => self.read_number(ch),

            // Handle Identifiers (starts with letter)
            Some(ch) if ch.is_ascii_alphabetic() => self.read_identifier(ch),

            // End of input
            None => Token::EOF,

            // Unknown character
            Some(ch) => Token::Illegal(ch),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&ch) = self.input.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.input.next();
        }
    }

    fn read_number(&mut self, first_char: char) -> Token {
        let mut number_str = String::from(first_char);
        let mut has_dot = first_char == '.';

        while let Some(&ch) = self.input.peek() {
            if ch.is_ascii_digit() {
                number_str.push(ch);
                self.input.next();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                number_str.push(ch);
                self.input.next();
            } else {
                break;
            }
        }

        // Optional exponent: 'e' or 'E', an optional sign, and at least one
        // digit. Committed only if the whole suffix is present, so "12ea"
        // lexes as the number 12 followed by an identifier.
        if matches!(self.input.peek(), Some(&'e') | Some(&'E')) {
            let mut lookahead = self.input.clone();
            let marker = lookahead.next().unwrap();
            let mut suffix = String::from(marker);

            if matches!(lookahead.peek(), Some(&'+') | Some(&'-')) {
                suffix.push(lookahead.next().unwrap());
            }

            let mut has_exp_digits = false;
            while let Some(&ch) = lookahead.peek() {
                if ch.is_ascii_digit() {
                    has_exp_digits = true;
                    suffix.push(ch);
                    lookahead.next();
                } else {
                    break;
                }
            }

            if has_exp_digits {
                number_str.push_str(&suffix);
                self.input = lookahead;
            }
        }

        if let Ok(n) = number_str.parse::<f64>() {
            Token::Number(n)
        } else {
            // Fallback if parsing fails (e.g. just ".")
            Token::Illegal(first_char)
        }
    }

    fn read_identifier(&mut self, first_char: char) -> Token {
        let mut ident = String::from(first_char);

        while let Some(&ch) = self.input.peek() {
            if ch.is_ascii_alphanumeric() {
                ident.push(ch);
                self.input.next();
            } else {
                break;
            }
        }

        // Normalize to UPPERCASE so "a1" and "A1" name the same cell
        Token::Identifier(ident.to_uppercase())
    }
}

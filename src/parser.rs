// TACK, a compact Lisp runtime for small machines.

// SPDX-FileCopyrightText: © 2021 Matthew Rothlisberger
// SPDX-License-Identifier: AGPL-3.0-only

// TACK is licensed under the terms of the GNU Affero General Public
// License version 3. See the top-level LICENSES directory for the
// license text.

// Find full copyright information in the top-level COPYRIGHT file.

// <>

// src/parser.rs

// Reads source text into cons structure. Square brackets are sugar
// for a call to list, a leading quote mark wraps the next value in a
// quote form, strings read as quoted symbols, and dotted symbols such
// as jack.name read as a path list of their segments.

// <>

use crate::{session::Session, value::Value, TackErr};

use std::{iter, str};

type Chars<'a> = iter::Peekable<str::Bytes<'a>>;

enum Item {
    Dot,
    Value(Value),
}

/// Parses a string into a list of top level forms
pub fn parse(ses: &mut Session, code: &str) -> Result<Value, TackErr> {
    let mut chars = code.bytes().peekable();
    let mut forms = Vec::new();

    loop {
        skip_blank(&mut chars);
        if chars.peek().is_none() {
            break;
        }
        forms.push(read_value(ses, &mut chars)?);
    }

    Ok(ses.heap.list(&forms))
}

/// Skips whitespace and comments running to the end of the line
fn skip_blank(chars: &mut Chars) {
    while let Some(&c) = chars.peek() {
        if c.is_ascii_whitespace() {
            chars.next();
        } else if c == b';' {
            for c in chars.by_ref() {
                if c == b'\n' {
                    break;
                }
            }
        } else {
            break;
        }
    }
}

fn is_delimiter(c: u8) -> bool {
    c.is_ascii_whitespace() || matches!(c, b'(' | b')' | b'[' | b']' | b'"' | b'\'' | b';')
}

fn read_value(ses: &mut Session, chars: &mut Chars) -> Result<Value, TackErr> {
    match read_item(ses, chars)? {
        Item::Value(val) => Ok(val),
        Item::Dot => Err(TackErr::Parse("'.' outside of a list".to_string())),
    }
}

/// Returns a contiguous value parsed from the input stream
/// The appropriate reader can almost always be deduced from the first character
fn read_item(ses: &mut Session, chars: &mut Chars) -> Result<Item, TackErr> {
    skip_blank(chars);

    let c = *chars
        .peek()
        .ok_or_else(|| TackErr::Parse("unexpected end of input".to_string()))?;

    let value = match c {
        b'\'' => {
            chars.next();
            let quoted = read_value(ses, chars)?;
            let quote = Value::Symbol(ses.quote_sym());
            ses.heap.cons(quote, quoted)
        }
        b'(' => {
            chars.next();
            read_list(ses, chars, b')')?
        }
        b'[' => {
            chars.next();
            let items = read_list(ses, chars, b']')?;
            let list = Value::Symbol(ses.list_sym());
            ses.heap.cons(list, items)
        }
        b')' | b']' => {
            return Err(TackErr::Parse(format!("unexpected '{}'", c as char)));
        }
        b'"' => {
            chars.next();
            read_string(ses, chars)?
        }
        _ => return read_atom(ses, chars),
    };

    Ok(Item::Value(value))
}

fn read_list(ses: &mut Session, chars: &mut Chars, close: u8) -> Result<Value, TackErr> {
    let mut items = Vec::new();
    let mut tail = Value::Nil;

    loop {
        skip_blank(chars);
        match chars.peek() {
            None => {
                return Err(TackErr::Parse(format!(
                    "missing '{}' before end of input",
                    close as char
                )))
            }
            Some(&c) if c == close => {
                chars.next();
                break;
            }
            Some(_) => match read_item(ses, chars)? {
                Item::Value(val) => items.push(val),
                Item::Dot => {
                    if items.is_empty() {
                        return Err(TackErr::Parse("'.' must follow a value".to_string()));
                    }
                    tail = read_value(ses, chars)?;
                    skip_blank(chars);
                    if chars.next() != Some(close) {
                        return Err(TackErr::Parse(
                            "expected exactly one value after '.'".to_string(),
                        ));
                    }
                    break;
                }
            },
        }
    }

    Ok(items
        .into_iter()
        .rev()
        .fold(tail, |acc, item| ses.heap.cons(item, acc)))
}

fn read_string(ses: &mut Session, chars: &mut Chars) -> Result<Value, TackErr> {
    let mut acc = Vec::new();
    loop {
        match chars.next() {
            Some(b'"') => break,
            Some(c) => acc.push(c),
            None => return Err(TackErr::Parse("unterminated string".to_string())),
        }
    }

    let text = String::from_utf8(acc).map_err(|e| TackErr::Parse(e.to_string()))?;
    let sym = ses.intern(&text);
    let quote = Value::Symbol(ses.quote_sym());
    Ok(ses.heap.cons(quote, sym))
}

fn read_atom(ses: &mut Session, chars: &mut Chars) -> Result<Item, TackErr> {
    let mut acc = Vec::new();
    while let Some(&c) = chars.peek() {
        if is_delimiter(c) {
            break;
        }
        acc.push(c);
        chars.next();
    }

    let word = String::from_utf8(acc).map_err(|e| TackErr::Parse(e.to_string()))?;

    let value = match word.as_str() {
        "." => return Ok(Item::Dot),
        "nil" => Value::Nil,
        "true" => Value::True,
        "false" => Value::False,
        w if is_number(w) => w
            .parse::<i32>()
            .map(Value::Integer)
            .map_err(|e| TackErr::Parse(format!("bad number '{}': {}", w, e)))?,
        w => read_symbols(ses, w),
    };

    Ok(Item::Value(value))
}

fn is_number(word: &str) -> bool {
    let digits = word.strip_prefix('-').unwrap_or(word);
    !digits.is_empty() && digits.bytes().all(|c| c.is_ascii_digit())
}

/// A plain symbol, or a path list when the word has interior dots
fn read_symbols(ses: &mut Session, word: &str) -> Value {
    if word.starts_with('.') || !word.contains('.') {
        return ses.intern(word);
    }

    let parts: Vec<Value> = word
        .split('.')
        .filter(|s| !s.is_empty())
        .map(|s| ses.intern(s))
        .collect();
    ses.heap.list(&parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round(ses: &mut Session, code: &str) -> String {
        let forms = parse(ses, code).unwrap();
        ses.heap
            .to_vec(forms)
            .into_iter()
            .map(|f| ses.show(f).to_string())
            .collect::<Vec<String>>()
            .join(" ")
    }

    #[test]
    fn parses() {
        let mut ses = Session::startup().unwrap();

        let exp = "(+ (nil 42 (e) true) false -2 e)";
        assert_eq!(round(&mut ses, exp), "(+ (nil 42 (e) true) false -2 e)");

        let exp = "(nil (nil) ((((nil nil)))))";
        assert_eq!(round(&mut ses, exp), exp);

        let exp = "((1 2 3 4) ;Comment\n5)";
        assert_eq!(round(&mut ses, exp), "((1 2 3 4) 5)");

        assert_eq!(round(&mut ses, "() 1 x"), "nil 1 x");
        assert_eq!(round(&mut ses, ""), "");
    }

    #[test]
    fn sugar() {
        let mut ses = Session::startup().unwrap();
        assert_eq!(round(&mut ses, "[1 2]"), "(list 1 2)");
        assert_eq!(round(&mut ses, "'x"), "(quote . x)");
        assert_eq!(round(&mut ses, "'(a b)"), "(quote a b)");
        assert_eq!(round(&mut ses, "'5"), "(quote . 5)");
        assert_eq!(round(&mut ses, "\"Jack Dean\""), "(quote . Jack Dean)");
        assert_eq!(round(&mut ses, "jack.name"), "(jack name)");
        assert_eq!(round(&mut ses, "'a.b.c"), "(quote a b c)");
    }

    #[test]
    fn numbers_and_symbols() {
        let mut ses = Session::startup().unwrap();
        let forms = parse(&mut ses, "-12 - *10 <= 7").unwrap();
        let items = ses.heap.to_vec(forms);

        assert_eq!(items[0], Value::Integer(-12));
        assert_eq!(items[1], ses.intern("-"));
        assert_eq!(items[2], ses.intern("*10"));
        assert_eq!(items[3], ses.intern("<="));
        assert_eq!(items[4], Value::Integer(7));
        assert!(parse(&mut ses, "99999999999").is_err());
    }

    #[test]
    fn dotted_pairs() {
        let mut ses = Session::startup().unwrap();
        assert_eq!(round(&mut ses, "(1 . 2)"), "(1 . 2)");
        assert_eq!(round(&mut ses, "(1 2 . 3)"), "(1 2 . 3)");
        assert_eq!(round(&mut ses, "(1 . (2 3))"), "(1 2 3)");
        assert!(parse(&mut ses, "(. 2)").is_err());
        assert!(parse(&mut ses, "(1 . 2 3)").is_err());
        assert!(parse(&mut ses, ".").is_err());
    }

    #[test]
    fn malformed() {
        let mut ses = Session::startup().unwrap();
        assert!(parse(&mut ses, "(1 2").is_err());
        assert!(parse(&mut ses, "[1 2)").is_err());
        assert!(parse(&mut ses, ")").is_err());
        assert!(parse(&mut ses, "\"open").is_err());
        assert!(parse(&mut ses, "'").is_err());
    }

    #[test]
    fn allocates_only_the_result() {
        let mut ses = Session::startup().unwrap();
        let live = ses.heap.live_count();
        parse(&mut ses, "(each 3 +)").unwrap();
        assert_eq!(ses.heap.live_count(), live + 4);
    }
}

//! Content-stream tokenizer and text-run extraction, backing
//! [`crate::page::Page::text_runs`].

use std::collections::HashMap;

use crate::font::FontInfo;

/// `{ text, font, size, x, y }` — one run per `Tf ... (text) Tj`/`TJ`
/// grouping inside a `BT ... ET` block, positioned by the most recent
/// `Td`/`TD` operands seen in that block.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub font: FontRef,
    pub size: f32,
    pub x: f32,
    pub y: f32,
}

/// The resource name a `Tf` operator names (e.g. `"F1"`); look it up with
/// [`crate::page::Page::resolve_font`] for its [`FontInfo`].
pub type FontRef = String;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Num(f32),
    Name(String),
    Str(Vec<u8>),
    ArrStart,
    ArrEnd,
    Op(String),
}

#[derive(Debug, Clone)]
enum Value {
    Num(f32),
    Name(String),
    Str(Vec<u8>),
    Array(Vec<Value>),
}

/// Extract every text run from a page content stream. `_fonts` is accepted
/// for symmetry with [`crate::xobject::place_images`] and future use (e.g.
/// validating that `Tf` names a declared resource); the run itself only
/// needs the resource name, not the resolved [`FontInfo`].
pub(crate) fn extract_text_runs(content: &[u8], _fonts: &HashMap<String, FontInfo>) -> Vec<TextRun> {
    let tokens = tokenize(content);
    let mut runs = Vec::new();
    let mut stack: Vec<Value> = Vec::new();
    let mut array_starts: Vec<usize> = Vec::new();

    let mut cur_font = String::new();
    let mut cur_size = 0.0_f32;
    let mut cur_x = 0.0_f32;
    let mut cur_y = 0.0_f32;

    for token in tokens {
        match token {
            Token::Num(n) => stack.push(Value::Num(n)),
            Token::Name(n) => stack.push(Value::Name(n)),
            Token::Str(s) => stack.push(Value::Str(s)),
            Token::ArrStart => {
                array_starts.push(stack.len());
                stack.push(Value::Array(Vec::new())); // placeholder, replaced on ArrEnd
            }
            Token::ArrEnd => {
                if let Some(start) = array_starts.pop() {
                    let items: Vec<Value> = stack.drain(start..).skip(1).collect();
                    stack.push(Value::Array(items));
                }
            }
            Token::Op(op) => {
                match op.as_str() {
                    "BT" => {
                        cur_x = 0.0;
                        cur_y = 0.0;
                    }
                    "Tf" => {
                        if let [Value::Name(name), Value::Num(size)] = stack.as_slice() {
                            cur_font = name.clone();
                            cur_size = *size;
                        }
                    }
                    "Td" | "TD" => {
                        if let [Value::Num(x), Value::Num(y)] = stack.as_slice() {
                            cur_x = *x;
                            cur_y = *y;
                        }
                    }
                    "Tj" => {
                        if let [Value::Str(bytes)] = stack.as_slice() {
                            runs.push(TextRun {
                                text: decode_text(bytes),
                                font: cur_font.clone(),
                                size: cur_size,
                                x: cur_x,
                                y: cur_y,
                            });
                        }
                    }
                    "TJ" => {
                        if let [Value::Array(items)] = stack.as_slice() {
                            let mut text = String::new();
                            for item in items {
                                if let Value::Str(bytes) = item {
                                    text.push_str(&decode_text(bytes));
                                }
                            }
                            if !text.is_empty() {
                                runs.push(TextRun { text, font: cur_font.clone(), size: cur_size, x: cur_x, y: cur_y });
                            }
                        }
                    }
                    _ => {}
                }
                stack.clear();
                array_starts.clear();
            }
        }
    }

    runs
}

fn decode_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

pub(crate) fn tokenize(content: &[u8]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < content.len() {
        let b = content[i];
        match b {
            b' ' | b'\t' | b'\r' | b'\n' => i += 1,
            b'%' => {
                while i < content.len() && content[i] != b'\n' {
                    i += 1;
                }
            }
            b'[' => {
                tokens.push(Token::ArrStart);
                i += 1;
            }
            b']' => {
                tokens.push(Token::ArrEnd);
                i += 1;
            }
            b'/' => {
                let start = i + 1;
                let mut end = start;
                while end < content.len() && !is_delimiter(content[end]) {
                    end += 1;
                }
                tokens.push(Token::Name(String::from_utf8_lossy(&content[start..end]).into_owned()));
                i = end;
            }
            b'(' => {
                let (s, next) = read_literal_string(content, i + 1);
                tokens.push(Token::Str(s));
                i = next;
            }
            b'<' if content.get(i + 1) != Some(&b'<') => {
                let start = i + 1;
                let mut end = start;
                while end < content.len() && content[end] != b'>' {
                    end += 1;
                }
                tokens.push(Token::Str(decode_hex_string(&content[start..end])));
                i = end + 1;
            }
            b'<' => {
                // Inline dictionary (e.g. BDC/DP properties); skip to matching `>>`.
                let mut depth = 0i32;
                let mut j = i;
                while j + 1 < content.len() {
                    if &content[j..j + 2] == b"<<" {
                        depth += 1;
                        j += 2;
                    } else if &content[j..j + 2] == b">>" {
                        depth -= 1;
                        j += 2;
                        if depth == 0 {
                            break;
                        }
                    } else {
                        j += 1;
                    }
                }
                i = j;
            }
            _ => {
                let start = i;
                let mut end = i;
                while end < content.len() && !is_delimiter(content[end]) {
                    end += 1;
                }
                let word = std::str::from_utf8(&content[start..end]).unwrap_or("");
                if let Ok(n) = word.parse::<f32>() {
                    tokens.push(Token::Num(n));
                } else if !word.is_empty() {
                    tokens.push(Token::Op(word.to_string()));
                }
                i = if end > start { end } else { i + 1 };
            }
        }
    }
    tokens
}

fn is_delimiter(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b'/' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'%')
}

fn read_literal_string(content: &[u8], mut i: usize) -> (Vec<u8>, usize) {
    let mut out = Vec::new();
    let mut depth = 1;
    while i < content.len() {
        match content[i] {
            b'\\' if i + 1 < content.len() => {
                out.push(content[i + 1]);
                i += 2;
            }
            b'(' => {
                depth += 1;
                out.push(b'(');
                i += 1;
            }
            b')' => {
                depth -= 1;
                i += 1;
                if depth == 0 {
                    break;
                }
                out.push(b')');
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    (out, i)
}

fn decode_hex_string(hex: &[u8]) -> Vec<u8> {
    let digits: Vec<u8> = hex.iter().copied().filter(|b| b.is_ascii_hexdigit()).collect();
    digits
        .chunks(2)
        .filter_map(|pair| {
            let s = std::str::from_utf8(pair).ok()?;
            let padded = if pair.len() == 1 { format!("{s}0") } else { s.to_string() };
            u8::from_str_radix(&padded, 16).ok()
        })
        .collect()
}

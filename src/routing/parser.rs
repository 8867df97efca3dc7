//! Strict literal parser for classifier routing output
//!
//! The classifier is asked for a single-line, Python-style list of
//! two-element string lists. What actually comes back is untrusted and
//! frequently malformed: missing brackets, mixed quoting, prose wrapped
//! around the list, truncated output. This parser accepts exactly one
//! structure, a sequence of `[string, string]` pairs, via its own
//! tokenizer, and degrades to a guaranteed CHATBOT fallback on anything
//! else. It is a total function; it never panics and never returns an
//! empty batch.

use super::{Module, RoutingCommand};

/// Parse raw classifier output into an ordered command batch
///
/// Ordering is preserved exactly as produced by the classifier; no
/// deduplication is performed here. Malformed input of any kind yields
/// `[(CHATBOT, "Sorry, I couldn't understand that.")]`.
#[must_use]
pub fn parse_routing(raw: &str) -> Vec<RoutingCommand> {
    let trimmed = raw.trim();

    // The model sometimes emits bare pairs without the outer list.
    let candidate = if trimmed.starts_with('[') {
        trimmed.to_string()
    } else {
        format!("[{trimmed}]")
    };

    match parse_pairs(&candidate) {
        Ok(pairs) if !pairs.is_empty() => pairs
            .into_iter()
            .map(|(tag, query)| RoutingCommand::new(Module::from_tag(&tag), query))
            .collect(),
        Ok(_) => {
            tracing::warn!("classifier returned an empty list, using fallback");
            RoutingCommand::fallback()
        }
        Err(e) => {
            tracing::warn!(error = %e, raw = %trimmed, "routing parse failed, using fallback");
            RoutingCommand::fallback()
        }
    }
}

/// Tokens of the routing mini-grammar
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    Comma,
    Str(String),
}

/// Tokenize the candidate text
///
/// Accepts only brackets, commas, string literals (single or double
/// quoted, with backslash escapes) and whitespace. Anything else
/// (prose, numbers, identifiers) is a tokenization error.
fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '[' => tokens.push(Token::Open),
            ']' => tokens.push(Token::Close),
            ',' => tokens.push(Token::Comma),
            '\'' | '"' => {
                let quote = c;
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some('\\') => match chars.next() {
                            Some('n') => value.push('\n'),
                            Some('t') => value.push('\t'),
                            Some(escaped) => value.push(escaped),
                            None => return Err("unterminated escape".to_string()),
                        },
                        Some(ch) if ch == quote => break,
                        Some(ch) => value.push(ch),
                        None => return Err("unterminated string literal".to_string()),
                    }
                }
                tokens.push(Token::Str(value));
            }
            c if c.is_whitespace() => {}
            other => return Err(format!("unexpected character {other:?}")),
        }
    }

    Ok(tokens)
}

/// Parse `[[str, str], ...]` from the token stream
///
/// Trailing commas are tolerated (models emit them); tuples, nesting
/// deeper than two levels, non-string elements, and pairs of the wrong
/// arity are all rejected uniformly.
fn parse_pairs(input: &str) -> Result<Vec<(String, String)>, String> {
    let tokens = tokenize(input)?;
    let mut pos = 0;

    expect(&tokens, &mut pos, &Token::Open)?;

    let mut pairs = Vec::new();
    loop {
        match tokens.get(pos) {
            Some(Token::Close) => {
                pos += 1;
                break;
            }
            Some(Token::Open) => {
                pairs.push(parse_pair(&tokens, &mut pos)?);
                // Separator or end of list
                if tokens.get(pos) == Some(&Token::Comma) {
                    pos += 1;
                }
            }
            Some(other) => return Err(format!("expected pair, found {other:?}")),
            None => return Err("unterminated list".to_string()),
        }
    }

    if pos != tokens.len() {
        return Err("trailing tokens after list".to_string());
    }

    Ok(pairs)
}

fn parse_pair(tokens: &[Token], pos: &mut usize) -> Result<(String, String), String> {
    expect(tokens, pos, &Token::Open)?;

    let module = expect_string(tokens, pos)?;
    expect(tokens, pos, &Token::Comma)?;
    let query = expect_string(tokens, pos)?;

    // Tolerate a trailing comma inside the pair, but not a third element.
    if tokens.get(*pos) == Some(&Token::Comma) {
        *pos += 1;
    }
    expect(tokens, pos, &Token::Close)?;

    Ok((module, query))
}

fn expect(tokens: &[Token], pos: &mut usize, wanted: &Token) -> Result<(), String> {
    match tokens.get(*pos) {
        Some(t) if t == wanted => {
            *pos += 1;
            Ok(())
        }
        Some(other) => Err(format!("expected {wanted:?}, found {other:?}")),
        None => Err(format!("expected {wanted:?}, found end of input")),
    }
}

fn expect_string(tokens: &[Token], pos: &mut usize) -> Result<String, String> {
    match tokens.get(*pos) {
        Some(Token::Str(s)) => {
            *pos += 1;
            Ok(s.clone())
        }
        Some(other) => Err(format!("expected string literal, found {other:?}")),
        None => Err("expected string literal, found end of input".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::FALLBACK_REPLY;

    fn assert_fallback(raw: &str) {
        let commands = parse_routing(raw);
        assert_eq!(commands.len(), 1, "input {raw:?}");
        assert_eq!(commands[0].module, Module::Chatbot);
        assert_eq!(commands[0].query, FALLBACK_REPLY);
    }

    #[test]
    fn parses_well_formed_batch() {
        let commands =
            parse_routing("[['WEATHER', 'Weather in Karachi'], ['CHATBOT', 'hi there']]");
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].module, Module::Weather);
        assert_eq!(commands[0].query, "Weather in Karachi");
        assert_eq!(commands[1].module, Module::Chatbot);
    }

    #[test]
    fn accepts_double_quotes_and_escapes() {
        let commands = parse_routing(r#"[["CHATBOT", "What\'s Newton\'s law?"]]"#);
        assert_eq!(commands[0].query, "What's Newton's law?");
    }

    #[test]
    fn wraps_bare_pair_in_outer_list() {
        let commands = parse_routing("['TIME', 'Current time']");
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].module, Module::Time);
    }

    #[test]
    fn tolerates_trailing_comma() {
        let commands = parse_routing("[['SEARCH', 'moon landing'],]");
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].module, Module::Search);
    }

    #[test]
    fn prose_falls_back() {
        assert_fallback("not a list");
        assert_fallback("Sure! Here is the routing: [['CHATBOT', 'hi']]");
    }

    #[test]
    fn malformed_structures_fall_back() {
        assert_fallback("");
        assert_fallback("[");
        assert_fallback("[]");
        assert_fallback("[['CHATBOT']]");
        assert_fallback("[['CHATBOT', 'a', 'b']]");
        assert_fallback("[[CHATBOT, 'a']]");
        assert_fallback("[['CHATBOT', ['nested', 'x']]]");
        assert_fallback("[['CHATBOT', 'unterminated]");
    }

    #[test]
    fn preserves_classifier_order() {
        let commands = parse_routing(
            "[['CHATBOT', 'c'], ['WEATHER', 'w'], ['CHATBOT', 'c2'], ['Exit', 'Exit']]",
        );
        let modules: Vec<_> = commands.iter().map(|c| c.module.clone()).collect();
        assert_eq!(
            modules,
            vec![
                Module::Chatbot,
                Module::Weather,
                Module::Chatbot,
                Module::Exit
            ]
        );
    }
}

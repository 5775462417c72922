pub mod error;
pub mod token;

use compact_str::CompactString;
use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag},
    character::complete::{alpha1, alphanumeric1, char, digit0, digit1, multispace0, one_of},
    combinator::{map, opt, recognize, value},
    multi::{many0, separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, separated_pair, tuple},
    IResult,
};

use crate::path::Path;
use crate::value::Value;
use error::LexerError;
use token::{Args, Argument, DirectiveCall, Kwargs, Span, Token, TokenKind};

/// Prefix that introduces every directive.
pub const DIRECTIVE_PREFIX: char = '$';

/// Splits a directive-bearing string into plain-text and directive tokens.
///
/// A directive starts at `$` followed by an identifier; an optional single
/// parenthesis pair holds its arguments, scanned as one flat region. A `$`
/// not followed by an identifier is plain text. Escaping is not supported.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexerError> {
    let mut tokens = Vec::new();
    let mut plain_start = 0;
    let mut cursor = 0;

    while let Some(offset) = input[cursor..].find(DIRECTIVE_PREFIX) {
        let at = cursor + offset;
        let name = match identifier(&input[at + 1..]) {
            Ok((_, name)) => name,
            Err(_) => {
                cursor = at + 1;
                continue;
            }
        };

        if plain_start < at {
            tokens.push(Token {
                kind: TokenKind::Plain(input[plain_start..at].to_string()),
                span: Span::new(plain_start, at),
            });
        }

        let name_end = at + 1 + name.len();
        let (call, end) = if input[name_end..].starts_with('(') {
            let args_start = name_end + 1;
            match input[args_start..].find(|c: char| c == '(' || c == ')') {
                Some(rel) if input.as_bytes()[args_start + rel] == b'(' => {
                    return Err(LexerError::UnsupportedNesting {
                        span: Span::new(args_start + rel, args_start + rel + 1),
                    });
                }
                Some(rel) => {
                    let close = args_start + rel;
                    let region = Span::new(args_start, close);
                    let (args, kwargs) = parse_arguments(&input[args_start..close], region)?;
                    let call = DirectiveCall {
                        name: CompactString::from(name),
                        args,
                        kwargs,
                    };
                    (call, close + 1)
                }
                None => {
                    return Err(LexerError::UnterminatedCall {
                        span: Span::new(at, input.len()),
                    });
                }
            }
        } else {
            (DirectiveCall::compact(name), name_end)
        };

        tokens.push(Token {
            kind: TokenKind::Directive(call),
            span: Span::new(at, end),
        });
        cursor = end;
        plain_start = end;
    }

    if plain_start < input.len() {
        tokens.push(Token {
            kind: TokenKind::Plain(input[plain_start..].to_string()),
            span: Span::new(plain_start, input.len()),
        });
    }

    Ok(tokens)
}

enum Element {
    Positional(Argument),
    Keyword(CompactString, Argument),
}

/// Parses the flat text between a directive's parentheses.
fn parse_arguments(text: &str, span: Span) -> Result<(Args, Kwargs), LexerError> {
    let parsed: IResult<&str, Vec<Element>> = delimited(
        multispace0,
        separated_list0(delimited(multispace0, char(','), multispace0), element),
        multispace0,
    )(text);
    let (rest, elements) = parsed.map_err(|_| LexerError::BadArgumentSyntax {
        message: "malformed argument list".to_string(),
        span,
    })?;

    if !rest.is_empty() {
        let offending = rest.split(',').next().unwrap_or(rest).trim();
        return Err(if offending.starts_with('.') {
            LexerError::BadIdentifier {
                text: offending.to_string(),
                span,
            }
        } else {
            LexerError::BadArgumentSyntax {
                message: format!("unexpected `{offending}`"),
                span,
            }
        });
    }

    let mut args = Args::new();
    let mut kwargs = Kwargs::new();
    for element in elements {
        match element {
            Element::Positional(argument) => {
                if !kwargs.is_empty() {
                    return Err(LexerError::BadArgumentSyntax {
                        message: "positional argument after keyword argument".to_string(),
                        span,
                    });
                }
                args.push(argument);
            }
            Element::Keyword(name, argument) => {
                if kwargs.iter().any(|(existing, _)| *existing == name) {
                    return Err(LexerError::BadArgumentSyntax {
                        message: format!("duplicate keyword argument `{name}`"),
                        span,
                    });
                }
                kwargs.push((name, argument));
            }
        }
    }
    Ok((args, kwargs))
}

fn element(input: &str) -> IResult<&str, Element> {
    alt((
        map(
            separated_pair(
                identifier,
                delimited(multispace0, char('='), multispace0),
                argument,
            ),
            |(name, argument)| Element::Keyword(CompactString::from(name), argument),
        ),
        map(argument, Element::Positional),
    ))(input)
}

fn argument(input: &str) -> IResult<&str, Argument> {
    alt((
        map(string_literal, |s| Argument::Literal(Value::String(s))),
        number,
        map(dotted_identifier, classify_word),
    ))(input)
}

/// Bare words are booleans, nulls or dotted identifiers.
fn classify_word(word: &str) -> Argument {
    if !word.contains('.') {
        match word.to_ascii_lowercase().as_str() {
            "true" => return Argument::Literal(Value::Bool(true)),
            "false" => return Argument::Literal(Value::Bool(false)),
            "null" | "none" => return Argument::Literal(Value::Null),
            _ => {}
        }
    }
    match Path::parse(word) {
        Ok(path) => Argument::Ident(path),
        Err(_) => unreachable!("dotted identifiers always form a valid path"),
    }
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn dotted_identifier(input: &str) -> IResult<&str, &str> {
    recognize(separated_list1(char('.'), identifier))(input)
}

fn number(input: &str) -> IResult<&str, Argument> {
    let (rest, text) = recognize(tuple((
        opt(one_of("+-")),
        digit1,
        opt(preceded(char('.'), digit0)),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
    )))(input)?;

    let literal = if text.contains('.') || text.contains('e') || text.contains('E') {
        Value::Float(text.parse().unwrap_or(f64::NAN))
    } else {
        match text.parse::<i64>() {
            Ok(n) => Value::Int(n),
            Err(_) => Value::Float(text.parse().unwrap_or(f64::NAN)),
        }
    };
    Ok((rest, Argument::Literal(literal)))
}

fn string_literal(input: &str) -> IResult<&str, String> {
    alt((quoted('\''), quoted('"')))(input)
}

fn quoted(quote: char) -> impl FnMut(&str) -> IResult<&str, String> {
    move |input: &str| {
        let normal = if quote == '\'' { "\\'" } else { "\\\"" };
        delimited(
            char(quote),
            alt((
                escaped_transform(
                    is_not(normal),
                    '\\',
                    alt((
                        value("\n", char('n')),
                        value("\t", char('t')),
                        value("\\", char('\\')),
                        value("'", char('\'')),
                        value("\"", char('"')),
                    )),
                ),
                map(tag(""), |_: &str| String::new()),
            )),
            char(quote),
        )(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn plain(text: &str) -> TokenKind {
        TokenKind::Plain(text.to_string())
    }

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_plain_only() {
        assert_eq!(kinds("just text"), vec![plain("just text")]);
    }

    #[test]
    fn test_empty_string() {
        assert_eq!(kinds(""), Vec::new());
    }

    #[rstest]
    #[case("$", vec![plain("$")])]
    #[case("100$", vec![plain("100$")])]
    #[case("$5 bill", vec![plain("$5 bill")])]
    #[case("a$ b", vec![plain("a$ b")])]
    fn test_lone_dollar_is_plain(#[case] input: &str, #[case] expected: Vec<TokenKind>) {
        assert_eq!(kinds(input), expected);
    }

    #[test]
    fn test_compact_directive() {
        assert_eq!(
            kinds("$index"),
            vec![TokenKind::Directive(DirectiveCall::compact("index"))]
        );
    }

    #[test]
    fn test_single_call_directive() {
        let tokens = kinds("$var(color.hue)");
        let TokenKind::Directive(call) = &tokens[0] else {
            panic!("expected a directive, got {tokens:?}");
        };
        assert_eq!(call.name, "var");
        assert_eq!(
            call.args.to_vec(),
            vec![Argument::Ident(Path::parse("color.hue").unwrap())]
        );
        assert!(call.kwargs.is_empty());
    }

    #[test]
    fn test_bundle_tokens_and_spans() {
        let tokens = tokenize("a $index b").unwrap();
        assert_eq!(
            tokens.iter().map(|t| t.kind.clone()).collect::<Vec<_>>(),
            vec![
                plain("a "),
                TokenKind::Directive(DirectiveCall::compact("index")),
                plain(" b"),
            ]
        );
        assert_eq!(tokens[1].span, Span::new(2, 8));
    }

    #[rstest]
    #[case("1096", Value::Int(1096))]
    #[case("-3", Value::Int(-3))]
    #[case("20.0", Value::Float(20.0))]
    #[case("1.5e3", Value::Float(1500.0))]
    #[case("'40'", Value::String("40".into()))]
    #[case("\"hi there\"", Value::String("hi there".into()))]
    #[case("''", Value::String(String::new()))]
    #[case("True", Value::Bool(true))]
    #[case("false", Value::Bool(false))]
    #[case("null", Value::Null)]
    #[case("None", Value::Null)]
    fn test_literal_arguments(#[case] text: &str, #[case] expected: Value) {
        let tokens = tokenize(&format!("$sweep({text})")).unwrap();
        let TokenKind::Directive(call) = &tokens[0].kind else {
            panic!("expected a directive");
        };
        assert_eq!(call.args[0], Argument::Literal(expected));
    }

    #[test]
    fn test_ident_argument() {
        let tokens = tokenize("$sweep(alpha.beta)").unwrap();
        let TokenKind::Directive(call) = &tokens[0].kind else {
            panic!("expected a directive");
        };
        assert_eq!(
            call.args[0],
            Argument::Ident(Path::parse("alpha.beta").unwrap())
        );
    }

    #[test]
    fn test_string_escapes_and_commas() {
        let tokens = tokenize(r"$sweep('a, b', 'don\'t\n')").unwrap();
        let TokenKind::Directive(call) = &tokens[0].kind else {
            panic!("expected a directive");
        };
        assert_eq!(call.args[0], Argument::Literal(Value::String("a, b".into())));
        assert_eq!(
            call.args[1],
            Argument::Literal(Value::String("don't\n".into()))
        );
    }

    #[test]
    fn test_keyword_arguments() {
        let tokens = tokenize("$var(color.hue, default='blue', env=True)").unwrap();
        let TokenKind::Directive(call) = &tokens[0].kind else {
            panic!("expected a directive");
        };
        assert_eq!(call.args.len(), 1);
        assert_eq!(
            call.kwargs,
            vec![
                (
                    CompactString::from("default"),
                    Argument::Literal(Value::String("blue".into()))
                ),
                (
                    CompactString::from("env"),
                    Argument::Literal(Value::Bool(true))
                ),
            ]
        );
    }

    #[test]
    fn test_nested_parentheses_rejected() {
        assert!(matches!(
            tokenize("$sweep($var(a))"),
            Err(LexerError::UnsupportedNesting { .. })
        ));
    }

    #[test]
    fn test_unterminated_call() {
        assert!(matches!(
            tokenize("$var(color.hue"),
            Err(LexerError::UnterminatedCall { .. })
        ));
    }

    #[rstest]
    #[case("$var(a..b)")]
    #[case("$var(a.)")]
    fn test_bad_identifier(#[case] input: &str) {
        assert!(matches!(
            tokenize(input),
            Err(LexerError::BadIdentifier { .. })
        ));
    }

    #[rstest]
    #[case("$var(default=1, color.hue)")]
    #[case("$var(default=1, default=2)")]
    #[case("$sweep(1 2)")]
    fn test_bad_argument_syntax(#[case] input: &str) {
        assert!(matches!(
            tokenize(input),
            Err(LexerError::BadArgumentSyntax { .. })
        ));
    }

    #[test]
    fn test_empty_arguments() {
        let tokens = tokenize("$uuid()").unwrap();
        let TokenKind::Directive(call) = &tokens[0].kind else {
            panic!("expected a directive");
        };
        assert!(call.is_compact());
    }

    #[test]
    fn test_directive_display_round_trip() {
        let tokens = tokenize("$var(color.hue, default='blue')").unwrap();
        assert_eq!(tokens[0].to_string(), "$var(color.hue, default='blue')");
    }
}

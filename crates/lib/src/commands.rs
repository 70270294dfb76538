//! Chat command parsing: `!news`, `!add`, `!remove`, `!clear-news`, `!get`.
//!
//! The command word is the first whitespace-separated token of the trimmed text and
//! must match exactly (case-sensitive). Anything else is [`ParseError::NotACommand`].
//! This is stricter than plain prefix matching: `!getall` or `!newsX AAPL http://x`
//! are ordinary chat text, not a malformed `!get`/`!news`.

use std::fmt;

const NEWS: &str = "!news";
const ADD: &str = "!add";
const REMOVE: &str = "!remove";
const CLEAR_NEWS: &str = "!clear-news";
const GET: &str = "!get";

/// A recognized chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    News { ticker: String, url: String },
    AddTicker { ticker: String },
    RemoveTicker { ticker: String },
    ClearNews,
    GetTickers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Regular chat text; ignored.
    #[error("not a command")]
    NotACommand,
    #[error("invalid arguments")]
    InvalidArguments,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::News { ticker, .. } => write!(f, "{} {}", NEWS, ticker),
            Command::AddTicker { ticker } => write!(f, "{} {}", ADD, ticker),
            Command::RemoveTicker { ticker } => write!(f, "{} {}", REMOVE, ticker),
            Command::ClearNews => f.write_str(CLEAR_NEWS),
            Command::GetTickers => f.write_str(GET),
        }
    }
}

/// Parse raw message text into a [`Command`]. Pure: no I/O, same input gives same output.
pub fn parse(text: &str) -> Result<Command, ParseError> {
    let text = text.trim();
    let (word, rest) = match text.find(char::is_whitespace) {
        Some(i) => (&text[..i], &text[i..]),
        None => (text, ""),
    };
    match word {
        NEWS => parse_news(rest),
        ADD => single_ticker(rest).map(|ticker| Command::AddTicker { ticker }),
        REMOVE => single_ticker(rest).map(|ticker| Command::RemoveTicker { ticker }),
        CLEAR_NEWS => Ok(Command::ClearNews),
        GET => Ok(Command::GetTickers),
        _ => Err(ParseError::NotACommand),
    }
}

fn parse_news(rest: &str) -> Result<Command, ParseError> {
    let mut tokens = rest.split_whitespace();
    let (Some(ticker), Some(url)) = (tokens.next(), tokens.next()) else {
        return Err(ParseError::InvalidArguments);
    };
    if !url.starts_with("http") {
        return Err(ParseError::InvalidArguments);
    }
    Ok(Command::News {
        ticker: ticker.to_string(),
        url: url.to_string(),
    })
}

fn single_ticker(rest: &str) -> Result<String, ParseError> {
    let ticker = rest.trim();
    if ticker.is_empty() {
        return Err(ParseError::InvalidArguments);
    }
    Ok(ticker.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn news_with_ticker_and_url() {
        assert_eq!(
            parse("!news AAPL https://x.test"),
            Ok(Command::News {
                ticker: "AAPL".to_string(),
                url: "https://x.test".to_string(),
            })
        );
    }

    #[test]
    fn news_rejects_non_http_url() {
        assert_eq!(parse("!news AAPL notaurl"), Err(ParseError::InvalidArguments));
    }

    #[test]
    fn news_requires_both_tokens() {
        assert_eq!(parse("!news"), Err(ParseError::InvalidArguments));
        assert_eq!(parse("!news AAPL"), Err(ParseError::InvalidArguments));
    }

    #[test]
    fn news_ignores_extra_tokens_and_whitespace() {
        assert_eq!(
            parse("  !news   TSLA\thttp://a.test  trailing words "),
            Ok(Command::News {
                ticker: "TSLA".to_string(),
                url: "http://a.test".to_string(),
            })
        );
    }

    #[test]
    fn add_and_remove_take_one_ticker() {
        assert_eq!(
            parse("!add TSLA"),
            Ok(Command::AddTicker {
                ticker: "TSLA".to_string()
            })
        );
        assert_eq!(
            parse("!remove  NVDA "),
            Ok(Command::RemoveTicker {
                ticker: "NVDA".to_string()
            })
        );
    }

    #[test]
    fn add_with_empty_ticker_is_invalid() {
        assert_eq!(parse("!add "), Err(ParseError::InvalidArguments));
        assert_eq!(parse("!remove"), Err(ParseError::InvalidArguments));
    }

    #[test]
    fn argumentless_commands_ignore_trailing_text() {
        assert_eq!(parse("!clear-news"), Ok(Command::ClearNews));
        assert_eq!(parse("!clear-news please"), Ok(Command::ClearNews));
        assert_eq!(parse("!get all of them"), Ok(Command::GetTickers));
    }

    #[test]
    fn other_text_is_not_a_command() {
        for text in [
            "",
            "hello",
            "news AAPL https://x.test",
            "!NEWS AAPL https://x.test",
            "!getall",
            "!addTSLA",
            "please !get",
        ] {
            assert_eq!(parse(text), Err(ParseError::NotACommand), "{:?}", text);
        }
    }

    #[test]
    fn command_display_names_the_command_word() {
        let cmd = Command::AddTicker {
            ticker: "TSLA".to_string(),
        };
        assert_eq!(cmd.to_string(), "!add TSLA");
        assert_eq!(Command::ClearNews.to_string(), "!clear-news");
    }
}

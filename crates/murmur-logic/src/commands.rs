use murmur_protocol::{AiJob, AiOp};

/// A chat body that turned out to be an enrichment command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ask { prompt: String },
    Summarize { prompt: String },
    Translate { lang: String, prompt: String },
}

/// Classify the leading token of a room message. `None` means plain chat.
///
/// `/ai` without a space (or any other text) is not a command; `/translate`
/// without a language falls back to English, like `/translate hello` does.
pub fn parse_command(body: &str) -> Option<Command> {
    let msg = body.trim();

    if let Some(rest) = msg.strip_prefix("/ai ") {
        return Some(Command::Ask {
            prompt: rest.trim().to_string(),
        });
    }

    if msg == "/summarize" {
        return Some(Command::Summarize {
            prompt: String::new(),
        });
    }
    if let Some(rest) = msg.strip_prefix("/summarize ") {
        return Some(Command::Summarize {
            prompt: rest.trim().to_string(),
        });
    }

    if let Some(tail) = msg.strip_prefix("/translate ") {
        let tail = tail.trim();
        return Some(match tail.split_once(' ') {
            Some((lang, text)) => Command::Translate {
                lang: lang.to_string(),
                prompt: text.trim().to_string(),
            },
            None => Command::Translate {
                lang: "en".to_string(),
                prompt: tail.to_string(),
            },
        });
    }

    None
}

impl Command {
    pub fn into_job(self, room_id: i64, from_user_id: i64, from_user_name: &str) -> AiJob {
        let (op, prompt, lang) = match self {
            Command::Ask { prompt } => (AiOp::Ask, prompt, String::new()),
            Command::Summarize { prompt } => (AiOp::Summarize, prompt, String::new()),
            Command::Translate { lang, prompt } => (AiOp::Translate, prompt, lang),
        };
        AiJob {
            op,
            room_id,
            from_user_id,
            from_user_name: from_user_name.to_string(),
            prompt,
            lang,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_ask() {
        assert_eq!(
            parse_command("/ai what is rust?"),
            Some(Command::Ask {
                prompt: "what is rust?".to_string()
            })
        );
        // no trailing space, no command
        assert_eq!(parse_command("/ai"), None);
    }

    #[test]
    fn classifies_summarize_with_optional_hint() {
        assert_eq!(
            parse_command("/summarize"),
            Some(Command::Summarize {
                prompt: String::new()
            })
        );
        assert_eq!(
            parse_command("/summarize last 50"),
            Some(Command::Summarize {
                prompt: "last 50".to_string()
            })
        );
    }

    #[test]
    fn classifies_translate() {
        assert_eq!(
            parse_command("/translate en 你好"),
            Some(Command::Translate {
                lang: "en".to_string(),
                prompt: "你好".to_string()
            })
        );
        // missing language defaults to english
        assert_eq!(
            parse_command("/translate bonjour"),
            Some(Command::Translate {
                lang: "en".to_string(),
                prompt: "bonjour".to_string()
            })
        );
    }

    #[test]
    fn plain_chat_is_not_a_command() {
        assert_eq!(parse_command("hello /ai there"), None);
        assert_eq!(parse_command("just text"), None);
    }

    #[test]
    fn job_carries_originator() {
        let job = parse_command("/translate ja hi")
            .unwrap()
            .into_job(7, 42, "alice");
        assert_eq!(job.op, AiOp::Translate);
        assert_eq!(job.room_id, 7);
        assert_eq!(job.from_user_name, "alice");
        assert_eq!(job.lang, "ja");
    }
}

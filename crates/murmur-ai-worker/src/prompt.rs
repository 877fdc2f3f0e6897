use murmur_protocol::{AiJob, AiOp};

/// Shape the model input per operation. Ask passes through; translate gets
/// a directive with the target language (English when unspecified);
/// summarize wraps the transcript the producer already formatted.
pub fn build_prompt(job: &AiJob) -> String {
    match job.op {
        AiOp::Ask => job.prompt.clone(),
        AiOp::Translate => {
            let lang = if job.lang.is_empty() { "en" } else { &job.lang };
            format!("Translate into {}: {}", lang, job.prompt)
        }
        AiOp::Summarize => {
            if job.prompt.trim().is_empty() {
                "请用中文简要总结这段群聊（要点化、合并重复、给出结论）。".to_string()
            } else {
                format!(
                    "请用中文简要总结这段群聊（要点化、合并重复、给出结论）：\n{}",
                    job.prompt
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(op: AiOp, prompt: &str, lang: &str) -> AiJob {
        AiJob {
            op,
            room_id: 1,
            from_user_id: 1,
            from_user_name: "alice".to_string(),
            prompt: prompt.to_string(),
            lang: lang.to_string(),
        }
    }

    #[test]
    fn ask_passes_through() {
        assert_eq!(build_prompt(&job(AiOp::Ask, "why rust?", "")), "why rust?");
    }

    #[test]
    fn translate_defaults_to_english() {
        assert_eq!(
            build_prompt(&job(AiOp::Translate, "你好", "")),
            "Translate into en: 你好"
        );
        assert_eq!(
            build_prompt(&job(AiOp::Translate, "hello", "ja")),
            "Translate into ja: hello"
        );
    }

    #[test]
    fn summarize_wraps_transcript() {
        let p = build_prompt(&job(AiOp::Summarize, "[09:00:01] a: hi", ""));
        assert!(p.contains("总结"));
        assert!(p.ends_with("[09:00:01] a: hi"));
    }
}

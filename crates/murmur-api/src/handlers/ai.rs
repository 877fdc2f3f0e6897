use std::fmt::Write as _;
use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Deserialize;
use tracing::warn;

use murmur_protocol::rpc::MessageDto;
use murmur_protocol::{AiJob, AiOp, RPC_CODE_SUCCESS};

use crate::handlers::{require_auth, AppState};
use crate::response::{fail, ok, ApiResponse};

const DEFAULT_SUMMARIZE_LINES: i64 = 120;

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FormSummarize {
    pub auth_token: String,
    pub room_id: i64,
    /// History lines to feed the model; 80–200 works well.
    pub limit: i64,
}

/// Pull recent history, fold it into a transcript prompt, and queue a
/// summarize job for the AI worker.
pub async fn summarize(
    State(state): State<Arc<AppState>>,
    Json(form): Json<FormSummarize>,
) -> Json<ApiResponse> {
    if form.room_id <= 0 {
        return fail("roomId is required");
    }
    let limit = if form.limit <= 0 || form.limit > 500 {
        DEFAULT_SUMMARIZE_LINES
    } else {
        form.limit
    };
    let (user_id, user_name) = match require_auth(&state, &form.auth_token).await {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let history = match state.logic.list_room_messages(form.room_id, limit).await {
        Ok(reply) if reply.code == RPC_CODE_SUCCESS => reply.data,
        _ => return fail("list history fail"),
    };

    let job = AiJob {
        op: AiOp::Summarize,
        room_id: form.room_id,
        from_user_id: user_id,
        from_user_name: user_name,
        prompt: build_summarize_prompt(&history),
        lang: String::new(),
    };
    let payload = match serde_json::to_vec(&job) {
        Ok(p) => p,
        Err(e) => return fail(&e.to_string()),
    };
    if let Err(e) = state
        .broker
        .publish(
            &state.ai_jobs_topic,
            &format!("room:{}", form.room_id),
            payload,
        )
        .await
    {
        warn!(room_id = form.room_id, error = %e, "ai job enqueue failed");
        return fail("enqueue ai job fail");
    }
    ok("ok", "已提交AI总结任务")
}

/// `[HH:MM:SS] <name>: <content>` per line under a bullet-summary
/// instruction.
fn build_summarize_prompt(history: &[MessageDto]) -> String {
    let mut prompt = String::from("以下是聊天室最近的对话，请用中文生成要点式总结：\n");
    for m in history {
        let ts = if m.create_time.len() >= 8 {
            &m.create_time[m.create_time.len() - 8..]
        } else {
            m.create_time.as_str()
        };
        let _ = writeln!(prompt, "[{}] {}: {}", ts, m.from_user_name, m.content);
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dto(time: &str, name: &str, content: &str) -> MessageDto {
        MessageDto {
            id: 1,
            room_id: 1,
            from_user_id: 1,
            from_user_name: name.to_string(),
            content: content.to_string(),
            create_time: time.to_string(),
        }
    }

    #[test]
    fn prompt_lines_use_clock_time_only() {
        let prompt = build_summarize_prompt(&[
            dto("2026-03-01 09:30:00", "alice", "hi"),
            dto("2026-03-01 09:30:05", "bob", "hello"),
        ]);
        assert!(prompt.contains("[09:30:00] alice: hi\n"));
        assert!(prompt.contains("[09:30:05] bob: hello\n"));
        assert!(prompt.starts_with("以下是聊天室最近的对话"));
    }

    #[test]
    fn short_timestamps_pass_through() {
        let prompt = build_summarize_prompt(&[dto("9:30", "x", "y")]);
        assert!(prompt.contains("[9:30] x: y"));
    }
}

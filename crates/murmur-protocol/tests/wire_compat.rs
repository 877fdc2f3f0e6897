// Verify wire format stays compatible across tiers and with existing
// terminal clients. Field names and op codes here must never drift.

use std::collections::HashMap;

use base64::Engine;
use murmur_protocol::{
    AiJob, AiOp, AiResult, ChatBody, Envelope, RoomCountMsg, OP_ROOM_COUNT_SEND, OP_ROOM_SEND,
    OP_SINGLE_SEND,
};

fn chat_body() -> ChatBody {
    ChatBody {
        code: 0,
        msg: "hello".to_string(),
        from_user_id: 42,
        from_user_name: "alice".to_string(),
        to_user_id: 0,
        to_user_name: String::new(),
        room_id: 7,
        op: OP_ROOM_SEND,
        create_time: "2026-03-01 09:30:00".to_string(),
        client_msg_id: 123_456_789,
    }
}

#[test]
fn envelope_room_send_field_names() {
    let mut info = HashMap::new();
    info.insert("42".to_string(), "alice".to_string());
    let env = Envelope::room_send(7, 1, info, serde_json::to_value(chat_body()).unwrap());
    let json = serde_json::to_string(&env).unwrap();

    assert!(json.contains(r#""op":3"#));
    assert!(json.contains(r#""roomId":7"#));
    assert!(json.contains(r#""roomUserInfo""#));
    // absent optionals must not be emitted at all
    assert!(!json.contains(r#""serverId""#));
    assert!(!json.contains(r#""userId""#));
}

#[test]
fn envelope_single_send_round_trip() {
    let env = Envelope::single_send("ws-1", 42, serde_json::to_value(chat_body()).unwrap());
    let json = serde_json::to_string(&env).unwrap();
    let back: Envelope = serde_json::from_str(&json).unwrap();

    assert_eq!(back.op, OP_SINGLE_SEND);
    assert_eq!(back.server_id.as_deref(), Some("ws-1"));
    let inner: ChatBody = back.inner().unwrap();
    assert_eq!(inner, chat_body());
}

#[test]
fn inner_accepts_raw_json() {
    let json = r#"{"op":3,"roomId":7,"msg":{"msg":"hi","roomId":7,"op":3}}"#;
    let env: Envelope = serde_json::from_str(json).unwrap();
    let inner: ChatBody = env.inner().unwrap();
    assert_eq!(inner.msg, "hi");
    assert_eq!(inner.room_id, 7);
}

#[test]
fn inner_accepts_base64_json() {
    let body = serde_json::to_vec(&chat_body()).unwrap();
    let b64 = base64::engine::general_purpose::STANDARD.encode(body);
    let json = format!(r#"{{"op":3,"roomId":7,"msg":"{}"}}"#, b64);

    let env: Envelope = serde_json::from_str(&json).unwrap();
    let inner: ChatBody = env.inner().unwrap();
    assert_eq!(inner, chat_body());
}

#[test]
fn inner_empty_is_an_error() {
    let env = Envelope::room_count(7, 3);
    assert!(env.inner::<ChatBody>().is_err());
}

#[test]
fn room_count_frame_shape() {
    let frame = RoomCountMsg {
        count: 3,
        op: OP_ROOM_COUNT_SEND,
    };
    let json = serde_json::to_string(&frame).unwrap();
    assert_eq!(json, r#"{"count":3,"op":4}"#);
}

#[test]
fn chat_body_omits_zero_client_msg_id() {
    let mut body = chat_body();
    body.client_msg_id = 0;
    let json = serde_json::to_string(&body).unwrap();
    assert!(!json.contains("clientMsgId"));

    // ...but parses when present
    let parsed: ChatBody = serde_json::from_str(
        r#"{"msg":"x","roomId":1,"op":3,"clientMsgId":99}"#,
    )
    .unwrap();
    assert_eq!(parsed.client_msg_id, 99);
}

#[test]
fn ai_job_wire_names() {
    let job = AiJob {
        op: AiOp::Translate,
        room_id: 5,
        from_user_id: 9,
        from_user_name: "bob".to_string(),
        prompt: "你好".to_string(),
        lang: "en".to_string(),
    };
    let json = serde_json::to_string(&job).unwrap();
    assert!(json.contains(r#""op":"translate""#));
    assert!(json.contains(r#""fromUserName":"bob""#));
    assert!(json.contains(r#""lang":"en""#));
}

#[test]
fn ai_result_err_omitted_when_empty() {
    let res = AiResult {
        room_id: 5,
        text: "done".to_string(),
        op: AiOp::Ask,
        model: "llama3.1".to_string(),
        err: String::new(),
        client_msg_id: 0,
    };
    let json = serde_json::to_string(&res).unwrap();
    assert!(!json.contains(r#""err""#));

    // partial result from a foreign producer still parses
    let parsed: AiResult =
        serde_json::from_str(r#"{"roomId":5,"text":"t","op":"summarize"}"#).unwrap();
    assert_eq!(parsed.op, AiOp::Summarize);
    assert!(parsed.model.is_empty());
}

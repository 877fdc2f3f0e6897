pub mod ai;
pub mod chat;
pub mod envelope;
pub mod rpc;

pub use ai::{AiJob, AiOp, AiResult};
pub use chat::{ChatBody, RoomCountMsg, RoomInfoMsg};
pub use envelope::{
    Envelope, ProtocolError, OP_ROOM_COUNT_SEND, OP_ROOM_INFO_SEND, OP_ROOM_SEND, OP_SINGLE_SEND,
};
pub use rpc::{RPC_CODE_FAIL, RPC_CODE_SUCCESS};

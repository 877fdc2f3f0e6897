//! Key naming scheme shared by every tier that touches the store.

/// `sess_<token>` - auth session hash {userId, userName}.
pub fn session(token: &str) -> String {
    format!("sess_{}", token)
}

/// `sess_map_<uid>` - the one live token for a user.
pub fn user_token_index(user_id: i64) -> String {
    format!("sess_map_{}", user_id)
}

/// `mur_<uid>` - id of the edge currently holding this user's socket.
pub fn user_server(user_id: i64) -> String {
    format!("mur_{}", user_id)
}

/// `mur_room_<rid>` - member hash userId → userName.
pub fn room_members(room_id: i64) -> String {
    format!("mur_room_{}", room_id)
}

/// `mur_room_online_count_<rid>` - online counter.
pub fn room_online_count(room_id: i64) -> String {
    format!("mur_room_online_count_{}", room_id)
}

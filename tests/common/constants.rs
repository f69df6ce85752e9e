#![allow(dead_code)]

pub const HISTORY_URL: &str = "https://api-v2.example.com/me/play-history/tracks?limit=25";
pub const REPLAY_URL: &str = "https://api-v2.example.com/me/replay/tracks";
pub const TRACK_URL: &str = "https://api-v2.example.com/tracks/7";
pub const LIKES_URL: &str = "https://api-v2.example.com/users/1/track_likes";

pub const CAPTURE_TIME: &str = "2024-02-01T08:00:00.123456";

pub const TRACK_TABLE_HEADER: &str = "track_id,title,artist,play_count,first_seen,last_seen,url";
pub const PLAY_LOG_HEADER: &str = "played_at,track_id,title,artist,source_url";

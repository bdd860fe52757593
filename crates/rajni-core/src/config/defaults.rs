//! Default values for config fields.

pub fn default_name() -> String {
    "rajni".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_host() -> String {
    "127.0.0.1".to_string()
}

pub fn default_port() -> u16 {
    8080
}

pub fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

pub fn default_chat_model() -> String {
    "gpt-3.5-turbo".to_string()
}

pub fn default_max_tokens() -> u32 {
    500
}

pub fn default_temperature() -> f32 {
    0.7
}

pub fn default_penalty() -> f32 {
    0.1
}

pub fn default_transcribe_model() -> String {
    "whisper-1".to_string()
}

pub fn default_tts_model() -> String {
    "tts-1".to_string()
}

pub fn default_tts_voice() -> String {
    "alloy".to_string()
}

pub fn default_preferences_table() -> String {
    "user_preferences".to_string()
}

pub fn default_profiles_table() -> String {
    "user_profiles".to_string()
}

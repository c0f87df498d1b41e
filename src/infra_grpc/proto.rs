//! Messages of the `main.AuthService` gRPC service.

pub const LOGIN_BOT_METHOD: &str = "/main.AuthService/LoginBot";
pub const LOGIN_TELEGRAM_METHOD: &str = "/main.AuthService/LoginTelegram";
pub const REFRESH_TOKEN_METHOD: &str = "/main.AuthService/RefreshToken";
pub const REGISTER_TELEGRAM_METHOD: &str = "/main.AuthService/RegisterTelegram";

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BotLoginRequest {
    #[prost(string, tag = "1")]
    pub credential: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TelegramLoginRequest {
    #[prost(int64, tag = "1")]
    pub telegram_id: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RefreshRequest {
    #[prost(string, tag = "1")]
    pub refresh_token: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RegisterTelegramRequest {
    #[prost(int64, tag = "1")]
    pub telegram_id: i64,
    #[prost(string, tag = "2")]
    pub username: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TokenResponse {
    #[prost(string, tag = "1")]
    pub access_token: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub refresh_token: ::prost::alloc::string::String,
}

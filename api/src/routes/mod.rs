pub mod chat {
    pub mod chat_request;
    pub mod chat_route;
}

pub mod datasets {
    pub mod datasets_route;
}

pub mod sessions {
    pub mod session_request;
    pub mod sessions_route;
}

pub mod status {
    pub mod status_route;
}

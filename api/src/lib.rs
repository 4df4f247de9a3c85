//! HTTP interface of the Samarth Q&A backend.

pub mod core {
    pub mod app_state;
    pub mod http {
        pub mod response_envelope;
    }
}

pub mod error_handler;

mod middleware_layer {
    pub mod json_extractor;
}

mod routes;
mod server;

pub use server::{DEFAULT_API_ADDRESS, router, start};

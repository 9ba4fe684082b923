pub mod guard;
pub mod links;

pub use guard::require_signed_url;
pub use links::{
    handle_make_signed_url, handle_make_url, handle_target, handle_verify, EchoResponse,
    MakeUrlResponse,
};

pub mod json_body;
pub mod request_id;

pub use json_body::JsonBody;
pub use request_id::request_id_middleware;

pub mod request_id;

pub use request_id::{RequestId, RequestIdExt, request_id_middleware};

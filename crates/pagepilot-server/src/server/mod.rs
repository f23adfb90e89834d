mod dto;
mod error;
mod router;
mod routes;
mod state;

pub use dto::{ChatRequestBody, ChatResponseBody, ErrorResponse, ToolsResponse};
pub use error::{ApiError, ServerError};
pub use router::{build_router, serve};
pub use state::AppState;

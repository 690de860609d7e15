//! Pieces shared by every service: error codes and their JSON bodies, the
//! `userId` header extractor, settings loading, paging and tracing setup.

mod error;
mod headers;
mod logging;
mod pagination;
mod settings;

pub use error::{ApiError, ErrorBody, ErrorCode, Violation};
pub use headers::{USER_ID_HEADER, UserId};
pub use logging::init_tracing;
pub use pagination::{PageRequest, SortDirection};
pub use settings::{DatabaseSettings, LoggingSettings, ServerSettings, load_dotenv, load_settings};

mod user;
mod forms;
mod overtime;

pub use user::{CurrentUser, User};
pub use forms::{Credentials, DataResponse, ErrorResponse, LoginResponse, MessageResponse};
pub use overtime::{DayStatus, MonthDays, MonthKey, MonthStats, OvertimeData, ParseError};

pub mod auth;
pub mod culture;
pub mod dashboard;
pub mod feed;
pub mod jobs;

pub use auth::{AuthState, AuthStore};
pub use culture::{CultureState, CultureStore};
pub use dashboard::{Dashboard, DashboardStats};
pub use feed::CultureFeed;
pub use jobs::{JobState, JobStore};

pub mod accountant;
pub mod selector;
pub mod service;

pub use accountant::UsageAccountant;
pub use selector::select_tier;
pub use service::{RouteError, RouteWarning, RoutedUpload, StorageRouter};

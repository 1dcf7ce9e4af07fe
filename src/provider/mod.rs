pub mod types;
pub mod provider_trait;
pub mod mock;
pub mod fcm;

pub use types::{
    DeliveryScope, MessageStream, NotificationContent, NotificationPayload, ProviderKind,
};
pub use provider_trait::MessagingProvider;
pub use mock::{MockHandle, MockProvider};
pub use fcm::FcmProvider;

#![allow(dead_code)]

pub mod cli;
pub mod client;
pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod logging;
pub mod platform;
pub mod provider;
pub mod sink;
pub mod worker;

pub use client::PushClient;
pub use config::{ClientConfig, ProviderConfig, RetryConfig, SinkConfig};
pub use context::ClientContext;
pub use controller::{ForegroundController, RenderedNotification, SessionState, UiState};
pub use error::{ClientError, Result};
pub use platform::{
    NotificationOptions, PermissionState, Platform, SimulatedPlatform, WorkerRegistration,
};
pub use provider::{
    DeliveryScope, FcmProvider, MessagingProvider, MockHandle, MockProvider,
    NotificationContent, NotificationPayload, ProviderKind,
};
pub use sink::{DeviceRegistration, HttpTokenSink, LogSink, TokenSink};
pub use worker::BackgroundWorker;

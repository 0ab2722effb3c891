//! Websocket subscription support for LoadLane scenarios: the fixed
//! wire payload and a background listener with cooperative shutdown.

pub mod listener;
pub mod payload;

pub use listener::{ClientError, ClientResult, WebsocketListener};
pub use payload::{
    ResultSubscription, RowMode, SubscriptionRequest, LIVE_REPORT_KIND, PROJECT_KIND,
};

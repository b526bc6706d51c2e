//! # rally-client
//!
//! Runtime for the rally pipelines. Each pipeline owns one room channel and
//! one task running a `tokio::select!` loop over inbound frames, local
//! intents and (for the match game) the flash timer.
//!
//! ```rust,ignore
//! use rally_client::PresenceClient;
//! use rally_core::PointerSample;
//!
//! let presence = PresenceClient::spawn(transport, address);
//! presence.resized(1280.0, 720.0);
//! presence.pointer_moved(PointerSample::mouse(640.0, 360.0));
//!
//! let mut view = presence.view();
//! view.changed().await?;
//! println!("{} here", view.borrow().participant_count());
//!
//! presence.shutdown().await;
//! ```

pub mod config;
pub mod handle;
pub mod metrics;
pub mod presence;
pub mod rooms;
pub mod session;

mod pump;

pub use config::Config;
pub use handle::ClientHandle;
pub use presence::{PresenceClient, PresenceCommand, PresenceHandle};
pub use rooms::{RoomListClient, RoomListHandle};
pub use session::{SessionClient, SessionCommand, SessionHandle};

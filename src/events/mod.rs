//! # Events Module
//!
//! Progress reporting from the optimizer to whatever is driving it.
//!
//! The pipeline and janitor emit events through a crossbeam channel; the CLI
//! turns them into a progress bar. The daemon loop passes [`null_sender`].
//!
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Asset(AssetEvent::Progress(p)) = event {
//!             println!("{}/{}", p.completed, p.total);
//!         }
//!     }
//! });
//! optimizer.run_cycle_with_events(&sender)?;
//! ```

mod channel;
mod types;

pub use channel::{EventChannel, EventReceiver, EventSender, null_sender};
pub use types::*;

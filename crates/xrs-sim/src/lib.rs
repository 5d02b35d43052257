//! XRS Radio Simulation Library
//!
//! A virtual XRS radio for exercising the bridge without hardware. It speaks
//! the same AT line protocol as the real radio, keeps its own state and
//! answers queries from it.
//!
//! # Example
//!
//! ```rust
//! use xrs_sim::VirtualXrsRadio;
//!
//! let mut radio = VirtualXrsRadio::default();
//! radio.handle_line("AT+WGAV=12");
//! radio.set_ptt(1, 0);
//!
//! while let Some(line) = radio.take_output() {
//!     println!("Radio output: {}", line);
//! }
//! assert_eq!(radio.volume(), 12);
//! ```

pub mod radio;
pub mod radio_task;

pub use radio::{SimChannel, VirtualXrsConfig, VirtualXrsRadio};
pub use radio_task::{run_virtual_radio_task, VirtualRadioCommand};

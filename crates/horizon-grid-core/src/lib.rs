//! Core systems for Horizon Grid.
//!
//! This crate provides the foundational pieces shared by the grid engine:
//!
//! - **Signal/Slot System**: Type-safe, synchronous change notification
//! - **Logging**: Fixed `tracing` targets per subsystem and an outline
//!   formatter for dumping hierarchical data
//!
//! # Signal/Slot Example
//!
//! ```
//! use horizon_grid_core::Signal;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! let selection_changed = Signal::<usize>::new();
//! let last_count = Arc::new(AtomicUsize::new(0));
//!
//! let sink = last_count.clone();
//! selection_changed.connect(move |count| sink.store(*count, Ordering::SeqCst));
//!
//! selection_changed.emit(3);
//! assert_eq!(last_count.load(Ordering::SeqCst), 3);
//! ```

pub mod logging;
pub mod signal;

pub use logging::{OutlineWriter, TreeFormatOptions, TreeStyle};
pub use signal::{ConnectionGuard, ConnectionId, Signal};

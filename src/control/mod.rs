//! Control algorithms. Pure computation, no I/O.
//!
//! | Module      | Role                                                    |
//! |-------------|---------------------------------------------------------|
//! | `regulator` | incremental proportional discharge-valve command        |
//! | `target`    | slow setpoint bias correction from the rolling average  |
//! | `history`   | fixed-capacity rolling flow window                      |
//! | `fill`      | fill-start interval statistics                          |
//! | `deferred`  | cancellable pump soft-start timers                      |

pub mod deferred;
pub mod fill;
pub mod history;
pub mod regulator;
pub mod target;

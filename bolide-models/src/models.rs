/*
 * This module links all the various SQL Tables to the appropriate models and exports them for ease of use.
*/

mod notification;
pub use notification::*;
mod triage;
pub use triage::*;
mod user;
pub use user::*;

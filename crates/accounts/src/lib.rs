//! `fire-accounts` — user accounts and the admin-gated signup workflow.

pub mod signup;
pub mod user;

pub use signup::{Decision, NewUserRequest, RequestState, Transition};
pub use user::{Gender, User, UserDraft, UserPatch, UserState};

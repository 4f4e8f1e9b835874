//! Reference funnel modules shipped with the router.

pub mod add_xy;
pub mod echo;
